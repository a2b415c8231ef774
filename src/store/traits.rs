//! `Database` trait: single async interface for task persistence.
//!
//! Every operation takes the owner identifier and binds it into the query,
//! so callers can never read or mutate another owner's rows.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::prioritize::ValidatedUpdate;
use crate::todos::model::Task;

/// Backend-agnostic database trait covering tasks.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Insert a new open, unprioritized task and return it.
    async fn create_task(&self, owner_id: &str, text: &str) -> Result<Task, DatabaseError>;

    /// Get one of the owner's tasks by ID.
    async fn get_task(&self, owner_id: &str, id: i64) -> Result<Option<Task>, DatabaseError>;

    /// All of the owner's tasks, ascending by ID.
    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>, DatabaseError>;

    /// The owner's tasks that are not completed, ascending by ID.
    async fn list_open_tasks(&self, owner_id: &str) -> Result<Vec<Task>, DatabaseError>;

    /// Set the completed flag. Returns `false` if no such task exists for the owner.
    async fn set_task_completed(
        &self,
        owner_id: &str,
        id: i64,
        completed: bool,
    ) -> Result<bool, DatabaseError>;

    /// Delete a task. Returns `false` if no such task exists for the owner.
    async fn delete_task(&self, owner_id: &str, id: i64) -> Result<bool, DatabaseError>;

    /// Apply every update in one transaction scoped to `owner_id`.
    ///
    /// Either all updates land or none do: an update that matches no
    /// `(id, owner_id)` row aborts and rolls back the whole set.
    /// Returns the number of updates applied.
    async fn apply_priority_updates(
        &self,
        owner_id: &str,
        updates: &[ValidatedUpdate],
    ) -> Result<usize, DatabaseError>;
}
