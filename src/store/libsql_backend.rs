//! libSQL implementation of the async `Database` trait.
//!
//! Supports local file and in-memory databases over one shared connection.
//! Reads share `lock`; writes and the priority transaction hold it
//! exclusively, so no reader observes an uncommitted update set.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::prioritize::ValidatedUpdate;
use crate::store::migrations;
use crate::store::traits::Database;
use crate::todos::model::{Priority, Task};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations. A
/// transaction on a libSQL connection captures every statement issued on it,
/// so any statement that runs while one is open either joins it (writes) or
/// sees its uncommitted rows (reads). `lock` keeps both out.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    lock: RwLock<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            lock: RwLock::new(()),
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn query_tasks(
        &self,
        sql: &str,
        owner_id: &str,
        op: &str,
    ) -> Result<Vec<Task>, DatabaseError> {
        let _guard = self.lock.read().await;
        let mut rows = self
            .conn()
            .query(sql, params![owner_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        let mut tasks = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => tasks.push(row_to_task(&row)?),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("{op} row: {e}"))),
            }
        }
        Ok(tasks)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to a Task.
///
/// Column order matches TASK_COLUMNS:
/// 0:id, 1:owner_id, 2:text, 3:completed, 4:priority, 5:created_at, 6:updated_at
fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let map = |e: libsql::Error| DatabaseError::Query(format!("row_to_task: {e}"));

    let id: i64 = row.get(0).map_err(map)?;
    let owner_id: String = row.get(1).map_err(map)?;
    let text: String = row.get(2).map_err(map)?;
    let completed: i64 = row.get(3).map_err(map)?;
    let priority_str: Option<String> = row.get::<String>(4).ok();
    let created_str: String = row.get(5).map_err(map)?;
    let updated_str: String = row.get(6).map_err(map)?;

    let priority = match priority_str {
        Some(label) => match label.parse::<Priority>() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(id, error = %e, "Ignoring stored priority");
                None
            }
        },
        None => None,
    };

    Ok(Task {
        id,
        owner_id,
        text,
        completed: completed != 0,
        priority,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const TASK_COLUMNS: &str = "id, owner_id, text, completed, priority, created_at, updated_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn create_task(&self, owner_id: &str, text: &str) -> Result<Task, DatabaseError> {
        let _guard = self.lock.write().await;
        let conn = self.conn();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        conn.execute(
            "INSERT INTO tasks (owner_id, text, completed, priority, created_at, updated_at)
             VALUES (?1, ?2, 0, NULL, ?3, ?3)",
            params![owner_id, text, now_str],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_task: {e}")))?;

        let id = conn.last_insert_rowid();
        debug!(id, owner = owner_id, "Task created");

        Ok(Task {
            id,
            owner_id: owner_id.to_string(),
            text: text.to_string(),
            completed: false,
            priority: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_task(&self, owner_id: &str, id: i64) -> Result<Option<Task>, DatabaseError> {
        let _guard = self.lock.read().await;
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2"),
                params![id, owner_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_task: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_task(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_task row: {e}"))),
        }
    }

    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY id ASC"),
            owner_id,
            "list_tasks",
        )
        .await
    }

    async fn list_open_tasks(&self, owner_id: &str) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 AND completed = 0 ORDER BY id ASC"
            ),
            owner_id,
            "list_open_tasks",
        )
        .await
    }

    async fn set_task_completed(
        &self,
        owner_id: &str,
        id: i64,
        completed: bool,
    ) -> Result<bool, DatabaseError> {
        let _guard = self.lock.write().await;
        let count = self
            .conn()
            .execute(
                "UPDATE tasks SET completed = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
                params![completed as i64, Utc::now().to_rfc3339(), id, owner_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_task_completed: {e}")))?;
        Ok(count > 0)
    }

    async fn delete_task(&self, owner_id: &str, id: i64) -> Result<bool, DatabaseError> {
        let _guard = self.lock.write().await;
        let count = self
            .conn()
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_task: {e}")))?;
        Ok(count > 0)
    }

    async fn apply_priority_updates(
        &self,
        owner_id: &str,
        updates: &[ValidatedUpdate],
    ) -> Result<usize, DatabaseError> {
        if updates.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.write().await;
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("begin: {e}")))?;
        let now = Utc::now().to_rfc3339();

        for update in updates {
            // updated_at only moves when the tier actually changes, so
            // re-applying the same set leaves rows untouched.
            let result = tx
                .execute(
                    "UPDATE tasks
                     SET priority = ?1,
                         updated_at = CASE WHEN priority IS ?1 THEN updated_at ELSE ?2 END
                     WHERE id = ?3 AND owner_id = ?4",
                    params![update.priority.as_str(), now.as_str(), update.id, owner_id],
                )
                .await;

            let failure = match result {
                Ok(0) => DatabaseError::NotFound {
                    entity: "task".to_string(),
                    id: update.id.to_string(),
                },
                Ok(_) => continue,
                Err(e) => DatabaseError::Transaction(format!("update task {}: {e}", update.id)),
            };

            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback failed");
            }
            warn!(owner = owner_id, error = %failure, "Priority update rolled back");
            return Err(failure);
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("commit: {e}")))?;

        debug!(owner = owner_id, count = updates.len(), "Priority updates committed");
        Ok(updates.len())
    }
}
