//! Task data model and request bodies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority tier assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, higher is more urgent. Unset priorities rank below `Low`.
    pub fn rank(priority: Option<Priority>) -> u8 {
        match priority {
            Some(Priority::High) => 3,
            Some(Priority::Medium) => 2,
            Some(Priority::Low) => 1,
            None => 0,
        }
    }

    /// Stored and displayed label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a label is not one of the three tiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority label: {0:?}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

/// A single task owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: i64,
    /// Owner of this task.
    pub owner_id: String,
    /// Free text entered by the owner.
    pub text: String,
    /// Whether the task is done.
    pub completed: bool,
    /// Classifier-assigned tier, unset until the first prioritization.
    pub priority: Option<Priority>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /todos`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub text: String,
}

/// Body of `PATCH /todos/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskRequest {
    pub completed: bool,
}

/// Body of `POST /todos/email-tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTasksRequest {
    #[serde(default)]
    pub target_email: Option<String>,
}

impl EmailTasksRequest {
    /// The trimmed target address, if one was supplied.
    pub fn target(&self) -> Option<&str> {
        self.target_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
