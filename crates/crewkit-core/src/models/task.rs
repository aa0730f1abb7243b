//! Task domain model.
//!
//! Three-state lifecycle with unrestricted transitions (any state is
//! reachable from any state, self-transitions included). `completed_at`
//! is derived from `status` by the task lifecycle engine and is never
//! set directly by a client. `history` is append-only, one entry per
//! mutating write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// An `[old, new]` value pair for one changed field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange(pub serde_json::Value, pub serde_json::Value);

/// One history entry, recording every field a single write changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChange {
    pub changed_at: DateTime<Utc>,
    pub changed_by: Uuid,
    pub changes: BTreeMap<String, FieldChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    /// Derived: set exactly when `status == Done`.
    pub completed_at: Option<DateTime<Utc>>,
    pub history: Vec<TaskChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a task. `status` defaults to `todo`
/// and `priority` to `medium` when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Patch applied by `update_task`.
///
/// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change
/// for the clearable fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Fully-resolved field values persisted by a task update. Built by the
/// lifecycle engine after merging the patch over the stored task;
/// `completed_at` is intentionally absent — the store derives it in the
/// same write from the final status.
#[derive(Debug, Clone)]
pub struct TaskWrite {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}
