//! SurrealDB implementation of [`TaskRepository`].
//!
//! The update path persists the resolved patch, the history append,
//! and the `completed_at` derivation in one statement guarded by
//! `project_id` — a reader can never observe a task whose status and
//! completion timestamp disagree.

use chrono::{DateTime, Utc};
use crewkit_core::error::CollabResult;
use crewkit_core::models::task::{
    CreateTask, Task, TaskChange, TaskPriority, TaskStatus, TaskWrite,
};
use crewkit_core::repository::{PaginatedResult, Pagination, TaskRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, timed};
use crate::repository::{CountRow, parse_uuid};

fn status_to_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in-progress",
        TaskStatus::Done => "done",
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus, DbError> {
    match s {
        "todo" => Ok(TaskStatus::Todo),
        "in-progress" => Ok(TaskStatus::InProgress),
        "done" => Ok(TaskStatus::Done),
        other => Err(DbError::Query(format!("unknown task status: {other}"))),
    }
}

fn priority_to_str(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
    }
}

fn parse_priority(s: &str) -> Result<TaskPriority, DbError> {
    match s {
        "low" => Ok(TaskPriority::Low),
        "medium" => Ok(TaskPriority::Medium),
        "high" => Ok(TaskPriority::High),
        other => Err(DbError::Query(format!("unknown task priority: {other}"))),
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TaskRow {
    project_id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    assignee_id: Option<String>,
    due_date: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    history: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn into_task(self, id: Uuid) -> Result<Task, DbError> {
        let assignee_id = match self.assignee_id {
            Some(a) => Some(parse_uuid(&a, "assignee")?),
            None => None,
        };
        let history: Vec<TaskChange> = serde_json::from_value(self.history)
            .map_err(|e| DbError::Query(format!("invalid task history: {e}")))?;
        Ok(Task {
            id,
            project_id: parse_uuid(&self.project_id, "project")?,
            title: self.title,
            description: self.description,
            status: parse_task_status(&self.status)?,
            priority: parse_priority(&self.priority)?,
            assignee_id,
            due_date: self.due_date,
            completed_at: self.completed_at,
            history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TaskRowWithId {
    record_id: String,
    project_id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    assignee_id: Option<String>,
    due_date: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    history: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRowWithId {
    fn try_into_task(self) -> Result<Task, DbError> {
        let id = parse_uuid(&self.record_id, "task")?;
        let row = TaskRow {
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            assignee_id: self.assignee_id,
            due_date: self.due_date,
            completed_at: self.completed_at,
            history: self.history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_task(id)
    }
}

/// SurrealDB implementation of the Task repository.
#[derive(Clone)]
pub struct SurrealTaskRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTaskRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TaskRepository for SurrealTaskRepository<C> {
    async fn create(&self, input: CreateTask) -> CollabResult<Task> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let status = input.status.unwrap_or(TaskStatus::Todo);
        let priority = input.priority.unwrap_or(TaskPriority::Medium);

        // A task created directly in `done` still satisfies the
        // status/completed_at invariant.
        let completed_clause = if status == TaskStatus::Done {
            "completed_at = time::now()"
        } else {
            "completed_at = NONE"
        };

        let query = format!(
            "CREATE type::record('task', $id) SET \
             project_id = $project_id, title = $title, \
             description = $description, status = $status, \
             priority = $priority, assignee_id = $assignee_id, \
             due_date = $due_date, {completed_clause}"
        );

        let result = timed(
            self.db
                .query(query)
                .bind(("id", id_str.clone()))
                .bind(("project_id", input.project_id.to_string()))
                .bind(("title", input.title.trim().to_string()))
                .bind(("description", input.description))
                .bind(("status", status_to_str(status)))
                .bind(("priority", priority_to_str(priority)))
                .bind(("assignee_id", input.assignee_id.map(|a| a.to_string())))
                .bind(("due_date", input.due_date)),
        )
        .await?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TaskRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "task".into(),
            id: id_str,
        })?;

        Ok(row.into_task(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CollabResult<Task> {
        let id_str = id.to_string();

        let mut result = timed(
            self.db
                .query("SELECT * FROM type::record('task', $id)")
                .bind(("id", id_str.clone())),
        )
        .await?;

        let rows: Vec<TaskRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "task".into(),
            id: id_str,
        })?;

        Ok(row.into_task(id)?)
    }

    async fn list_by_project(
        &self,
        project_id: Uuid,
        pagination: Pagination,
    ) -> CollabResult<PaginatedResult<Task>> {
        let project_id_str = project_id.to_string();

        let mut count_result = timed(
            self.db
                .query(
                    "SELECT count() AS total FROM task \
                     WHERE project_id = $project_id GROUP ALL",
                )
                .bind(("project_id", project_id_str.clone())),
        )
        .await?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = timed(
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM task \
                     WHERE project_id = $project_id \
                     ORDER BY created_at ASC \
                     LIMIT $limit START $offset",
                )
                .bind(("project_id", project_id_str))
                .bind(("limit", pagination.limit))
                .bind(("offset", pagination.offset)),
        )
        .await?;

        let rows: Vec<TaskRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_task())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn update(
        &self,
        task_id: Uuid,
        project_id: Uuid,
        write: TaskWrite,
        entry: TaskChange,
    ) -> CollabResult<Task> {
        let id_str = task_id.to_string();
        let entry_json = serde_json::to_value(&entry)
            .map_err(|e| DbError::Query(format!("history entry: {e}")))?;

        // Derivation rule: a final status of `done` keeps an existing
        // timestamp or assigns a fresh one; any other final status
        // clears it (re-opening always wipes completion).
        let completed_clause = if write.status == TaskStatus::Done {
            "completed_at = completed_at ?? time::now()"
        } else {
            "completed_at = NONE"
        };

        let query = format!(
            "UPDATE type::record('task', $id) SET \
             title = $title, description = $description, \
             status = $status, priority = $priority, \
             assignee_id = $assignee_id, due_date = $due_date, \
             {completed_clause}, history += $entry, \
             updated_at = time::now() \
             WHERE project_id = $project_id"
        );

        let mut result = timed(
            self.db
                .query(query)
                .bind(("id", id_str.clone()))
                .bind(("project_id", project_id.to_string()))
                .bind(("title", write.title))
                .bind(("description", write.description))
                .bind(("status", status_to_str(write.status)))
                .bind(("priority", priority_to_str(write.priority)))
                .bind(("assignee_id", write.assignee_id.map(|a| a.to_string())))
                .bind(("due_date", write.due_date))
                .bind(("entry", entry_json)),
        )
        .await?;

        let rows: Vec<TaskRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "task".into(),
            id: id_str,
        })?;

        Ok(row.into_task(task_id)?)
    }

    async fn delete(&self, task_id: Uuid, project_id: Uuid) -> CollabResult<()> {
        timed(
            self.db
                .query(
                    "DELETE type::record('task', $id) \
                     WHERE project_id = $project_id",
                )
                .bind(("id", task_id.to_string()))
                .bind(("project_id", project_id.to_string())),
        )
        .await?;

        Ok(())
    }
}
