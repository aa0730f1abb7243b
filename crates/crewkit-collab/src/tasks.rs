//! Task lifecycle engine.
//!
//! Transitions between `todo`, `in-progress` and `done` are
//! unrestricted, self-transitions included. `completed_at` is derived
//! from the final status inside the store write, never set by a
//! client. Every successful update appends exactly one history entry
//! recording the fields the patch actually changed as `[old, new]`
//! pairs; a no-op patch still appends an entry with an empty map.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use crewkit_core::error::{CollabError, CollabResult};
use crewkit_core::models::task::{CreateTask, FieldChange, Task, TaskChange, TaskWrite, UpdateTask};
use crewkit_core::repository::{ProjectRepository, TaskRepository};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::bus::{EventBus, TASK_CREATED, TASK_DELETED, TASK_UPDATED, task_topic};

fn json_of<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Task lifecycle service.
pub struct TaskService<T, P>
where
    T: TaskRepository,
    P: ProjectRepository,
{
    tasks: T,
    projects: P,
    bus: Arc<EventBus>,
}

impl<T, P> TaskService<T, P>
where
    T: TaskRepository,
    P: ProjectRepository,
{
    pub fn new(tasks: T, projects: P, bus: Arc<EventBus>) -> Self {
        Self {
            tasks,
            projects,
            bus,
        }
    }

    /// Verify the actor belongs to the project's member set.
    async fn require_member(&self, project_id: Uuid, actor: Uuid) -> CollabResult<()> {
        let project = self.projects.get_by_id(project_id).await?;
        if !project.member_ids.contains(&actor) {
            return Err(CollabError::Forbidden {
                reason: "actor is not a project member".into(),
            });
        }
        Ok(())
    }

    /// Create a task. `status` defaults to `todo` and `priority` to
    /// `medium`; a task created directly in `done` gets `completed_at`
    /// in the same write.
    pub async fn create_task(&self, actor: Uuid, input: CreateTask) -> CollabResult<Task> {
        if input.title.trim().is_empty() {
            return Err(CollabError::Validation {
                message: "title is required".into(),
            });
        }
        self.require_member(input.project_id, actor).await?;

        let task = self.tasks.create(input).await?;

        info!(task_id = %task.id, project_id = %task.project_id, "task created");
        self.bus.publish(
            &task_topic(task.project_id),
            TASK_CREATED,
            json_of(&task),
        );

        Ok(task)
    }

    /// Apply a patch to a task.
    ///
    /// A task that exists under a different project is rejected with
    /// `Forbidden`, not `NotFound` — the caller addressed a real task
    /// through the wrong project.
    pub async fn update_task(
        &self,
        actor: Uuid,
        project_id: Uuid,
        task_id: Uuid,
        patch: UpdateTask,
    ) -> CollabResult<Task> {
        self.require_member(project_id, actor).await?;

        let current = self.tasks.get_by_id(task_id).await?;
        if current.project_id != project_id {
            return Err(CollabError::Forbidden {
                reason: "task does not belong to this project".into(),
            });
        }
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(CollabError::Validation {
                message: "title is required".into(),
            });
        }

        let (write, changes) = resolve_patch(&current, patch);
        let entry = TaskChange {
            changed_at: Utc::now(),
            changed_by: actor,
            changes,
        };

        let task = self.tasks.update(task_id, project_id, write, entry).await?;

        info!(%task_id, %project_id, "task updated");
        self.bus
            .publish(&task_topic(project_id), TASK_UPDATED, json_of(&task));

        Ok(task)
    }

    /// Delete a task, with the same project-ownership validation as
    /// updates.
    pub async fn delete_task(
        &self,
        actor: Uuid,
        project_id: Uuid,
        task_id: Uuid,
    ) -> CollabResult<()> {
        self.require_member(project_id, actor).await?;

        let current = self.tasks.get_by_id(task_id).await?;
        if current.project_id != project_id {
            return Err(CollabError::Forbidden {
                reason: "task does not belong to this project".into(),
            });
        }

        self.tasks.delete(task_id, project_id).await?;

        info!(%task_id, %project_id, "task deleted");
        self.bus
            .publish(&task_topic(project_id), TASK_DELETED, json_of(&current));

        Ok(())
    }
}

/// Merge a patch over the stored task.
///
/// Returns the fully-resolved values to persist and the `[old, new]`
/// map for the history entry. Only fields the patch touched AND
/// actually changed appear in the map; the derived `completed_at` is
/// never echoed into it.
fn resolve_patch(current: &Task, patch: UpdateTask) -> (TaskWrite, BTreeMap<String, FieldChange>) {
    let mut changes = BTreeMap::new();

    let title = match patch.title {
        Some(title) if title != current.title => {
            changes.insert(
                "title".to_string(),
                FieldChange(json_of(&current.title), json_of(&title)),
            );
            title
        }
        Some(title) => title,
        None => current.title.clone(),
    };

    let description = match patch.description {
        Some(description) => {
            if description != current.description {
                changes.insert(
                    "description".to_string(),
                    FieldChange(json_of(&current.description), json_of(&description)),
                );
            }
            description
        }
        None => current.description.clone(),
    };

    let status = match patch.status {
        Some(status) => {
            if status != current.status {
                changes.insert(
                    "status".to_string(),
                    FieldChange(json_of(&current.status), json_of(&status)),
                );
            }
            status
        }
        None => current.status,
    };

    let priority = match patch.priority {
        Some(priority) => {
            if priority != current.priority {
                changes.insert(
                    "priority".to_string(),
                    FieldChange(json_of(&current.priority), json_of(&priority)),
                );
            }
            priority
        }
        None => current.priority,
    };

    let assignee_id = match patch.assignee_id {
        Some(assignee_id) => {
            if assignee_id != current.assignee_id {
                changes.insert(
                    "assignee_id".to_string(),
                    FieldChange(json_of(&current.assignee_id), json_of(&assignee_id)),
                );
            }
            assignee_id
        }
        None => current.assignee_id,
    };

    let due_date = match patch.due_date {
        Some(due_date) => {
            if due_date != current.due_date {
                changes.insert(
                    "due_date".to_string(),
                    FieldChange(json_of(&current.due_date), json_of(&due_date)),
                );
            }
            due_date
        }
        None => current.due_date,
    };

    let write = TaskWrite {
        title,
        description,
        status,
        priority,
        assignee_id,
        due_date,
    };
    (write, changes)
}
