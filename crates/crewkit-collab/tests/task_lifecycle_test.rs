//! Integration tests for the task lifecycle engine against in-memory
//! SurrealDB repositories.

use std::sync::Arc;

use crewkit_collab::bus::{TASK_CREATED, TASK_DELETED, TASK_UPDATED, task_topic};
use crewkit_collab::{EventBus, TaskService};
use crewkit_core::error::CollabError;
use crewkit_core::models::project::CreateProject;
use crewkit_core::models::task::{CreateTask, TaskPriority, TaskStatus, UpdateTask};
use crewkit_core::repository::ProjectRepository;
use crewkit_db::repository::{SurrealProjectRepository, SurrealTaskRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Tasks = TaskService<SurrealTaskRepository<Db>, SurrealProjectRepository<Db>>;

/// Helper: in-memory DB, migrations, one project, the service.
async fn setup() -> (Surreal<Db>, Arc<EventBus>, Tasks, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crewkit_db::run_migrations(&db).await.unwrap();

    let owner_id = Uuid::new_v4();
    let project = SurrealProjectRepository::new(db.clone())
        .create(CreateProject {
            company_id: Uuid::new_v4(),
            owner_id,
            name: "Tower".into(),
        })
        .await
        .unwrap();

    let bus = Arc::new(EventBus::default());
    let service = TaskService::new(
        SurrealTaskRepository::new(db.clone()),
        SurrealProjectRepository::new(db.clone()),
        bus.clone(),
    );
    (db, bus, service, project.id, owner_id)
}

fn new_task(project_id: Uuid, title: &str) -> CreateTask {
    CreateTask {
        project_id,
        title: title.into(),
        description: None,
        status: None,
        priority: None,
        assignee_id: None,
        due_date: None,
    }
}

#[tokio::test]
async fn create_task_defaults_and_publishes() {
    let (_db, bus, service, project_id, actor) = setup().await;
    let mut rx = bus.subscribe(&task_topic(project_id));

    let task = service
        .create_task(actor, new_task(project_id, "Pour foundation"))
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(task.completed_at, None);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.name, TASK_CREATED);
    assert_eq!(event.payload["title"], "Pour foundation");
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let (_db, _bus, service, project_id, actor) = setup().await;

    let err = service
        .create_task(actor, new_task(project_id, "  "))
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::Validation { .. }));
}

#[tokio::test]
async fn non_members_cannot_touch_tasks() {
    let (_db, _bus, service, project_id, actor) = setup().await;

    let task = service
        .create_task(actor, new_task(project_id, "Pour foundation"))
        .await
        .unwrap();

    let outsider = Uuid::new_v4();
    let err = service
        .create_task(outsider, new_task(project_id, "Frame walls"))
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::Forbidden { .. }));

    let err = service
        .update_task(outsider, project_id, task.id, UpdateTask::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::Forbidden { .. }));
}

#[tokio::test]
async fn completing_and_reopening_tracks_completed_at() {
    let (_db, bus, service, project_id, actor) = setup().await;
    let mut rx = bus.subscribe(&task_topic(project_id));

    let task = service
        .create_task(actor, new_task(project_id, "Pour foundation"))
        .await
        .unwrap();
    rx.recv().await.unwrap(); // task-created

    let task = service
        .update_task(
            actor,
            project_id,
            task.id,
            UpdateTask {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(task.completed_at.is_some());

    let event = rx.recv().await.unwrap();
    assert_eq!(event.name, TASK_UPDATED);
    assert_eq!(event.payload["status"], "done");

    let task = service
        .update_task(
            actor,
            project_id,
            task.id,
            UpdateTask {
                status: Some(TaskStatus::Todo),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(task.completed_at, None);
    assert_eq!(task.history.len(), 2);
}

#[tokio::test]
async fn history_records_what_each_update_changed() {
    let (_db, _bus, service, project_id, actor) = setup().await;

    let task = service
        .create_task(actor, new_task(project_id, "Pour foundation"))
        .await
        .unwrap();

    let task = service
        .update_task(
            actor,
            project_id,
            task.id,
            UpdateTask {
                title: Some("Pour foundation (east wing)".into()),
                priority: Some(TaskPriority::High),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(task.history.len(), 1);
    let entry = &task.history[0];
    assert_eq!(entry.changed_by, actor);
    assert_eq!(entry.changes.len(), 2);
    assert_eq!(entry.changes["title"].0, serde_json::json!("Pour foundation"));
    assert_eq!(
        entry.changes["title"].1,
        serde_json::json!("Pour foundation (east wing)")
    );
    assert_eq!(entry.changes["priority"].0, serde_json::json!("medium"));
    assert_eq!(entry.changes["priority"].1, serde_json::json!("high"));

    // A patch that changes nothing still appends an entry.
    let task = service
        .update_task(actor, project_id, task.id, UpdateTask::default())
        .await
        .unwrap();
    assert_eq!(task.history.len(), 2);
    assert!(task.history[1].changes.is_empty());
}

#[tokio::test]
async fn cross_project_access_is_forbidden_not_missing() {
    let (db, _bus, service, project_id, actor) = setup().await;

    let task = service
        .create_task(actor, new_task(project_id, "Pour foundation"))
        .await
        .unwrap();

    // A second project with the same actor as owner.
    let other = SurrealProjectRepository::new(db)
        .create(CreateProject {
            company_id: Uuid::new_v4(),
            owner_id: actor,
            name: "Bridge".into(),
        })
        .await
        .unwrap();

    // The task exists, but under a different project: Forbidden.
    let err = service
        .update_task(actor, other.id, task.id, UpdateTask::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::Forbidden { .. }));

    let err = service
        .delete_task(actor, other.id, task.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::Forbidden { .. }));

    // Through a project that does not exist at all: NotFound.
    let err = service
        .update_task(actor, Uuid::new_v4(), task.id, UpdateTask::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::NotFound { .. }));
}

#[tokio::test]
async fn delete_removes_and_publishes() {
    let (_db, bus, service, project_id, actor) = setup().await;

    let task = service
        .create_task(actor, new_task(project_id, "Pour foundation"))
        .await
        .unwrap();

    let mut rx = bus.subscribe(&task_topic(project_id));
    service
        .delete_task(actor, project_id, task.id)
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.name, TASK_DELETED);
    assert_eq!(event.payload["title"], "Pour foundation");

    let err = service
        .update_task(actor, project_id, task.id, UpdateTask::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::NotFound { .. }));
}
