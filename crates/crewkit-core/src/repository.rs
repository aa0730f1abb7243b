//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and total over existing records:
//! a missing record is a reported error, never a silent no-op. Guarded
//! mutations (idempotent member adds, owner-protected removal,
//! conditional invitation resolution) must be single atomic writes in
//! the implementation — callers rely on them being race-safe.

use uuid::Uuid;

use crate::error::CollabResult;
use crate::models::{
    company::{Company, CompanyMember, CreateCompany},
    invitation::{CreateInvitation, Invitation},
    project::{CreateProject, Project},
    task::{CreateTask, Task, TaskChange, TaskWrite},
    user::{CreateUser, Role, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub trait CompanyRepository: Send + Sync {
    /// Create a company with an empty member ledger. Fails with
    /// `Conflict` when the trimmed, case-folded name is already taken.
    fn create(&self, input: CreateCompany) -> impl Future<Output = CollabResult<Company>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CollabResult<Company>> + Send;
    /// Trim/case-insensitive lookup by name.
    fn find_by_name(&self, name: &str)
    -> impl Future<Output = CollabResult<Option<Company>>> + Send;
    /// Idempotent member add: an existing entry for the user is left
    /// untouched (no silent role downgrade).
    fn add_member(
        &self,
        company_id: Uuid,
        member: CompanyMember,
    ) -> impl Future<Output = CollabResult<Company>> + Send;
    /// Flip the plan gate. Called by the billing capture callback.
    fn set_premium(&self, company_id: Uuid) -> impl Future<Output = CollabResult<Company>> + Send;
    /// Hard delete. Only used to roll back a half-finished signup.
    fn delete(&self, id: Uuid) -> impl Future<Output = CollabResult<()>> + Send;
}

pub trait ProjectRepository: Send + Sync {
    /// Create a project with the owner as sole member. Fails with
    /// `Conflict` when `(company, name)` is already taken.
    fn create(&self, input: CreateProject) -> impl Future<Output = CollabResult<Project>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CollabResult<Project>> + Send;
    fn list_by_company(
        &self,
        company_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CollabResult<PaginatedResult<Project>>> + Send;
    fn count_by_company(&self, company_id: Uuid) -> impl Future<Output = CollabResult<u64>> + Send;
    /// Idempotent set add of `user_id` to the member set.
    fn add_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CollabResult<Project>> + Send;
    /// Remove a member. The write is guarded so the owner can never be
    /// removed, even by a racing request.
    fn remove_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CollabResult<Project>> + Send;
}

pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    fn create(&self, input: CreateUser) -> impl Future<Output = CollabResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CollabResult<User>> + Send;
    fn find_by_email(&self, email: &str)
    -> impl Future<Output = CollabResult<Option<User>>> + Send;
    fn set_role(
        &self,
        user_id: Uuid,
        role: Role,
    ) -> impl Future<Output = CollabResult<User>> + Send;
    /// Hard delete. Only used to roll back a half-finished signup.
    fn delete(&self, id: Uuid) -> impl Future<Output = CollabResult<()>> + Send;
}

pub trait InvitationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateInvitation,
    ) -> impl Future<Output = CollabResult<Invitation>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CollabResult<Invitation>> + Send;
    /// The single oldest pending invitation for `email` (lowest
    /// `invited_at` wins when duplicates exist).
    fn oldest_pending_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = CollabResult<Option<Invitation>>> + Send;
    /// Conditional `pending → accepted`. Returns `false` when the
    /// invitation was already resolved (the write did not apply).
    fn mark_accepted(&self, id: Uuid) -> impl Future<Output = CollabResult<bool>> + Send;
    /// Conditional `pending → declined`. Returns `false` when already
    /// resolved.
    fn mark_declined(&self, id: Uuid) -> impl Future<Output = CollabResult<bool>> + Send;
    fn list_by_project(
        &self,
        project_id: Uuid,
    ) -> impl Future<Output = CollabResult<Vec<Invitation>>> + Send;
}

pub trait TaskRepository: Send + Sync {
    fn create(&self, input: CreateTask) -> impl Future<Output = CollabResult<Task>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CollabResult<Task>> + Send;
    fn list_by_project(
        &self,
        project_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CollabResult<PaginatedResult<Task>>> + Send;
    /// Persist resolved field values, append one history entry, and
    /// derive `completed_at` from the final status — all in a single
    /// write guarded by `project_id`, so no reader ever observes
    /// `status == done` with `completed_at` unset.
    fn update(
        &self,
        task_id: Uuid,
        project_id: Uuid,
        write: TaskWrite,
        entry: TaskChange,
    ) -> impl Future<Output = CollabResult<Task>> + Send;
    /// Hard delete, guarded by `project_id`.
    fn delete(
        &self,
        task_id: Uuid,
        project_id: Uuid,
    ) -> impl Future<Output = CollabResult<()>> + Send;
}
