//! Membership ledger — company and project membership with owner
//! protection.
//!
//! The owner of a project is a permanent member with an immutable role.
//! Both rules are enforced twice: here, by explicit checks that produce
//! the right error, and in the store, by guarded writes that hold under
//! races. A post-write re-validation on removal turns any breach of the
//! owner invariant into a fatal [`CollabError::Invariant`].

use std::sync::Arc;

use crewkit_core::error::{CollabError, CollabResult};
use crewkit_core::models::company::{Company, CompanyMember};
use crewkit_core::models::project::{CreateProject, Project};
use crewkit_core::models::user::{Role, User};
use crewkit_core::repository::{CompanyRepository, ProjectRepository, UserRepository};
use tracing::info;
use uuid::Uuid;

use crate::bus::{EventBus, PROJECT_CREATED, TOPIC_PROJECTS};

/// Plan limits applied to non-premium companies.
#[derive(Debug, Clone)]
pub struct PlanLimits {
    /// Maximum number of projects on the free plan.
    pub free_project_limit: u64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            free_project_limit: 3,
        }
    }
}

/// Company and project membership service.
pub struct MembershipService<C, P, U>
where
    C: CompanyRepository,
    P: ProjectRepository,
    U: UserRepository,
{
    companies: C,
    projects: P,
    users: U,
    bus: Arc<EventBus>,
    limits: PlanLimits,
}

impl<C, P, U> MembershipService<C, P, U>
where
    C: CompanyRepository,
    P: ProjectRepository,
    U: UserRepository,
{
    pub fn new(companies: C, projects: P, users: U, bus: Arc<EventBus>, limits: PlanLimits) -> Self {
        Self {
            companies,
            projects,
            users,
            bus,
            limits,
        }
    }

    /// Create a project owned by `owner_id`, who becomes its sole
    /// initial member.
    ///
    /// Rejected with `Forbidden` when the owner does not belong to the
    /// company, and with `Conflict` when a non-premium company is at
    /// its project limit or the name is already taken within the
    /// company.
    pub async fn create_project(
        &self,
        company_id: Uuid,
        owner_id: Uuid,
        name: &str,
    ) -> CollabResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CollabError::Validation {
                message: "project name is required".into(),
            });
        }

        let company = self.companies.get_by_id(company_id).await?;
        let owner = self.users.get_by_id(owner_id).await?;
        if owner.company_id != Some(company_id) {
            return Err(CollabError::Forbidden {
                reason: "owner does not belong to this company".into(),
            });
        }

        if !company.premium {
            let count = self.projects.count_by_company(company_id).await?;
            if count >= self.limits.free_project_limit {
                return Err(CollabError::Conflict {
                    message: "project limit reached for the current plan".into(),
                });
            }
        }

        let project = self
            .projects
            .create(CreateProject {
                company_id,
                owner_id,
                name: name.to_string(),
            })
            .await?;

        info!(project_id = %project.id, %company_id, "project created");
        self.bus.publish(
            TOPIC_PROJECTS,
            PROJECT_CREATED,
            serde_json::to_value(&project).unwrap_or(serde_json::Value::Null),
        );

        Ok(project)
    }

    /// Record a user in a company's member ledger. Idempotent: an
    /// existing entry is left untouched, so re-adding never downgrades
    /// a role.
    pub async fn add_company_member(
        &self,
        company_id: Uuid,
        member: CompanyMember,
    ) -> CollabResult<Company> {
        self.users.get_by_id(member.user_id).await?;
        self.companies.add_member(company_id, member).await
    }

    /// Add a user to a project's member set. Idempotent.
    pub async fn add_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> CollabResult<Project> {
        self.users.get_by_id(user_id).await?;
        let project = self.projects.add_member(project_id, user_id).await?;
        info!(%project_id, %user_id, "project member added");
        Ok(project)
    }

    /// Change a project member's role.
    ///
    /// The owner's role can never be changed; a non-member is reported
    /// as missing.
    pub async fn change_project_member_role(
        &self,
        project_id: Uuid,
        member_id: Uuid,
        new_role: Role,
    ) -> CollabResult<User> {
        let project = self.projects.get_by_id(project_id).await?;

        if member_id == project.owner_id {
            return Err(CollabError::Conflict {
                message: "owner role is immutable".into(),
            });
        }
        if !project.member_ids.contains(&member_id) {
            return Err(CollabError::NotFound {
                entity: "project member".into(),
                id: member_id.to_string(),
            });
        }

        self.users.set_role(member_id, new_role).await
    }

    /// Remove a member from a project. The owner can never be removed.
    ///
    /// Removal of a user who is not in the member set is a no-op.
    pub async fn remove_project_member(
        &self,
        project_id: Uuid,
        member_id: Uuid,
    ) -> CollabResult<Project> {
        let project = self.projects.remove_member(project_id, member_id).await?;

        // The guarded write cannot remove the owner; if the returned
        // state disagrees, something is deeply wrong with the store.
        if !project.member_ids.contains(&project.owner_id) {
            return Err(CollabError::Invariant(format!(
                "project {project_id} lost its owner from the member set"
            )));
        }

        info!(%project_id, %member_id, "project member removed");
        Ok(project)
    }

    /// Billing capture callback: flip the company onto the premium
    /// plan.
    pub async fn mark_premium(&self, company_id: Uuid) -> CollabResult<Company> {
        let company = self.companies.set_premium(company_id).await?;
        info!(%company_id, "company upgraded to premium");
        Ok(company)
    }
}
