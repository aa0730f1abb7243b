//! Invitation workflow — inviting people into a project.
//!
//! An invite either adds an existing user to the project directly or
//! records a pending invitation for an email with no account yet.
//! Pending invitations resolve exactly once: accepted on matching
//! signup (see [`crate::onboarding`]) or explicitly declined here.

use crewkit_core::error::{CollabError, CollabResult};
use crewkit_core::models::invitation::{CreateInvitation, Invitation};
use crewkit_core::models::project::Project;
use crewkit_core::models::user::{Role, User};
use crewkit_core::repository::{InvitationRepository, ProjectRepository, UserRepository};
use tracing::info;
use uuid::Uuid;

use crate::notify::{Notifier, TEMPLATE_INVITATION, TEMPLATE_PROJECT_ADDED, send_best_effort};

/// Result of an invite call.
#[derive(Debug)]
pub enum InviteOutcome {
    /// The email already has an account; the user was added to the
    /// project member set directly.
    AlreadyMember { user: User, project: Project },
    /// A pending invitation was recorded for the email.
    Invited(Invitation),
}

/// Invitation workflow service.
pub struct InvitationService<I, P, U, N>
where
    I: InvitationRepository,
    P: ProjectRepository,
    U: UserRepository,
    N: Notifier,
{
    invitations: I,
    projects: P,
    users: U,
    notifier: N,
}

impl<I, P, U, N> InvitationService<I, P, U, N>
where
    I: InvitationRepository,
    P: ProjectRepository,
    U: UserRepository,
    N: Notifier,
{
    pub fn new(invitations: I, projects: P, users: U, notifier: N) -> Self {
        Self {
            invitations,
            projects,
            users,
            notifier,
        }
    }

    /// Invite `email` into a project with the given company role.
    ///
    /// Duplicate pending invitations for the same email and project are
    /// allowed; resolution at signup picks the oldest. Notification
    /// dispatch is fire-and-forget and never fails the call.
    pub async fn invite(
        &self,
        project_id: Uuid,
        email: &str,
        role: Role,
    ) -> CollabResult<InviteOutcome> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(CollabError::Validation {
                message: "email is required".into(),
            });
        }

        let project = self.projects.get_by_id(project_id).await?;

        if let Some(user) = self.users.find_by_email(&email).await? {
            let project = self.projects.add_member(project_id, user.id).await?;
            info!(%project_id, user_id = %user.id, "existing user added to project");
            send_best_effort(
                &self.notifier,
                &email,
                TEMPLATE_PROJECT_ADDED,
                serde_json::json!({
                    "project_id": project.id,
                    "project_name": project.name,
                }),
            )
            .await;
            return Ok(InviteOutcome::AlreadyMember { user, project });
        }

        let invitation = self
            .invitations
            .create(CreateInvitation {
                project_id,
                company_id: project.company_id,
                email: email.clone(),
                role,
            })
            .await?;

        info!(%project_id, invitation_id = %invitation.id, "invitation recorded");
        send_best_effort(
            &self.notifier,
            &email,
            TEMPLATE_INVITATION,
            serde_json::json!({
                "project_id": project.id,
                "project_name": project.name,
            }),
        )
        .await;

        Ok(InviteOutcome::Invited(invitation))
    }

    /// Decline a pending invitation.
    ///
    /// The write is conditional on the invitation still being pending;
    /// an already-resolved invitation is a `Conflict`.
    pub async fn decline(&self, invitation_id: Uuid) -> CollabResult<()> {
        // get_by_id first so a missing invitation reports NotFound
        // rather than Conflict.
        self.invitations.get_by_id(invitation_id).await?;

        let applied = self.invitations.mark_declined(invitation_id).await?;
        if !applied {
            return Err(CollabError::Conflict {
                message: "invitation already resolved".into(),
            });
        }

        info!(%invitation_id, "invitation declined");
        Ok(())
    }
}
