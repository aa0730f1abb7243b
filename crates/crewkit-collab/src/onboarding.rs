//! Signup orchestration.
//!
//! Signup is the one compound flow in the system. A new user either
//! founds a company (becoming its admin) or joins the company behind
//! the oldest pending invitation matching their email. Writes are
//! ordered so that a mid-flow failure leaves no partial state: a
//! company or user created for a signup that then fails is deleted
//! again.

use crewkit_auth::password;
use crewkit_core::error::{CollabError, CollabResult};
use crewkit_core::models::company::{Company, CompanyMember, CreateCompany, MemberStatus};
use crewkit_core::models::invitation::Invitation;
use crewkit_core::models::user::{CreateUser, Role, User};
use crewkit_core::repository::{CompanyRepository, InvitationRepository, UserRepository};
use tracing::{error, info, warn};

/// Signup request.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Required when no pending invitation matches the email.
    pub company_name: Option<String>,
}

/// How the signup resolved.
#[derive(Debug)]
pub enum SignupOutcome {
    /// A pending invitation matched: the user joined its company with
    /// its role.
    JoinedCompany { user: User, invitation: Invitation },
    /// No invitation matched: the user founded a company as admin.
    FoundedCompany { user: User, company: Company },
}

impl SignupOutcome {
    pub fn user(&self) -> &User {
        match self {
            SignupOutcome::JoinedCompany { user, .. } => user,
            SignupOutcome::FoundedCompany { user, .. } => user,
        }
    }
}

/// Password policy applied at signup.
#[derive(Debug, Clone)]
pub struct SignupPolicy {
    pub min_password_length: usize,
    /// Pepper shared with the login path.
    pub pepper: Option<String>,
}

impl Default for SignupPolicy {
    fn default() -> Self {
        Self {
            min_password_length: 8,
            pepper: None,
        }
    }
}

/// Signup service.
pub struct SignupService<C, U, I>
where
    C: CompanyRepository,
    U: UserRepository,
    I: InvitationRepository,
{
    companies: C,
    users: U,
    invitations: I,
    policy: SignupPolicy,
}

impl<C, U, I> SignupService<C, U, I>
where
    C: CompanyRepository,
    U: UserRepository,
    I: InvitationRepository,
{
    pub fn new(companies: C, users: U, invitations: I, policy: SignupPolicy) -> Self {
        Self {
            companies,
            users,
            invitations,
            policy,
        }
    }

    pub async fn signup(&self, input: SignupInput) -> CollabResult<SignupOutcome> {
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if first_name.is_empty() || last_name.is_empty() {
            return Err(CollabError::Validation {
                message: "first and last name are required".into(),
            });
        }
        if email.is_empty() || !email.contains('@') {
            return Err(CollabError::Validation {
                message: "a valid email is required".into(),
            });
        }
        if input.password.chars().count() < self.policy.min_password_length {
            return Err(CollabError::Validation {
                message: format!(
                    "password must be at least {} characters",
                    self.policy.min_password_length
                ),
            });
        }

        // Friendly pre-check; the UNIQUE index on email is the real
        // guard under races.
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(CollabError::Conflict {
                message: "email already registered".into(),
            });
        }

        let password_hash = password::hash_password(&input.password, self.policy.pepper.as_deref())?;

        match self.invitations.oldest_pending_by_email(&email).await? {
            Some(invitation) => {
                self.join_company(first_name, last_name, email, password_hash, invitation)
                    .await
            }
            None => {
                self.found_company(
                    first_name,
                    last_name,
                    email,
                    password_hash,
                    input.company_name,
                )
                .await
            }
        }
    }

    async fn join_company(
        &self,
        first_name: String,
        last_name: String,
        email: String,
        password_hash: String,
        invitation: Invitation,
    ) -> CollabResult<SignupOutcome> {
        let user = self
            .users
            .create(CreateUser {
                first_name,
                last_name,
                email,
                password_hash,
                company_id: Some(invitation.company_id),
                role: invitation.role,
                title: None,
                phone: None,
            })
            .await?;

        // A user record without a ledger entry would be a ghost
        // account, so an aborted ledger write deletes the user again.
        if let Err(err) = self
            .companies
            .add_member(
                invitation.company_id,
                CompanyMember {
                    user_id: user.id,
                    role: invitation.role,
                    status: MemberStatus::Active,
                },
            )
            .await
        {
            if let Err(rollback) = self.users.delete(user.id).await {
                error!(
                    user_id = %user.id,
                    %rollback,
                    "failed to roll back user after aborted signup"
                );
            }
            return Err(err);
        }

        // Conditional pending -> accepted; a concurrent resolution may
        // have won, which leaves the membership above intact. The
        // membership itself is already durable at this point, so a
        // failed status flip leaves the invitation pending instead of
        // undoing the signup.
        match self.invitations.mark_accepted(invitation.id).await {
            Ok(true) => {}
            Ok(false) => warn!(
                invitation_id = %invitation.id,
                "invitation was resolved concurrently, accept skipped"
            ),
            Err(err) => error!(
                invitation_id = %invitation.id,
                %err,
                "failed to mark invitation accepted"
            ),
        }

        info!(
            user_id = %user.id,
            company_id = %invitation.company_id,
            "signup resolved via invitation"
        );
        Ok(SignupOutcome::JoinedCompany { user, invitation })
    }

    async fn found_company(
        &self,
        first_name: String,
        last_name: String,
        email: String,
        password_hash: String,
        company_name: Option<String>,
    ) -> CollabResult<SignupOutcome> {
        let name = company_name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            return Err(CollabError::Validation {
                message: "company name is required".into(),
            });
        }

        // Of two concurrent signups with the same company name exactly
        // one passes the UNIQUE name index.
        let company = self
            .companies
            .create(CreateCompany {
                name: name.to_string(),
            })
            .await?;

        let user = match self
            .users
            .create(CreateUser {
                first_name,
                last_name,
                email,
                password_hash,
                company_id: Some(company.id),
                role: Role::Admin,
                title: None,
                phone: None,
            })
            .await
        {
            Ok(user) => user,
            Err(err) => {
                if let Err(rollback) = self.companies.delete(company.id).await {
                    error!(
                        company_id = %company.id,
                        %rollback,
                        "failed to roll back company after aborted signup"
                    );
                }
                return Err(err);
            }
        };

        let company = self
            .companies
            .add_member(
                company.id,
                CompanyMember {
                    user_id: user.id,
                    role: Role::Admin,
                    status: MemberStatus::Active,
                },
            )
            .await?;

        info!(user_id = %user.id, company_id = %company.id, "signup founded a company");
        Ok(SignupOutcome::FoundedCompany { user, company })
    }
}
