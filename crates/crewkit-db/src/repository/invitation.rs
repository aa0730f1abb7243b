//! SurrealDB implementation of [`InvitationRepository`].
//!
//! Resolution writes are conditional on `status = 'pending'`, so an
//! invitation leaves the pending state exactly once no matter how many
//! requests race for it.

use chrono::{DateTime, Utc};
use crewkit_core::error::CollabResult;
use crewkit_core::models::invitation::{CreateInvitation, Invitation, InvitationStatus};
use crewkit_core::repository::InvitationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, timed};
use crate::repository::{parse_role, parse_uuid, role_to_str};

fn parse_status(s: &str) -> Result<InvitationStatus, DbError> {
    match s {
        "pending" => Ok(InvitationStatus::Pending),
        "accepted" => Ok(InvitationStatus::Accepted),
        "declined" => Ok(InvitationStatus::Declined),
        other => Err(DbError::Query(format!(
            "unknown invitation status: {other}"
        ))),
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct InvitationRow {
    project_id: String,
    company_id: String,
    email: String,
    role: String,
    status: String,
    invited_at: DateTime<Utc>,
}

impl InvitationRow {
    fn into_invitation(self, id: Uuid) -> Result<Invitation, DbError> {
        Ok(Invitation {
            id,
            project_id: parse_uuid(&self.project_id, "project")?,
            company_id: parse_uuid(&self.company_id, "company")?,
            email: self.email,
            role: parse_role(&self.role)?,
            status: parse_status(&self.status)?,
            invited_at: self.invited_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct InvitationRowWithId {
    record_id: String,
    project_id: String,
    company_id: String,
    email: String,
    role: String,
    status: String,
    invited_at: DateTime<Utc>,
}

impl InvitationRowWithId {
    fn try_into_invitation(self) -> Result<Invitation, DbError> {
        let id = parse_uuid(&self.record_id, "invitation")?;
        Ok(Invitation {
            id,
            project_id: parse_uuid(&self.project_id, "project")?,
            company_id: parse_uuid(&self.company_id, "company")?,
            email: self.email,
            role: parse_role(&self.role)?,
            status: parse_status(&self.status)?,
            invited_at: self.invited_at,
        })
    }
}

/// SurrealDB implementation of the Invitation repository.
#[derive(Clone)]
pub struct SurrealInvitationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInvitationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Shared conditional transition out of `pending`. Returns whether
    /// the write applied.
    async fn resolve(&self, id: Uuid, to: &'static str) -> CollabResult<bool> {
        let id_str = id.to_string();

        // Classify a missing row as NotFound; the UPDATE itself only
        // fires while the row is still pending.
        let mut result = timed(
            self.db
                .query(
                    "SELECT * FROM type::record('invitation', $id); \
                     UPDATE type::record('invitation', $id) SET \
                     status = $to WHERE status = 'pending';",
                )
                .bind(("id", id_str.clone()))
                .bind(("to", to)),
        )
        .await?;

        let existing: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        if existing.is_empty() {
            return Err(DbError::NotFound {
                entity: "invitation".into(),
                id: id_str,
            }
            .into());
        }

        let updated: Vec<InvitationRow> = result.take(1).map_err(DbError::from)?;
        Ok(!updated.is_empty())
    }
}

impl<C: Connection> InvitationRepository for SurrealInvitationRepository<C> {
    async fn create(&self, input: CreateInvitation) -> CollabResult<Invitation> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        // No dedup: a second pending row for the same (email, project)
        // is a second independent invitation.
        let result = timed(
            self.db
                .query(
                    "CREATE type::record('invitation', $id) SET \
                     project_id = $project_id, company_id = $company_id, \
                     email = $email, role = $role, status = 'pending'",
                )
                .bind(("id", id_str.clone()))
                .bind(("project_id", input.project_id.to_string()))
                .bind(("company_id", input.company_id.to_string()))
                .bind(("email", input.email.trim().to_lowercase()))
                .bind(("role", role_to_str(input.role))),
        )
        .await?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation".into(),
            id: id_str,
        })?;

        Ok(row.into_invitation(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CollabResult<Invitation> {
        let id_str = id.to_string();

        let mut result = timed(
            self.db
                .query("SELECT * FROM type::record('invitation', $id)")
                .bind(("id", id_str.clone())),
        )
        .await?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation".into(),
            id: id_str,
        })?;

        Ok(row.into_invitation(id)?)
    }

    async fn oldest_pending_by_email(&self, email: &str) -> CollabResult<Option<Invitation>> {
        let email = email.trim().to_lowercase();

        // Lowest invited_at wins the tie-break among duplicates.
        let mut result = timed(
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM invitation \
                     WHERE email = $email AND status = 'pending' \
                     ORDER BY invited_at ASC LIMIT 1",
                )
                .bind(("email", email)),
        )
        .await?;

        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_invitation()?)),
            None => Ok(None),
        }
    }

    async fn mark_accepted(&self, id: Uuid) -> CollabResult<bool> {
        self.resolve(id, "accepted").await
    }

    async fn mark_declined(&self, id: Uuid) -> CollabResult<bool> {
        self.resolve(id, "declined").await
    }

    async fn list_by_project(&self, project_id: Uuid) -> CollabResult<Vec<Invitation>> {
        let mut result = timed(
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM invitation \
                     WHERE project_id = $project_id \
                     ORDER BY invited_at ASC",
                )
                .bind(("project_id", project_id.to_string())),
        )
        .await?;

        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;

        let invitations = rows
            .into_iter()
            .map(|row| row.try_into_invitation())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(invitations)
    }
}
