//! SurrealDB implementation of [`ProjectRepository`].
//!
//! Membership writes are single guarded statements: `array::union`
//! keeps the member set duplicate-free, removal subtracts via
//! `array::complement`, and the removal carries a
//! `WHERE owner_id != $user_id` guard so the owner can never leave the
//! set, even under concurrent requests.

use chrono::{DateTime, Utc};
use crewkit_core::error::CollabResult;
use crewkit_core::models::project::{CreateProject, Project};
use crewkit_core::repository::{PaginatedResult, Pagination, ProjectRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, check_failure, timed};
use crate::repository::{CountRow, parse_uuid};

/// Normalized uniqueness key for a project name within its company.
pub(crate) fn project_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ProjectRow {
    company_id: String,
    owner_id: String,
    name: String,
    member_ids: Vec<String>,
    created_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_project(self, id: Uuid) -> Result<Project, DbError> {
        let member_ids = self
            .member_ids
            .iter()
            .map(|m| parse_uuid(m, "member"))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(Project {
            id,
            company_id: parse_uuid(&self.company_id, "company")?,
            owner_id: parse_uuid(&self.owner_id, "owner")?,
            name: self.name,
            member_ids,
            created_at: self.created_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProjectRowWithId {
    record_id: String,
    company_id: String,
    owner_id: String,
    name: String,
    member_ids: Vec<String>,
    created_at: DateTime<Utc>,
}

impl ProjectRowWithId {
    fn try_into_project(self) -> Result<Project, DbError> {
        let id = parse_uuid(&self.record_id, "project")?;
        let member_ids = self
            .member_ids
            .iter()
            .map(|m| parse_uuid(m, "member"))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(Project {
            id,
            company_id: parse_uuid(&self.company_id, "company")?,
            owner_id: parse_uuid(&self.owner_id, "owner")?,
            name: self.name,
            member_ids,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Project repository.
#[derive(Clone)]
pub struct SurrealProjectRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProjectRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProjectRepository for SurrealProjectRepository<C> {
    async fn create(&self, input: CreateProject) -> CollabResult<Project> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let name = input.name.trim().to_string();
        let name_key = project_name_key(&name);

        let result = timed(
            self.db
                .query(
                    "CREATE type::record('project', $id) SET \
                     company_id = $company_id, owner_id = $owner_id, \
                     name = $name, name_key = $name_key, \
                     member_ids = [$owner_id]",
                )
                .bind(("id", id_str.clone()))
                .bind(("company_id", input.company_id.to_string()))
                .bind(("owner_id", input.owner_id.to_string()))
                .bind(("name", name))
                .bind(("name_key", name_key)),
        )
        .await?;

        // Duplicate (company, name) loses on the UNIQUE index — the
        // creation is rejected, never silently merged.
        let mut result = result
            .check()
            .map_err(|e| check_failure(e, "project name already in use"))?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CollabResult<Project> {
        let id_str = id.to_string();

        let mut result = timed(
            self.db
                .query("SELECT * FROM type::record('project', $id)")
                .bind(("id", id_str.clone())),
        )
        .await?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn list_by_company(
        &self,
        company_id: Uuid,
        pagination: Pagination,
    ) -> CollabResult<PaginatedResult<Project>> {
        let company_id_str = company_id.to_string();

        let mut count_result = timed(
            self.db
                .query(
                    "SELECT count() AS total FROM project \
                     WHERE company_id = $company_id GROUP ALL",
                )
                .bind(("company_id", company_id_str.clone())),
        )
        .await?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = timed(
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM project \
                     WHERE company_id = $company_id \
                     ORDER BY created_at ASC \
                     LIMIT $limit START $offset",
                )
                .bind(("company_id", company_id_str))
                .bind(("limit", pagination.limit))
                .bind(("offset", pagination.offset)),
        )
        .await?;

        let rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_project())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_by_company(&self, company_id: Uuid) -> CollabResult<u64> {
        let mut result = timed(
            self.db
                .query(
                    "SELECT count() AS total FROM project \
                     WHERE company_id = $company_id GROUP ALL",
                )
                .bind(("company_id", company_id.to_string())),
        )
        .await?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn add_member(&self, project_id: Uuid, user_id: Uuid) -> CollabResult<Project> {
        let id_str = project_id.to_string();

        // array::union gives set semantics in one atomic write, which
        // also makes repeated adds idempotent.
        let mut result = timed(
            self.db
                .query(
                    "UPDATE type::record('project', $id) SET \
                     member_ids = array::union(member_ids, [$user_id])",
                )
                .bind(("id", id_str.clone()))
                .bind(("user_id", user_id.to_string())),
        )
        .await?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(project_id)?)
    }

    async fn remove_member(&self, project_id: Uuid, user_id: Uuid) -> CollabResult<Project> {
        let id_str = project_id.to_string();

        // Statement 0 classifies not-found vs owner-protected; the
        // guarded statement 1 is what actually enforces the invariant.
        // array::complement is strictly subtractive, so removing a
        // stranger leaves the set as-is.
        let mut result = timed(
            self.db
                .query(
                    "SELECT * FROM type::record('project', $id); \
                     UPDATE type::record('project', $id) SET \
                     member_ids = array::complement(member_ids, [$user_id]) \
                     WHERE owner_id != $user_id;",
                )
                .bind(("id", id_str.clone()))
                .bind(("user_id", user_id.to_string())),
        )
        .await?;

        let before: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        if before.is_empty() {
            return Err(DbError::NotFound {
                entity: "project".into(),
                id: id_str,
            }
            .into());
        }

        let rows: Vec<ProjectRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::Conflict {
            message: "cannot remove owner".into(),
        })?;

        Ok(row.into_project(project_id)?)
    }
}
