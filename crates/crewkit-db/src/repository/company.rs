//! SurrealDB implementation of [`CompanyRepository`].

use chrono::{DateTime, Utc};
use crewkit_core::error::CollabResult;
use crewkit_core::models::company::{Company, CompanyMember, CreateCompany, MemberStatus};
use crewkit_core::repository::CompanyRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, check_failure, timed};
use crate::repository::{parse_role, parse_uuid, role_to_str};

/// Normalized uniqueness key for a company name.
pub(crate) fn company_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// DB-side row struct for a member ledger entry.
#[derive(Debug, SurrealValue)]
struct MemberRow {
    user_id: String,
    role: String,
    status: String,
}

fn parse_member_status(s: &str) -> Result<MemberStatus, DbError> {
    match s {
        "active" => Ok(MemberStatus::Active),
        "invited" => Ok(MemberStatus::Invited),
        other => Err(DbError::Query(format!("unknown member status: {other}"))),
    }
}

impl MemberRow {
    fn try_into_member(self) -> Result<CompanyMember, DbError> {
        Ok(CompanyMember {
            user_id: parse_uuid(&self.user_id, "member")?,
            role: parse_role(&self.role)?,
            status: parse_member_status(&self.status)?,
        })
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct CompanyRow {
    name: String,
    premium: bool,
    members: Vec<MemberRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_company(self, id: Uuid) -> Result<Company, DbError> {
        let members = self
            .members
            .into_iter()
            .map(|m| m.try_into_member())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(Company {
            id,
            name: self.name,
            premium: self.premium,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct CompanyRowWithId {
    record_id: String,
    name: String,
    premium: bool,
    members: Vec<MemberRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyRowWithId {
    fn try_into_company(self) -> Result<Company, DbError> {
        let id = parse_uuid(&self.record_id, "company")?;
        let members = self
            .members
            .into_iter()
            .map(|m| m.try_into_member())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(Company {
            id,
            name: self.name,
            premium: self.premium,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Company repository.
#[derive(Clone)]
pub struct SurrealCompanyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCompanyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CompanyRepository for SurrealCompanyRepository<C> {
    async fn create(&self, input: CreateCompany) -> CollabResult<Company> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let name = input.name.trim().to_string();
        let name_key = company_name_key(&name);

        let result = timed(
            self.db
                .query(
                    "CREATE type::record('company', $id) SET \
                     name = $name, name_key = $name_key, \
                     premium = false, members = []",
                )
                .bind(("id", id_str.clone()))
                .bind(("name", name))
                .bind(("name_key", name_key)),
        )
        .await?;

        // A racing creation with the same name loses on the UNIQUE
        // name_key index and surfaces here as a conflict.
        let mut result = result
            .check()
            .map_err(|e| check_failure(e, "company name taken"))?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "company".into(),
            id: id_str,
        })?;

        Ok(row.into_company(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CollabResult<Company> {
        let id_str = id.to_string();

        let mut result = timed(
            self.db
                .query("SELECT * FROM type::record('company', $id)")
                .bind(("id", id_str.clone())),
        )
        .await?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "company".into(),
            id: id_str,
        })?;

        Ok(row.into_company(id)?)
    }

    async fn find_by_name(&self, name: &str) -> CollabResult<Option<Company>> {
        let name_key = company_name_key(name);

        let mut result = timed(
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM company \
                     WHERE name_key = $name_key",
                )
                .bind(("name_key", name_key)),
        )
        .await?;

        let rows: Vec<CompanyRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_company()?)),
            None => Ok(None),
        }
    }

    async fn add_member(&self, company_id: Uuid, member: CompanyMember) -> CollabResult<Company> {
        let id_str = company_id.to_string();
        let user_id_str = member.user_id.to_string();
        let entry = serde_json::json!({
            "user_id": user_id_str,
            "role": role_to_str(member.role),
            "status": match member.status {
                MemberStatus::Active => "active",
                MemberStatus::Invited => "invited",
            },
        });

        // Guarded append keeps the add idempotent: an existing entry
        // for the user is left untouched, whatever its role.
        let mut result = timed(
            self.db
                .query(
                    "UPDATE type::record('company', $id) SET \
                     members += $member, updated_at = time::now() \
                     WHERE members.user_id CONTAINSNOT $user_id; \
                     SELECT * FROM type::record('company', $id);",
                )
                .bind(("id", id_str.clone()))
                .bind(("member", entry))
                .bind(("user_id", user_id_str)),
        )
        .await?;

        // Statement 0 is the guarded UPDATE, statement 1 the re-read.
        let rows: Vec<CompanyRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "company".into(),
            id: id_str,
        })?;

        Ok(row.into_company(company_id)?)
    }

    async fn set_premium(&self, company_id: Uuid) -> CollabResult<Company> {
        let id_str = company_id.to_string();

        let mut result = timed(
            self.db
                .query(
                    "UPDATE type::record('company', $id) SET \
                     premium = true, updated_at = time::now()",
                )
                .bind(("id", id_str.clone())),
        )
        .await?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "company".into(),
            id: id_str,
        })?;

        Ok(row.into_company(company_id)?)
    }

    async fn delete(&self, id: Uuid) -> CollabResult<()> {
        timed(
            self.db
                .query("DELETE type::record('company', $id)")
                .bind(("id", id.to_string())),
        )
        .await?;

        Ok(())
    }
}
