//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use crewkit_core::error::CollabResult;
use crewkit_core::models::user::{CreateUser, Role, User};
use crewkit_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, check_failure, timed};
use crate::repository::{parse_role, parse_uuid, role_to_str};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    company_id: Option<String>,
    role: String,
    title: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        let company_id = match self.company_id {
            Some(c) => Some(parse_uuid(&c, "company")?),
            None => None,
        };
        Ok(User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            company_id,
            role: parse_role(&self.role)?,
            title: self.title,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    company_id: Option<String>,
    role: String,
    title: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid(&self.record_id, "user")?;
        let company_id = match self.company_id {
            Some(c) => Some(parse_uuid(&c, "company")?),
            None => None,
        };
        Ok(User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            company_id,
            role: parse_role(&self.role)?,
            title: self.title,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> CollabResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = timed(
            self.db
                .query(
                    "CREATE type::record('user', $id) SET \
                     first_name = $first_name, last_name = $last_name, \
                     email = $email, password_hash = $password_hash, \
                     company_id = $company_id, role = $role, \
                     title = $title, phone = $phone",
                )
                .bind(("id", id_str.clone()))
                .bind(("first_name", input.first_name))
                .bind(("last_name", input.last_name))
                .bind(("email", input.email.trim().to_lowercase()))
                .bind(("password_hash", input.password_hash))
                .bind(("company_id", input.company_id.map(|c| c.to_string())))
                .bind(("role", role_to_str(input.role)))
                .bind(("title", input.title))
                .bind(("phone", input.phone)),
        )
        .await?;

        // UNIQUE email index backstops the pre-check in the signup
        // flow; a concurrent duplicate fails here.
        let mut result = result
            .check()
            .map_err(|e| check_failure(e, "email already registered"))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CollabResult<User> {
        let id_str = id.to_string();

        let mut result = timed(
            self.db
                .query("SELECT * FROM type::record('user', $id)")
                .bind(("id", id_str.clone())),
        )
        .await?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn find_by_email(&self, email: &str) -> CollabResult<Option<User>> {
        let email = email.trim().to_lowercase();

        let mut result = timed(
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM user \
                     WHERE email = $email",
                )
                .bind(("email", email)),
        )
        .await?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_user()?)),
            None => Ok(None),
        }
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> CollabResult<User> {
        let id_str = user_id.to_string();

        let mut result = timed(
            self.db
                .query(
                    "UPDATE type::record('user', $id) SET \
                     role = $role, updated_at = time::now()",
                )
                .bind(("id", id_str.clone()))
                .bind(("role", role_to_str(role))),
        )
        .await?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(user_id)?)
    }

    async fn delete(&self, id: Uuid) -> CollabResult<()> {
        timed(
            self.db
                .query("DELETE type::record('user', $id)")
                .bind(("id", id.to_string())),
        )
        .await?;

        Ok(())
    }
}
