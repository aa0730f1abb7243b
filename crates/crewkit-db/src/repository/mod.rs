//! SurrealDB repository implementations.

mod company;
mod invitation;
mod project;
mod task;
mod user;

pub use company::SurrealCompanyRepository;
pub use invitation::SurrealInvitationRepository;
pub use project::SurrealProjectRepository;
pub use task::SurrealTaskRepository;
pub use user::SurrealUserRepository;

use crewkit_core::models::user::Role;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Member => "member",
    }
}

pub(crate) fn parse_role(s: &str) -> Result<Role, DbError> {
    match s {
        "admin" => Ok(Role::Admin),
        "member" => Ok(Role::Member),
        other => Err(DbError::Query(format!("unknown role: {other}"))),
    }
}

pub(crate) fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Query(format!("invalid {what} UUID: {e}")))
}
