//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a user within their company. Also the role carried by an
/// invitation and inherited at signup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Globally unique.
    pub email: String,
    pub password_hash: String,
    /// Set at signup — either the founded company or the inviting one.
    pub company_id: Option<Uuid>,
    pub role: Role,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new user. The password is hashed by the
/// auth layer before this struct is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub company_id: Option<Uuid>,
    pub role: Role,
    pub title: Option<String>,
    pub phone: Option<String>,
}
