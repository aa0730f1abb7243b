//! Company domain model.
//!
//! A company is the tenant boundary: it owns projects and carries the
//! member ledger that records which users belong to it and with what
//! role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// Status of a company member entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Invited,
}

/// One entry in a company's member ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyMember {
    pub user_id: Uuid,
    pub role: Role,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    /// Display name as entered at signup (trimmed). Uniqueness is
    /// enforced on the lowercased form.
    pub name: String,
    /// Plan gate flag, flipped by the billing capture callback.
    pub premium: bool,
    pub members: Vec<CompanyMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
}
