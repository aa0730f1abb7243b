//! Project domain model.
//!
//! Invariant: `owner_id` is always present in `member_ids`, and
//! `member_ids` has set semantics (no duplicates). Both are enforced by
//! the membership ledger and the store layer, never assumed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub company_id: Uuid,
    pub owner_id: Uuid,
    /// Unique within the company, compared trimmed and case-insensitive.
    pub name: String,
    pub member_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a new project. The owner becomes the sole
/// initial member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub company_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
}
