//! Invitation domain model.
//!
//! An invitation bridges an email address with no account into a
//! company membership. Lifecycle: `pending → accepted` (exactly once,
//! on matching signup) or `pending → declined`; no transition leaves
//! either terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub invited_at: DateTime<Utc>,
}

/// Fields required to create a new invitation. Status is always
/// `pending` at creation. Duplicate pending rows for the same
/// `(email, project)` are allowed; resolution picks the oldest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitation {
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub role: Role,
}
