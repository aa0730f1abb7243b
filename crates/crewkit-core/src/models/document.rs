//! Document domain model.
//!
//! Read-only from the collaboration core's perspective: byte storage
//! and the upload path are external collaborators. The type exists
//! because uploaded documents share the event bus (`document-uploaded`
//! carries the full record) and routing needs its project/company ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub company_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub status: DocumentStatus,
    pub uploaded_by: Uuid,
    /// Opaque reference into blob storage.
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}
