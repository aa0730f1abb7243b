//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Uniqueness rules (company name,
//! project name within a company, user email) are UNIQUE indexes so
//! that concurrent writers race at the store, not in application code.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Companies (global scope)
-- =======================================================================
DEFINE TABLE company SCHEMAFULL;
DEFINE FIELD name ON TABLE company TYPE string;
DEFINE FIELD name_key ON TABLE company TYPE string;
DEFINE FIELD premium ON TABLE company TYPE bool DEFAULT false;
DEFINE FIELD members ON TABLE company TYPE array DEFAULT [];
DEFINE FIELD members.* ON TABLE company TYPE object;
DEFINE FIELD members.*.user_id ON TABLE company TYPE string;
DEFINE FIELD members.*.role ON TABLE company TYPE string \
    ASSERT $value IN ['admin', 'member'];
DEFINE FIELD members.*.status ON TABLE company TYPE string \
    ASSERT $value IN ['active', 'invited'];
DEFINE FIELD created_at ON TABLE company TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE company TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_company_name_key ON TABLE company \
    COLUMNS name_key UNIQUE;

-- =======================================================================
-- Projects (company scope)
-- =======================================================================
DEFINE TABLE project SCHEMAFULL;
DEFINE FIELD company_id ON TABLE project TYPE string;
DEFINE FIELD owner_id ON TABLE project TYPE string;
DEFINE FIELD name ON TABLE project TYPE string;
DEFINE FIELD name_key ON TABLE project TYPE string;
DEFINE FIELD member_ids ON TABLE project TYPE array DEFAULT [];
DEFINE FIELD member_ids.* ON TABLE project TYPE string;
DEFINE FIELD created_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_project_company_name ON TABLE project \
    COLUMNS company_id, name_key UNIQUE;
DEFINE INDEX idx_project_company ON TABLE project COLUMNS company_id;

-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD company_id ON TABLE user TYPE option<string>;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['admin', 'member'];
DEFINE FIELD title ON TABLE user TYPE option<string>;
DEFINE FIELD phone ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Invitations (company scope, no dedup index — duplicates allowed)
-- =======================================================================
DEFINE TABLE invitation SCHEMAFULL;
DEFINE FIELD project_id ON TABLE invitation TYPE string;
DEFINE FIELD company_id ON TABLE invitation TYPE string;
DEFINE FIELD email ON TABLE invitation TYPE string;
DEFINE FIELD role ON TABLE invitation TYPE string \
    ASSERT $value IN ['admin', 'member'];
DEFINE FIELD status ON TABLE invitation TYPE string \
    ASSERT $value IN ['pending', 'accepted', 'declined'];
DEFINE FIELD invited_at ON TABLE invitation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_invitation_email_status ON TABLE invitation \
    COLUMNS email, status;
DEFINE INDEX idx_invitation_project ON TABLE invitation \
    COLUMNS project_id;

-- =======================================================================
-- Tasks (project scope)
-- =======================================================================
DEFINE TABLE task SCHEMAFULL;
DEFINE FIELD project_id ON TABLE task TYPE string;
DEFINE FIELD title ON TABLE task TYPE string;
DEFINE FIELD description ON TABLE task TYPE option<string>;
DEFINE FIELD status ON TABLE task TYPE string \
    ASSERT $value IN ['todo', 'in-progress', 'done'];
DEFINE FIELD priority ON TABLE task TYPE string \
    ASSERT $value IN ['low', 'medium', 'high'];
DEFINE FIELD assignee_id ON TABLE task TYPE option<string>;
DEFINE FIELD due_date ON TABLE task TYPE option<datetime>;
DEFINE FIELD completed_at ON TABLE task TYPE option<datetime>;
DEFINE FIELD history ON TABLE task TYPE array DEFAULT [];
DEFINE FIELD history.* ON TABLE task TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE task TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE task TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_task_project ON TABLE task COLUMNS project_id;

-- =======================================================================
-- Documents (written by the external upload path; defined here so the
-- shared store stays schemaful)
-- =======================================================================
DEFINE TABLE document SCHEMAFULL;
DEFINE FIELD company_id ON TABLE document TYPE string;
DEFINE FIELD project_id ON TABLE document TYPE string;
DEFINE FIELD name ON TABLE document TYPE string;
DEFINE FIELD status ON TABLE document TYPE string \
    ASSERT $value IN ['processing', 'ready', 'failed'];
DEFINE FIELD uploaded_by ON TABLE document TYPE string;
DEFINE FIELD storage_key ON TABLE document TYPE string;
DEFINE FIELD created_at ON TABLE document TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_document_project ON TABLE document \
    COLUMNS project_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn flexible_fields_order_the_clause_after_the_type() {
        // SurrealDB rejects `FLEXIBLE TYPE ...`; the keyword must
        // follow the type.
        for line in SCHEMA_V1.lines().filter(|l| l.contains("FLEXIBLE")) {
            assert!(
                line.contains("TYPE object FLEXIBLE"),
                "bad FLEXIBLE clause order: {line}"
            );
        }
        assert!(SCHEMA_V1.contains("TYPE object FLEXIBLE"));
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
