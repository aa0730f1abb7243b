//! SurrealDB connection management.
//!
//! The connection is an explicitly constructed instance owned by the
//! process bootstrap and passed into each repository — never a
//! process-wide ambient global. Configuration comes from `CREWKIT_DB_*`
//! environment variables with local-dev defaults.

use std::env;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "crewkit".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Build the configuration from `CREWKIT_DB_*` environment
    /// variables, falling back to the local-dev defaults for any that
    /// are unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("CREWKIT_DB_URL", defaults.url),
            namespace: env_or("CREWKIT_DB_NAMESPACE", defaults.namespace),
            database: env_or("CREWKIT_DB_DATABASE", defaults.database),
            username: env_or("CREWKIT_DB_USERNAME", defaults.username),
            password: env_or("CREWKIT_DB_PASSWORD", defaults.password),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

/// Owns the SurrealDB client for the lifetime of the process.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, authenticate as root, and select the configured
    /// namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("SurrealDB connection established");

        Ok(Self { db })
    }

    /// Apply pending schema migrations over this connection.
    pub async fn migrate(&self) -> Result<(), DbError> {
        schema::run_migrations(&self.db).await
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
