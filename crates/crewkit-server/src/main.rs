//! CREWKIT Server — application entry point.
//!
//! Bootstraps the process: structured logging, an explicitly
//! constructed database connection (never an ambient global),
//! migrations, and the collaboration services wired over a shared
//! event bus.

use std::env;
use std::sync::Arc;

use crewkit_auth::{AuthConfig, AuthService};
use crewkit_collab::{
    EventBus, InvitationService, LogNotifier, MembershipService, PlanLimits, SignupPolicy,
    SignupService, TaskService,
};
use crewkit_db::repository::{
    SurrealCompanyRepository, SurrealInvitationRepository, SurrealProjectRepository,
    SurrealTaskRepository, SurrealUserRepository,
};
use crewkit_db::{DbConfig, DbManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crewkit=info".parse()?))
        .json()
        .init();

    info!("Starting CREWKIT server...");

    let manager = DbManager::connect(&DbConfig::from_env()).await?;
    manager.migrate().await?;
    let db = manager.client().clone();

    let bus = Arc::new(EventBus::default());
    let pepper = env::var("CREWKIT_PASSWORD_PEPPER").ok();
    let policy = SignupPolicy {
        pepper: pepper.clone(),
        ..SignupPolicy::default()
    };
    let auth_config = AuthConfig {
        jwt_private_key_pem: env_or("CREWKIT_JWT_PRIVATE_KEY_PEM", ""),
        jwt_public_key_pem: env_or("CREWKIT_JWT_PUBLIC_KEY_PEM", ""),
        pepper,
        ..AuthConfig::default()
    };

    let _membership = MembershipService::new(
        SurrealCompanyRepository::new(db.clone()),
        SurrealProjectRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        bus.clone(),
        PlanLimits::default(),
    );
    let _invitations = InvitationService::new(
        SurrealInvitationRepository::new(db.clone()),
        SurrealProjectRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        LogNotifier,
    );
    let _signup = SignupService::new(
        SurrealCompanyRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        SurrealInvitationRepository::new(db.clone()),
        policy,
    );
    let _tasks = TaskService::new(
        SurrealTaskRepository::new(db.clone()),
        SurrealProjectRepository::new(db.clone()),
        bus,
    );
    let _auth = AuthService::new(SurrealUserRepository::new(db), auth_config);

    info!("CREWKIT services ready");

    // TODO: mount the HTTP API over these services once the transport
    // layer lands.
    tokio::signal::ctrl_c().await?;

    info!("CREWKIT server stopped.");
    Ok(())
}
