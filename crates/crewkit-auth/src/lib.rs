//! CREWKIT Auth — the identity provider: Argon2id password hashing,
//! EdDSA JWT issuance/validation, and the login service.
//!
//! Tokens carry the user id, company id and company role as claims;
//! the collaboration core only consumes these claims, it never mints
//! or verifies tokens itself.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, LoginInput, LoginOutput};
pub use token::AccessTokenClaims;
