//! Domain models for CREWKIT.
//!
//! These are the core types shared across all crates. Enum variants
//! serialize with the wire spellings the existing clients expect
//! (`in-progress`, not `InProgress`).

pub mod company;
pub mod document;
pub mod invitation;
pub mod project;
pub mod task;
pub mod user;
