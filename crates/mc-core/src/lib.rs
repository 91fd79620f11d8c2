//! mc-core: shared types, ids, errors, and configuration.
//!
//! This crate is the foundational dependency for all other mc-* crates,
//! providing the group identifier, a unified error type, the variant
//! configuration model, and application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod variant;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::GroupId;
pub use variant::*;
