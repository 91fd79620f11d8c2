//! mc-db: metadata persistence layer.
//!
//! SQLite-backed storage for asset groups and their variant records, with
//! connection pooling, embedded migrations, typed models, and a buffered
//! [`session::WriteSession`] that commits one asset's variants at once.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod session;
