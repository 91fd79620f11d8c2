//! Query modules, one per table family.

pub mod images;
pub mod videos;
