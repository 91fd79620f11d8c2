//! mc-ingest: the variant orchestrator.
//!
//! Turns one uploaded asset plus a list of variant configs into a stored
//! group: decode once, fan the variants out over bounded worker pools,
//! write each variant's bytes through the [`AssetStore`], and commit all
//! variant rows together when every variant succeeded.

pub mod batch;
pub mod image;
pub mod orchestrator;
pub mod pool;
pub mod store;
pub mod video;

pub use batch::{GroupOutcome, GroupStatus};
pub use image::ImageUpload;
pub use orchestrator::{Orchestrator, ProcessedGroup};
pub use pool::{WorkerPool, WorkerPools};
pub use store::AssetStore;
pub use video::VideoUpload;
