//! mc-media: pure media helpers shared by the write and read paths.
//!
//! - [`geometry`]: fit-mode geometry, producing a [`geometry::TransformPlan`]
//! - [`sniff`]: magic-byte content type detection
//! - [`range`]: `Range` header parsing and clamping
//! - [`trim`]: video trim window normalization

pub mod geometry;
pub mod range;
pub mod sniff;
pub mod trim;

pub use geometry::{plan_image, plan_video, Crop, Dimensions, Margins, TransformPlan};
pub use range::{parse_range_header, ByteRange, ResolvedRange};
pub use sniff::{sniff_bytes, sniff_path, MediaType};
pub use trim::{normalize_trim, TrimWindow};
