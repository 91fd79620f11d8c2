//! # mc-codec
//!
//! Adapters over the codec libraries that actually touch pixels and
//! samples.
//!
//! - **Image codec** ([`image`]): decode once into frames, apply a
//!   [`mc_media::TransformPlan`] per frame, encode to the target format.
//! - **Video backend** ([`VideoBackend`], [`FfmpegBackend`]): open sources
//!   with ffprobe and transcode variants with ffmpeg.
//! - **Tool discovery** ([`ToolRegistry`]) and **command execution**
//!   ([`ToolCommand`]) for the external binaries.

pub mod command;
pub mod image;
pub mod probe;
pub mod tools;
pub mod video;

pub use command::{ToolCommand, ToolFailure, ToolOutput};
pub use tools::{ToolInfo, ToolRegistry};
pub use video::{FfmpegBackend, VideoBackend, VideoJob, VideoSource};
