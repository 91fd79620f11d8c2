//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use mc_core::{GroupId, ImageFormat, VideoCodec};
use rusqlite::types::Type;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Parse a group id from a text column.
fn parse_group_id(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<GroupId> {
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_err(idx, e))
}

/// Parse a serde string enum (MIME type, codec name) from a text column.
fn parse_enum<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    serde_json::from_value(serde_json::Value::String(s)).map_err(|e| conversion_err(idx, e))
}

fn get_size(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    u64::try_from(n).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

// ---------------------------------------------------------------------------
// ImageGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ImageGroup {
    pub id: GroupId,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    /// Content type claimed by the uploading client.
    pub content_type: String,
    pub created_at: String,
}

impl ImageGroup {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_group_id(row, 0)?,
            filename: row.get(1)?,
            width: row.get(2)?,
            height: row.get(3)?,
            content_type: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// ImageVariant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ImageVariant {
    pub group_id: GroupId,
    pub tag: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub content_type: ImageFormat,
}

impl ImageVariant {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            group_id: parse_group_id(row, 0)?,
            tag: row.get(1)?,
            size: get_size(row, 2)?,
            width: row.get(3)?,
            height: row.get(4)?,
            quality: row.get(5)?,
            content_type: parse_enum(row, 6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// VideoGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VideoGroup {
    pub id: GroupId,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub frame_rate: u32,
    /// Set when the source carries no audio stream.
    pub mute: bool,
    pub created_at: String,
}

impl VideoGroup {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_group_id(row, 0)?,
            filename: row.get(1)?,
            width: row.get(2)?,
            height: row.get(3)?,
            duration: row.get(4)?,
            frame_rate: row.get(5)?,
            mute: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

// ---------------------------------------------------------------------------
// VideoVariant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct VideoVariant {
    pub group_id: GroupId,
    pub tag: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    /// Absolute trim start in seconds.
    pub start: f64,
    /// Absolute trim end in seconds.
    pub end: f64,
    pub duration: f64,
    pub frame_rate: u32,
    pub codec: VideoCodec,
    pub bitrate: Option<u32>,
    pub mute: bool,
    pub audio_sample_rate: Option<u32>,
}

impl VideoVariant {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            group_id: parse_group_id(row, 0)?,
            tag: row.get(1)?,
            size: get_size(row, 2)?,
            width: row.get(3)?,
            height: row.get(4)?,
            start: row.get(5)?,
            end: row.get(6)?,
            duration: row.get(7)?,
            frame_rate: row.get(8)?,
            codec: parse_enum(row, 9)?,
            bitrate: row.get(10)?,
            mute: row.get(11)?,
            audio_sample_rate: row.get(12)?,
        })
    }
}
