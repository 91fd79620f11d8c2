//! Multipart upload parsing and upload response bodies.
//!
//! An upload carries one `data` field holding the JSON
//! `{"configs": [...], "mode": "single" | "batch"}` and one or more file
//! parts. Image parts are buffered in memory; video parts are spooled to
//! temp files that are deleted when the request finishes.

use std::path::Path;

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use bytes::Bytes;
use mc_core::{Error, ImageConfig, ImageFormat, UploadRequest, VideoCodec, VideoConfig};
use mc_db::models::{ImageVariant, VideoVariant};
use mc_ingest::{GroupOutcome, GroupStatus, ImageUpload, VideoUpload};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::AppError;

/// Name of the JSON field describing the variants.
pub const DATA_FIELD: &str = "data";

fn file_name(field: &Field<'_>) -> String {
    field.file_name().unwrap_or("upload").to_string()
}

fn missing_data() -> AppError {
    Error::Validation(format!("multipart field '{DATA_FIELD}' is required")).into()
}

/// Read an image upload form.
pub async fn read_image_form(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<(UploadRequest<ImageConfig>, Vec<ImageUpload>), AppError> {
    let mut request = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(DATA_FIELD) => request = Some(UploadRequest::from_json(&field.text().await?)?),
            Some(n) if n == file_field => {
                let filename = file_name(&field);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes: Bytes = field.bytes().await?;
                uploads.push(ImageUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            other => tracing::debug!(field = ?other, "Ignoring multipart field"),
        }
    }

    Ok((request.ok_or_else(missing_data)?, uploads))
}

/// Read a video upload form, spooling each file part into `temp_dir`.
///
/// Each spooled file is deleted when its [`VideoUpload`] is dropped, which
/// happens once the orchestrator is done with it.
pub async fn read_video_form(
    mut multipart: Multipart,
    file_field: &str,
    temp_dir: &Path,
) -> Result<(UploadRequest<VideoConfig>, Vec<VideoUpload>), AppError> {
    let mut request = None;
    let mut uploads = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(DATA_FIELD) => request = Some(UploadRequest::from_json(&field.text().await?)?),
            Some(n) if n == file_field => {
                let filename = file_name(&field);
                let (file, path) = tempfile::Builder::new()
                    .prefix("upload-")
                    .tempfile_in(temp_dir)
                    .map_err(Error::from)?
                    .into_parts();
                let mut file = tokio::fs::File::from_std(file);
                let mut size = 0u64;
                while let Some(chunk) = field.chunk().await? {
                    file.write_all(&chunk).await.map_err(Error::from)?;
                    size += chunk.len() as u64;
                }
                file.flush().await.map_err(Error::from)?;
                tracing::debug!(filename = %filename, size, "Spooled video upload");

                uploads.push(VideoUpload::spooled(filename, path));
            }
            other => tracing::debug!(field = ?other, "Ignoring multipart field"),
        }
    }

    Ok((request.ok_or_else(missing_data)?, uploads))
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UploadResponse<G> {
    pub groups: Vec<G>,
}

#[derive(Debug, Serialize)]
pub struct ProcessedImage {
    pub tag: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub content_type: ImageFormat,
}

#[derive(Debug, Serialize)]
pub struct ProcessedImageGroup {
    pub status: GroupStatus,
    pub id: String,
    pub images: Vec<ProcessedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<GroupOutcome<ImageVariant>> for ProcessedImageGroup {
    fn from(outcome: GroupOutcome<ImageVariant>) -> Self {
        Self {
            status: outcome.status,
            id: outcome.id.to_string(),
            images: outcome
                .variants
                .into_iter()
                .map(|v| ProcessedImage {
                    tag: v.tag,
                    size: v.size,
                    width: v.width,
                    height: v.height,
                    quality: v.quality,
                    content_type: v.content_type,
                })
                .collect(),
            error: outcome.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessedVideo {
    pub tag: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub frame_rate: u32,
    pub codec: VideoCodec,
    pub bitrate: Option<u32>,
    pub mute: bool,
    pub audio_sample_rate: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ProcessedVideoGroup {
    pub status: GroupStatus,
    pub id: String,
    pub videos: Vec<ProcessedVideo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<GroupOutcome<VideoVariant>> for ProcessedVideoGroup {
    fn from(outcome: GroupOutcome<VideoVariant>) -> Self {
        Self {
            status: outcome.status,
            id: outcome.id.to_string(),
            videos: outcome
                .variants
                .into_iter()
                .map(|v| ProcessedVideo {
                    tag: v.tag,
                    size: v.size,
                    width: v.width,
                    height: v.height,
                    start: v.start,
                    end: v.end,
                    duration: v.duration,
                    frame_rate: v.frame_rate,
                    codec: v.codec,
                    bitrate: v.bitrate,
                    mute: v.mute,
                    audio_sample_rate: v.audio_sample_rate,
                })
                .collect(),
            error: outcome.error,
        }
    }
}
