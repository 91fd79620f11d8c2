//! Range-serving responder for stored blobs.
//!
//! Sniffs the blob to decide existence and media type, resolves an optional
//! `Range` header against the file size, and streams the selected bytes in
//! 64 KiB chunks. Dropping the response body (client disconnect) drops the
//! reader and closes the file.

use std::io::SeekFrom;
use std::path::Path;

use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use mc_core::Error;
use mc_media::{parse_range_header, sniff_path, ResolvedRange};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Body chunk size.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Serve the blob at `path`, honouring `range` and answering HEAD with
/// headers only.
///
/// A blob the sniffer cannot find is [`Error::NotFound`]; a malformed range
/// is [`Error::InvalidRange`]. A blob that disappears between sniffing and
/// opening is an internal error.
pub async fn serve_blob(
    path: &Path,
    range: Option<&str>,
    method: &Method,
) -> Result<Response, Error> {
    let media_type = sniff_path(path).await?.ok_or_else(|| {
        Error::not_found(
            "blob",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    })?;

    let requested = range.map(parse_range_header).transpose()?;

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::Internal(format!("blob {} could not be opened: {e}", path.display())))?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(Error::Internal(format!(
            "blob {} is not a regular file",
            path.display()
        )));
    }
    let total = metadata.len();

    let (status, selected) = match requested {
        Some(r) => (StatusCode::PARTIAL_CONTENT, r.resolve(total)),
        None => (
            StatusCode::OK,
            ResolvedRange {
                start: 0,
                len: total,
                total,
            },
        ),
    };

    let body = if *method == Method::HEAD || selected.is_empty() {
        Body::empty()
    } else {
        file.seek(SeekFrom::Start(selected.start)).await?;
        Body::from_stream(ReaderStream::with_capacity(
            file.take(selected.len),
            CHUNK_SIZE,
        ))
    };

    let mut response = (
        status,
        [
            (header::CONTENT_TYPE, media_type.mime().to_string()),
            (header::CONTENT_LENGTH, selected.len.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        body,
    )
        .into_response();

    if status == StatusCode::PARTIAL_CONTENT {
        if let Ok(value) = selected.content_range().parse() {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
    }

    Ok(response)
}
