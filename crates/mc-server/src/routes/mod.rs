//! Route handlers.

pub mod health;
pub mod images;
pub mod upload;
pub mod videos;

use axum::http::{header, HeaderMap, Method};
use axum::response::Response;
use mc_core::{is_identifier, Error, GroupId};
use mc_ingest::AssetStore;

use crate::error::AppError;
use crate::streaming::serve_blob;

/// Resolve `group_id`/`tag` path segments to a blob and stream it.
///
/// Segments outside `[a-zA-Z0-9_-]` (and ids that are not group ids) are
/// answered with 404, so a path can never escape the store root.
pub(crate) async fn serve_variant(
    store: &AssetStore,
    group_id: &str,
    tag: &str,
    headers: &HeaderMap,
    method: &Method,
) -> Result<Response, AppError> {
    let not_found = || Error::not_found("variant", format!("{group_id}/{tag}"));
    if !is_identifier(group_id) || !is_identifier(tag) {
        return Err(not_found().into());
    }
    let group: GroupId = group_id.parse().map_err(|_| not_found())?;

    // A Range header that is not text is malformed, not absent.
    let range = headers
        .get(header::RANGE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()));
    let path = store.blob_path(group, tag);
    serve_blob(&path, range.as_deref(), method).await.map_err(|e| match e {
        Error::NotFound { .. } => not_found().into(),
        other => other.into(),
    })
}

/// Parse a group id for deletion; anything unparsable cannot exist.
pub(crate) fn parse_group_id(raw: &str, entity: &str) -> Result<GroupId, AppError> {
    raw.parse()
        .map_err(|_| Error::not_found(entity.to_string(), raw).into())
}
