//! Video upload, retrieval and deletion.

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use mc_core::Error;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;
use crate::routes::upload::{read_video_form, ProcessedVideoGroup, UploadResponse};
use crate::routes::{parse_group_id, serve_variant};

/// Multipart field carrying video files.
pub const FILE_FIELD: &str = "videos";

/// POST /videos
pub async fn upload_videos(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    multipart: Multipart,
) -> Result<Json<UploadResponse<ProcessedVideoGroup>>, AppError> {
    ingest(&ctx, multipart)
        .await
        .map(Json)
        .map_err(|e| e.with_request_id(request_id.0))
}

async fn ingest(
    ctx: &AppContext,
    multipart: Multipart,
) -> Result<UploadResponse<ProcessedVideoGroup>, AppError> {
    let (request, uploads) =
        read_video_form(multipart, FILE_FIELD, ctx.orchestrator.temp_dir()).await?;
    tracing::info!(
        files = uploads.len(),
        configs = request.configs.len(),
        mode = ?request.mode,
        "Video upload received"
    );

    let outcomes = ctx.orchestrator.ingest_videos(uploads, &request).await?;

    Ok(UploadResponse {
        groups: outcomes.into_iter().map(Into::into).collect(),
    })
}

/// GET /videos/{group_id}/{tag}
pub async fn get_video(
    State(ctx): State<AppContext>,
    Path((group_id, tag)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    serve_variant(ctx.orchestrator.video_store(), &group_id, &tag, &headers, &method).await
}

/// DELETE /videos/{group_id}
pub async fn delete_video_group(
    State(ctx): State<AppContext>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_group_id(&group_id, "video group")?;
    if ctx.orchestrator.remove_video_group(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found("video group", id).into())
    }
}
