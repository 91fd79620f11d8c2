//! Image upload, retrieval and deletion.

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use mc_core::Error;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;
use crate::routes::upload::{read_image_form, ProcessedImageGroup, UploadResponse};
use crate::routes::{parse_group_id, serve_variant};

/// Multipart field carrying image files.
pub const FILE_FIELD: &str = "images";

/// POST /images
pub async fn upload_images(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    multipart: Multipart,
) -> Result<Json<UploadResponse<ProcessedImageGroup>>, AppError> {
    ingest(&ctx, multipart)
        .await
        .map(Json)
        .map_err(|e| e.with_request_id(request_id.0))
}

async fn ingest(
    ctx: &AppContext,
    multipart: Multipart,
) -> Result<UploadResponse<ProcessedImageGroup>, AppError> {
    let (request, uploads) = read_image_form(multipart, FILE_FIELD).await?;
    tracing::info!(
        files = uploads.len(),
        configs = request.configs.len(),
        mode = ?request.mode,
        "Image upload received"
    );

    let outcomes = ctx.orchestrator.ingest_images(uploads, &request).await?;
    Ok(UploadResponse {
        groups: outcomes.into_iter().map(Into::into).collect(),
    })
}

/// GET /images/{group_id}/{tag}
pub async fn get_image(
    State(ctx): State<AppContext>,
    Path((group_id, tag)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    serve_variant(ctx.orchestrator.image_store(), &group_id, &tag, &headers, &method).await
}

/// DELETE /images/{group_id}
pub async fn delete_image_group(
    State(ctx): State<AppContext>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_group_id(&group_id, "image group")?;
    if ctx.orchestrator.remove_image_group(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found("image group", id).into())
    }
}
