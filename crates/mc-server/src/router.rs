//! Axum router construction.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = ctx.config.server.max_upload_mb.saturating_mul(1024 * 1024);

    // Retrieval is public; `get` also answers HEAD.
    let public_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/images/{group_id}/{tag}", get(routes::images::get_image))
        .route("/videos/{group_id}/{tag}", get(routes::videos::get_video));

    let protected_routes = Router::new()
        .route("/images", post(routes::images::upload_images))
        .route("/videos", post(routes::videos::upload_videos))
        .route("/images/{group_id}", delete(routes::images::delete_image_group))
        .route("/videos/{group_id}", delete(routes::videos::delete_video_group))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    public_routes
        .merge(protected_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
