//! HTTP routing topology (spec.md §6).

use crate::handlers::{auth, bulk_search, health, query, stream, sync, upload};
use crate::middleware::{auth_guard, health_guard};
use crate::state::AppState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(application_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let upload_routes = Router::new()
        .route("/init", post(upload::init))
        .route("/:upload_id/part", post(upload::part))
        .route("/:upload_id/complete", post(upload::complete))
        .route("/:upload_id/cancel", post(upload::cancel))
        .route("/", get(upload::list))
        .route("/:file_id/rows", get(upload::rows));

    let query_routes = Router::new()
        .route("/search-part", post(query::search_part))
        .route("/search-part-bulk", post(query::search_part_bulk));

    let bulk_search_routes =
        Router::new().route("/bulk-excel-search", post(bulk_search::bulk_excel_search));

    let sync_routes = Router::new()
        .route("/sync-file/:file_id", post(sync::sync_file))
        .route("/sync-all", post(sync::sync_all))
        .route("/sync-status/:file_id", get(sync::sync_status));

    let health_routes = Router::new().route("/live", get(health::live)).route("/ready", get(health::ready));

    let protected = Router::new()
        .nest("/upload", upload_routes)
        .nest("/query", query_routes)
        .nest("/bulk-search", bulk_search_routes)
        .nest("/sync", sync_routes)
        .route("/ws/:file_id", get(stream::subscribe))
        .layer(middleware::from_fn_with_state(application_state.clone(), health_guard))
        .layer(middleware::from_fn_with_state(application_state.clone(), auth_guard));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/health", health_routes)
        .merge(protected)
        .layer(cors)
        .with_state(application_state)
}
