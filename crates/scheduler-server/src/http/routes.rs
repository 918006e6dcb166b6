use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use scheduler_core::Scheduler;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    abort_job, create_job, delete_tag, get_job, get_tag, get_tags, job_log, list_jobs, list_tag_keys,
    restart_job, search_by_tag, set_tag, system_display, system_info, AppState,
};

pub fn build_router(scheduler: Arc<Scheduler>) -> Router {
    let state = AppState { scheduler };

    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
        .route("/newJob", post(create_job))
        .route("/jobs/:id/abort", post(abort_job))
        .route("/jobs/:id/restart", post(restart_job))
        .route("/jobs/:id/log", get(job_log))
        .route("/jobs/:id/tags", get(get_tags))
        .route("/jobs/:id/tags/:key", get(get_tag))
        .route("/jobs/:id/tags/:key", post(set_tag))
        .route("/jobs/:id/tags/:key", delete(delete_tag))
        .route("/tags", get(list_tag_keys))
        .route("/search", get(search_by_tag))
        .route("/system/info", get(system_info))
        .route("/system/displays/:kind", get(system_display))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
