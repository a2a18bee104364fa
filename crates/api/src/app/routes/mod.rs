use axum::{Router, routing::get};

pub mod jobs;
pub mod system;
pub mod triggers;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/jobs", jobs::router().merge(triggers::router()))
}
