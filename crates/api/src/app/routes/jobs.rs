use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use taskgate_core::JobId;

use crate::app::dto::{self, CleanResponse, ItemList, JobDocument, PushJobRequest};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/queue/:worker_type", get(list_queue).post(push_job))
        .route("/clean", post(clean_jobs))
        .route("/:job_id", get(get_job))
}

pub async fn list_queue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(worker_type): Path<String>,
) -> axum::response::Response {
    match services
        .gateway
        .queued_jobs(principal.principal(), tenant.tenant_id(), &worker_type)
    {
        Ok(jobs) => (StatusCode::OK, Json(ItemList::<JobDocument>::from_records(jobs))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn push_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(worker_type): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    let body: PushJobRequest = match dto::parse_body(&body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.gateway.push_job(
        principal.principal(),
        tenant.tenant_id(),
        &worker_type,
        body.arguments,
        body.options,
    ) {
        Ok(job) => (StatusCode::ACCEPTED, Json(JobDocument::from(job))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let Ok(job_id) = job_id.parse::<JobId>() else {
        return errors::unknown_id("job");
    };

    match services
        .gateway
        .get_job(principal.principal(), tenant.tenant_id(), job_id)
    {
        Ok(job) => (StatusCode::OK, Json(JobDocument::from(job))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn clean_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services
        .gateway
        .clean_jobs(principal.principal(), tenant.tenant_id())
    {
        Ok(report) => (
            StatusCode::OK,
            Json(CleanResponse {
                deleted: report.reclaimed,
            }),
        )
            .into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}
