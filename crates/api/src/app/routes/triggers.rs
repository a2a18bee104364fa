use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use taskgate_core::TriggerId;
use taskgate_jobs::TriggerRequest;

use crate::app::dto::{self, ItemList, JobDocument, TriggerDocument, TriggerListQuery};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/triggers", get(list_triggers).post(create_trigger))
        .route("/triggers/:trigger_id", get(get_trigger).delete(delete_trigger))
        .route("/triggers/:trigger_id/launch", post(launch_trigger))
}

fn parse_trigger_id(raw: &str) -> Result<TriggerId, axum::response::Response> {
    raw.parse().map_err(|_| errors::unknown_id("trigger"))
}

pub async fn create_trigger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> axum::response::Response {
    let body: TriggerRequest = match dto::parse_body(&body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services
        .gateway
        .add_trigger(principal.principal(), tenant.tenant_id(), body)
    {
        Ok(trigger) => (StatusCode::CREATED, Json(TriggerDocument::from(trigger))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn list_triggers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<TriggerListQuery>,
) -> axum::response::Response {
    match services.gateway.triggers(
        principal.principal(),
        tenant.tenant_id(),
        query.worker.as_deref(),
    ) {
        Ok(triggers) => {
            (StatusCode::OK, Json(ItemList::<TriggerDocument>::from_records(triggers))).into_response()
        }
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn get_trigger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(trigger_id): Path<String>,
) -> axum::response::Response {
    let trigger_id = match parse_trigger_id(&trigger_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .gateway
        .get_trigger(principal.principal(), tenant.tenant_id(), trigger_id)
    {
        Ok(trigger) => (StatusCode::OK, Json(TriggerDocument::from(trigger))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn delete_trigger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(trigger_id): Path<String>,
) -> axum::response::Response {
    let trigger_id = match parse_trigger_id(&trigger_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .gateway
        .delete_trigger(principal.principal(), tenant.tenant_id(), trigger_id)
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn launch_trigger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(trigger_id): Path<String>,
) -> axum::response::Response {
    let trigger_id = match parse_trigger_id(&trigger_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .gateway
        .launch_trigger(principal.principal(), tenant.tenant_id(), trigger_id)
    {
        Ok(job) => (StatusCode::CREATED, Json(JobDocument::from(job))).into_response(),
        Err(e) => errors::gateway_error_to_response(e),
    }
}
