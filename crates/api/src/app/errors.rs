use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use taskgate_infra::{ErrorCategory, GatewayError};

/// Translate a gateway failure into the client-facing error body.
///
/// Client errors carry the gateway's message. Internal failures are logged
/// and answered with a fixed message so collaborator details stay in the
/// process.
pub fn gateway_error_to_response(err: GatewayError) -> axum::response::Response {
    match err.category() {
        ErrorCategory::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        ErrorCategory::InvalidAttribute { field } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "invalid_attribute",
                "message": err.to_string(),
                "field": field,
            })),
        )
            .into_response(),
        ErrorCategory::Forbidden => {
            tracing::warn!(error = %err, "permission denied");
            json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
        }
        ErrorCategory::Unavailable => {
            tracing::warn!(error = %err, "collaborator refused work");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "internal", err.to_string())
        }
        ErrorCategory::Aggregate => {
            let (reclaimed, causes) = match &err {
                GatewayError::Aggregate(agg) => (agg.reclaimed, agg.causes().collect::<Vec<_>>()),
                _ => (0, Vec::new()),
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({
                    "error": "aggregate_error",
                    "message": err.to_string(),
                    "reclaimed": reclaimed,
                    "causes": causes,
                })),
            )
                .into_response()
        }
        ErrorCategory::Internal => {
            tracing::error!(error = %err, "gateway failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
    }
}

pub fn bad_request(err: serde_json::Error) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request", format!("malformed JSON body: {err}"))
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 404 for a path identifier that cannot name an existing record.
pub fn unknown_id(kind: &'static str) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{kind} not found"))
}
