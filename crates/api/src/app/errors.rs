use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use invoicedesk_infra::{ActionError, RepositoryError};

pub fn action_error_to_response(err: ActionError) -> axum::response::Response {
    match err {
        ActionError::Unimplemented(_) => {
            json_error(StatusCode::NOT_IMPLEMENTED, "not_implemented", err.to_string())
        }
    }
}

/// Read-path storage failure. The cause is logged, not returned.
pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    tracing::error!(error = %err, "invoice read failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage_error",
        "failed to read invoice",
    )
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
