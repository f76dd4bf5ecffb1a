use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use invoicedesk_core::InvoiceId;
use invoicedesk_infra::{ActionOutcome, RejectionKind};
use invoicedesk_invoicing::{FormState, RawInvoiceFields};

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invoice))
        .route("/revalidations", get(revalidations))
        .route("/:id", get(get_invoice))
        .route("/:id/edit", post(update_invoice))
        .route("/:id/delete", post(delete_invoice))
}

/// POST /dashboard/invoices
pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let form = RawInvoiceFields::from_pairs(pairs);
    let outcome = services.mutations.create(&FormState::default(), &form).await;
    outcome_to_response(&services, outcome)
}

/// POST /dashboard/invoices/:id/edit
pub async fn update_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let form = RawInvoiceFields::from_pairs(pairs);
    let outcome = services.mutations.update(id, &form).await;
    outcome_to_response(&services, outcome)
}

/// POST /dashboard/invoices/:id/delete
pub async fn delete_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.mutations.delete(id).await {
        Ok(outcome) => outcome_to_response(&services, outcome),
        Err(e) => errors::action_error_to_response(e),
    }
}

/// GET /dashboard/invoices/:id
pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.mutations.get(id).await {
        Ok(Some(invoice)) => Json(dto::InvoiceResponse::from(&invoice)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "invoice not found"),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// GET /dashboard/invoices/revalidations
pub async fn revalidations(Extension(services): Extension<Arc<AppServices>>) -> Response {
    services::revalidation_sse_stream(services).into_response()
}

fn parse_id(raw: &str) -> Result<InvoiceId, Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid invoice id"))
}

/// Revalidate first, then redirect. Rejections re-render from their form state.
fn outcome_to_response(services: &AppServices, outcome: ActionOutcome) -> Response {
    match outcome {
        ActionOutcome::Committed(committed) => {
            committed.revalidate_with(&services.route_cache);
            match committed.redirect {
                Some(location) => Redirect::to(&location).into_response(),
                None => {
                    let state = FormState {
                        errors: None,
                        message: committed.message,
                    };
                    (StatusCode::OK, Json(state)).into_response()
                }
            }
        }
        ActionOutcome::Rejected(rejection) => {
            let status = match rejection.kind {
                RejectionKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                RejectionKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(rejection.state)).into_response()
        }
    }
}
