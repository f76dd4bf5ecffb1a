//! Invoice mutation pipeline (application-level orchestration).
//!
//! This module implements the form-action flow for invoices: validate the
//! submitted fields, issue one parameterized write, and report what the caller
//! should do next.
//!
//! ## Execution Flow
//!
//! ```text
//! Raw form fields
//!   ↓
//! 1. Validate against the shared schema (all fields, one pass)
//!   ↓  failure → Rejected(Validation, form state with field errors)
//! 2. Coerce (amount → cents, today's date for new invoices)
//!   ↓
//! 3. Single write through the repository
//!   ↓  failure → Rejected(Persistence, fixed message); cause is logged
//! 4. Committed { revalidate: "/dashboard/invoices", redirect: ... }
//! ```
//!
//! The service never performs the revalidation or the redirect itself. Both
//! are returned as data and the HTTP layer applies them, in that order, only
//! on the committed path.
//!
//! ## Error Semantics
//!
//! - **Validation**: user-correctable, recovered into a [`FormState`] with
//!   per-field messages. Create and update behave the same way.
//! - **Persistence**: any [`RepositoryError`], recovered into a fixed message
//!   per operation. The cause goes to the log, never to the caller.
//! - **Unimplemented**: delete while the feature flag is off. Returned as
//!   `Err(ActionError::Unimplemented)` and never recovered into a form state.
//!
//! No retries, locks, or version checks: a failed write is reported once, and
//! concurrent updates race at the database's isolation level.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use invoicedesk_core::{Clock, InvoiceId, SystemClock};
use invoicedesk_invoicing::{
    FormState, Invoice, RawInvoiceFields, create_form, update_form,
};

use crate::repository::{InvoiceRepository, RepositoryError};
use crate::route_cache::{INVOICES_PATH, RouteCache};

const CREATE_FAILED: &str = "Database Error: Failed to Create Invoice.";
const UPDATE_FAILED: &str = "Database Error: Failed to Update Invoice.";
const DELETE_FAILED: &str = "Database Error: Failed to Delete Invoice.";
const DELETED: &str = "Deleted Invoice.";

/// A mutation that reached storage and was acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Route to mark stale before anything else happens.
    pub revalidate: String,
    /// Where to send the caller afterwards, if anywhere.
    pub redirect: Option<String>,
    /// Confirmation to show when there is no redirect.
    pub message: Option<String>,
    /// The invoice the mutation targeted.
    pub invoice_id: InvoiceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Validation,
    Persistence,
}

/// A recovered failure: the form re-renders from `state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub state: FormState,
}

impl Rejection {
    fn persistence(message: &str) -> Self {
        Self {
            kind: RejectionKind::Persistence,
            state: FormState::message(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Committed(Committed),
    Rejected(Rejection),
}

impl Committed {
    /// Apply the revalidation half of the outcome. The redirect is left to
    /// the caller's transport.
    pub fn revalidate_with(&self, cache: &impl RouteCache) {
        cache.revalidate_path(&self.revalidate);
    }
}

impl ActionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ActionOutcome::Committed(_))
    }
}

/// Failures that are not turned into form state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

/// Feature switches for the mutation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationSettings {
    /// When false, delete fails with [`ActionError::Unimplemented`] before
    /// touching storage.
    pub delete_enabled: bool,
    /// Listing route that is revalidated and redirected to.
    pub listing_path: String,
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self {
            delete_enabled: false,
            listing_path: INVOICES_PATH.to_string(),
        }
    }
}

/// Create, update and delete for invoices.
///
/// Stateless apart from its collaborators; share it behind an `Arc` and call
/// it from any number of concurrent requests.
///
/// ## Generic Parameters
///
/// - `R`: repository implementation (`InMemoryInvoiceRepository` in tests,
///   `PostgresInvoiceRepository` in production, or `Arc<dyn InvoiceRepository>`).
pub struct InvoiceMutationService<R> {
    repo: R,
    clock: Arc<dyn Clock>,
    settings: MutationSettings,
}

impl<R> InvoiceMutationService<R> {
    pub fn new(repo: R, settings: MutationSettings) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// Replace the clock used to stamp creation dates.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn settings(&self) -> &MutationSettings {
        &self.settings
    }

    fn committed(&self, invoice_id: InvoiceId, redirect: bool, message: Option<&str>) -> Committed {
        Committed {
            revalidate: self.settings.listing_path.clone(),
            redirect: redirect.then(|| self.settings.listing_path.clone()),
            message: message.map(str::to_string),
            invoice_id,
        }
    }
}

impl<R> InvoiceMutationService<R>
where
    R: InvoiceRepository,
{
    /// Validate and insert a new invoice.
    ///
    /// `previous` is the state the form was rendered from; it only matters
    /// for logging resubmissions.
    #[instrument(skip_all, fields(invoice_id = tracing::field::Empty))]
    pub async fn create(&self, previous: &FormState, form: &RawInvoiceFields) -> ActionOutcome {
        let validated = match create_form().validate(form) {
            Ok(v) => v,
            Err(state) => {
                tracing::debug!(
                    resubmission = previous.has_errors(),
                    "create invoice rejected by validation"
                );
                return ActionOutcome::Rejected(Rejection {
                    kind: RejectionKind::Validation,
                    state,
                });
            }
        };

        let invoice = Invoice::create(InvoiceId::new(), self.clock.today(), validated);
        let invoice_id = invoice.id_typed();
        tracing::Span::current().record("invoice_id", tracing::field::display(invoice_id));

        if let Err(e) = self.repo.insert(&invoice).await {
            log_storage_failure("create", invoice_id, &e);
            return ActionOutcome::Rejected(Rejection::persistence(CREATE_FAILED));
        }

        tracing::info!(
            amount_cents = invoice.amount().cents(),
            status = %invoice.status(),
            "invoice created"
        );
        ActionOutcome::Committed(self.committed(invoice_id, true, None))
    }

    /// Validate and overwrite the mutable fields of invoice `id`.
    ///
    /// An id that matches no row is not an error: the write affects zero rows
    /// and the outcome is still `Committed`.
    #[instrument(skip(self, form), fields(invoice_id = %id))]
    pub async fn update(&self, id: InvoiceId, form: &RawInvoiceFields) -> ActionOutcome {
        let validated = match update_form().validate(form) {
            Ok(v) => v,
            Err(state) => {
                tracing::debug!("update invoice rejected by validation");
                return ActionOutcome::Rejected(Rejection {
                    kind: RejectionKind::Validation,
                    state,
                });
            }
        };

        match self.repo.update(id, &validated).await {
            Ok(0) => tracing::warn!("update matched no invoice; treating as success"),
            Ok(_) => tracing::info!(
                amount_cents = validated.amount.cents(),
                status = %validated.status,
                "invoice updated"
            ),
            Err(e) => {
                log_storage_failure("update", id, &e);
                return ActionOutcome::Rejected(Rejection::persistence(UPDATE_FAILED));
            }
        }

        ActionOutcome::Committed(self.committed(id, true, None))
    }

    /// Hard-delete invoice `id`.
    ///
    /// Gated by [`MutationSettings::delete_enabled`]. On success the listing
    /// is revalidated but the caller is not redirected.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn delete(&self, id: InvoiceId) -> Result<ActionOutcome, ActionError> {
        if !self.settings.delete_enabled {
            return Err(ActionError::Unimplemented("delete"));
        }

        match self.repo.delete(id).await {
            Ok(rows) => {
                tracing::info!(rows, "invoice deleted");
                Ok(ActionOutcome::Committed(self.committed(id, false, Some(DELETED))))
            }
            Err(e) => {
                log_storage_failure("delete", id, &e);
                Ok(ActionOutcome::Rejected(Rejection::persistence(DELETE_FAILED)))
            }
        }
    }

    pub async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        self.repo.get(id).await
    }
}

fn log_storage_failure(operation: &'static str, invoice_id: InvoiceId, err: &RepositoryError) {
    tracing::error!(operation, %invoice_id, error = %err, "invoice write failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use invoicedesk_core::FixedClock;
    use invoicedesk_invoicing::{InvoiceField, InvoiceStatus};

    use crate::repository::InMemoryInvoiceRepository;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn service(delete_enabled: bool) -> InvoiceMutationService<Arc<InMemoryInvoiceRepository>> {
        let settings = MutationSettings {
            delete_enabled,
            ..MutationSettings::default()
        };
        InvoiceMutationService::new(Arc::new(InMemoryInvoiceRepository::new()), settings)
            .with_clock(Arc::new(FixedClock(today())))
    }

    fn committed(outcome: ActionOutcome) -> Committed {
        match outcome {
            ActionOutcome::Committed(c) => c,
            other => panic!("expected committed outcome, got {other:?}"),
        }
    }

    fn rejected(outcome: ActionOutcome) -> Rejection {
        match outcome {
            ActionOutcome::Rejected(r) => r,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_inserts_cents_and_today_then_redirects() {
        let svc = service(false);
        let outcome = svc
            .create(&FormState::default(), &RawInvoiceFields::new("c1", "15.50", "paid"))
            .await;

        let c = committed(outcome);
        assert_eq!(c.revalidate, INVOICES_PATH);
        assert_eq!(c.redirect.as_deref(), Some(INVOICES_PATH));

        let stored = svc.repository().get(c.invoice_id).await.unwrap().unwrap();
        assert_eq!(stored.amount().cents(), 1550);
        assert_eq!(stored.status(), InvoiceStatus::Paid);
        assert_eq!(stored.customer_id().as_str(), "c1");
        assert_eq!(stored.date(), today());
    }

    #[tokio::test]
    async fn invalid_create_reports_every_field_and_writes_nothing() {
        let svc = service(false);
        let outcome = svc
            .create(&FormState::default(), &RawInvoiceFields::new("", "", "bad"))
            .await;

        let r = rejected(outcome);
        assert_eq!(r.kind, RejectionKind::Validation);
        let errors = r.state.errors.unwrap();
        assert_eq!(
            errors.fields(),
            vec![InvoiceField::CustomerId, InvoiceField::Amount, InvoiceField::Status]
        );
        assert_eq!(svc.repository().write_attempts(), 0);
    }

    #[tokio::test]
    async fn invalid_update_is_recovered_not_fatal() {
        let svc = service(false);
        let outcome = svc
            .update(InvoiceId::new(), &RawInvoiceFields::new("c1", "-4", "pending"))
            .await;

        let r = rejected(outcome);
        assert_eq!(r.kind, RejectionKind::Validation);
        assert_eq!(
            r.state.message.as_deref(),
            Some("Missing Fields. Failed to Update Invoice.")
        );
        assert_eq!(svc.repository().write_attempts(), 0);
    }

    #[tokio::test]
    async fn delete_is_unimplemented_while_disabled() {
        let svc = service(false);
        let err = svc.delete(InvoiceId::new()).await.unwrap_err();

        assert_eq!(err, ActionError::Unimplemented("delete"));
        assert_eq!(svc.repository().write_attempts(), 0);
    }

    #[tokio::test]
    async fn enabled_delete_revalidates_without_redirect() {
        let svc = service(true);
        let id = committed(
            svc.create(&FormState::default(), &RawInvoiceFields::new("c1", "3", "pending"))
                .await,
        )
        .invoice_id;

        let c = committed(svc.delete(id).await.unwrap());
        assert_eq!(c.revalidate, INVOICES_PATH);
        assert_eq!(c.redirect, None);
        assert_eq!(c.message.as_deref(), Some("Deleted Invoice."));
        assert!(svc.repository().is_empty());
    }

    #[tokio::test]
    async fn storage_failures_map_to_fixed_messages() {
        let svc = service(true);
        svc.repository().set_failing(true);
        let fields = RawInvoiceFields::new("c1", "10", "paid");

        let create = rejected(svc.create(&FormState::default(), &fields).await);
        let update = rejected(svc.update(InvoiceId::new(), &fields).await);
        let delete = rejected(svc.delete(InvoiceId::new()).await.unwrap());

        for (r, msg) in [(create, CREATE_FAILED), (update, UPDATE_FAILED), (delete, DELETE_FAILED)] {
            assert_eq!(r.kind, RejectionKind::Persistence);
            assert_eq!(r.state, FormState::message(msg));
        }
        assert!(svc.repository().is_empty());
    }
}
