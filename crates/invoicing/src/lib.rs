//! Invoicing domain module.
//!
//! This crate contains business rules for invoices and the form schema used to
//! accept them, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod form;
pub mod invoice;
pub mod schema;

pub use form::{FieldErrors, FormState, InvoiceField, RawInvoiceFields};
pub use invoice::{AmountCents, Invoice, InvoiceStatus, ValidatedInvoice};
pub use schema::{FormSchema, InvoiceSchema, create_form, update_form};
