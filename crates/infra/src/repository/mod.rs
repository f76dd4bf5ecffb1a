//! Invoice persistence.
//!
//! The `invoices` table is consumed through [`InvoiceRepository`]. Writes are
//! single parameterized statements; there is no locking or versioning beyond
//! what the database's isolation level gives.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use invoicedesk_core::InvoiceId;
use invoicedesk_invoicing::{Invoice, ValidatedInvoice};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryInvoiceRepository;
pub use postgres::PostgresInvoiceRepository;

/// Storage-layer failure.
///
/// These are **infrastructure errors**. Callers at the operation boundary turn
/// them into an opaque message; the variant and detail are for logs only.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A table constraint rejected the write (unique, check, not-null).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The database could not be reached (pool closed, timeout, IO).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back to an `Invoice`.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Parameterized access to the `invoices` table.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new row. Fails with `Constraint` if the id already exists.
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError>;

    /// Overwrite `customer_id`, `amount` and `status` of the row keyed by `id`.
    ///
    /// Returns the number of rows affected; 0 means no such invoice.
    async fn update(&self, id: InvoiceId, changes: &ValidatedInvoice) -> Result<u64, RepositoryError>;

    /// Hard delete. Returns the number of rows affected.
    async fn delete(&self, id: InvoiceId) -> Result<u64, RepositoryError>;

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError>;
}

#[async_trait]
impl<S> InvoiceRepository for Arc<S>
where
    S: InvoiceRepository + ?Sized,
{
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        (**self).insert(invoice).await
    }

    async fn update(&self, id: InvoiceId, changes: &ValidatedInvoice) -> Result<u64, RepositoryError> {
        (**self).update(id, changes).await
    }

    async fn delete(&self, id: InvoiceId) -> Result<u64, RepositoryError> {
        (**self).delete(id).await
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        (**self).get(id).await
    }
}
