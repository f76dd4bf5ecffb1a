//! In-memory invoice repository for tests/dev.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use invoicedesk_core::{Entity, InvoiceId};
use invoicedesk_invoicing::{Invoice, ValidatedInvoice};

use super::{InvoiceRepository, RepositoryError};

/// Process-local `invoices` table.
///
/// `set_failing(true)` makes every write fail with `Unavailable` without
/// touching the stored rows, which lets tests simulate an outage.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    rows: RwLock<HashMap<InvoiceId, Invoice>>,
    failing: AtomicBool,
    write_attempts: AtomicUsize,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of insert/update/delete calls that reached this repository,
    /// successful or not.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Invoice> {
        self.rows
            .read()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn begin_write(&self) -> Result<(), RepositoryError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("in-memory table lock poisoned".to_string())
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        self.begin_write()?;
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(invoice.id()) {
            return Err(RepositoryError::Constraint(format!(
                "duplicate invoice id {}",
                invoice.id()
            )));
        }
        rows.insert(*invoice.id(), invoice.clone());
        Ok(())
    }

    async fn update(&self, id: InvoiceId, changes: &ValidatedInvoice) -> Result<u64, RepositoryError> {
        self.begin_write()?;
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.get_mut(&id) {
            Some(invoice) => {
                invoice.apply_changes(changes);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: InvoiceId) -> Result<u64, RepositoryError> {
        self.begin_write()?;
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        Ok(u64::from(rows.remove(&id).is_some()))
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }
}
