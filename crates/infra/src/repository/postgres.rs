//! Postgres-backed invoice repository.
//!
//! Every statement is parameterized; values never reach the SQL text.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Constraint` |
//! | Database (not-null / check violation) | `23502` / `23514` | `Constraint` |
//! | Database (invalid text representation) | `22P02` | `Constraint` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | ColumnDecode / Decode | N/A | `CorruptRow` |
//! | Other | N/A | `Storage` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use invoicedesk_core::{CustomerId, InvoiceId};
use invoicedesk_invoicing::{AmountCents, Invoice, InvoiceStatus, ValidatedInvoice};

use super::{InvoiceRepository, RepositoryError};

const CREATE_INVOICES: &str = include_str!("../../migrations/0001_create_invoices.sql");

/// Postgres-backed `invoices` table.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`. Timeouts and
/// connection limits come from the pool; this type adds none of its own.
#[derive(Debug, Clone)]
pub struct PostgresInvoiceRepository {
    pool: Arc<PgPool>,
}

impl PostgresInvoiceRepository {
    /// Create a new repository over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `invoices` table if it does not exist.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(CREATE_INVOICES)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id_typed()), err)]
    async fn insert(&self, invoice: &Invoice) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (id, customer_id, amount, status, date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*invoice.id_typed().as_uuid())
        .bind(invoice.customer_id().as_str())
        .bind(invoice.amount().cents())
        .bind(invoice.status().as_str())
        .bind(invoice.date())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_invoice", e))?;

        Ok(())
    }

    #[instrument(skip(self, changes), fields(invoice_id = %id), err)]
    async fn update(&self, id: InvoiceId, changes: &ValidatedInvoice) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET customer_id = $1, amount = $2, status = $3
            WHERE id = $4
            "#,
        )
        .bind(changes.customer_id.as_str())
        .bind(changes.amount.cents())
        .bind(changes.status.as_str())
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_invoice", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    async fn delete(&self, id: InvoiceId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_invoice", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(invoice_id = %id), err)]
    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, amount, status, date
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_invoice", e))?;

        match row {
            Some(row) => {
                let row = InvoiceRow::from_row(&row).map_err(|e| map_sqlx_error("get_invoice", e))?;
                Ok(Some(Invoice::try_from(row)?))
            }
            None => Ok(None),
        }
    }
}

/// Map SQLx errors to RepositoryError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23502") | Some("23514") | Some("22P02") => {
                    RepositoryError::Constraint(msg)
                }
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            RepositoryError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => RepositoryError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            RepositoryError::CorruptRow(format!("{} in {}", err, operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct InvoiceRow {
    id: uuid::Uuid,
    customer_id: String,
    amount: i64,
    status: String,
    date: NaiveDate,
}

impl<'r> FromRow<'r, PgRow> for InvoiceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(InvoiceRow {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            amount: row.try_get("amount")?,
            status: row.try_get("status")?,
            date: row.try_get("date")?,
        })
    }
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = RepositoryError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let corrupt = |e: invoicedesk_core::DomainError| {
            RepositoryError::CorruptRow(format!("invoice {}: {}", row.id, e))
        };
        let customer_id: CustomerId = row.customer_id.parse().map_err(corrupt)?;
        let amount = AmountCents::new(row.amount).map_err(corrupt)?;
        let status: InvoiceStatus = row.status.parse().map_err(corrupt)?;

        Ok(Invoice::from_parts(
            InvoiceId::from_uuid(row.id),
            customer_id,
            amount,
            status,
            row.date,
        ))
    }
}
