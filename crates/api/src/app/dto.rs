use chrono::NaiveDate;
use serde::Serialize;

use invoicedesk_invoicing::{Invoice, InvoiceStatus};

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub customer_id: String,
    /// Stored integer cents.
    pub amount_cents: i64,
    /// Display form, two decimals.
    pub amount: String,
    pub status: InvoiceStatus,
    pub date: NaiveDate,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id_typed().to_string(),
            customer_id: invoice.customer_id().as_str().to_string(),
            amount_cents: invoice.amount().cents(),
            amount: invoice.amount().to_string(),
            status: invoice.status(),
            date: invoice.date(),
        }
    }
}
