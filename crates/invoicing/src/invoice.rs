use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use invoicedesk_core::{CustomerId, DomainError, Entity, InvoiceId};

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 2] = [InvoiceStatus::Pending, InvoiceStatus::Paid];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown invoice status: {s:?}")))
    }
}

/// Positive amount in the smallest currency unit (cents).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AmountCents(i64);

impl AmountCents {
    /// Largest storable cent count (2^53 - 1).
    ///
    /// Larger amounts fail validation with the ordinary amount message; the
    /// form does not advertise an upper bound.
    pub const MAX: i64 = (1 << 53) - 1;

    pub fn new(cents: i64) -> Result<Self, DomainError> {
        if cents <= 0 {
            return Err(DomainError::invariant("amount must be greater than zero"));
        }
        if cents > Self::MAX {
            return Err(DomainError::invariant("amount exceeds the storable range"));
        }
        Ok(Self(cents))
    }

    /// Convert a decimal currency amount to cents.
    ///
    /// `amount × 100` is rounded half away from zero in exact decimal
    /// arithmetic, so `1.005` becomes 101 cents. Returns `None` for anything
    /// that does not round to at least one cent or exceeds [`Self::MAX`].
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        let cents = amount
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()?;
        Self::new(cents).ok()
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// The amount in currency units, exact to the cent.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl core::fmt::Display for AmountCents {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl TryFrom<i64> for AmountCents {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AmountCents> for i64 {
    fn from(value: AmountCents) -> Self {
        value.0
    }
}

/// The mutable part of an invoice, after form validation and coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedInvoice {
    pub customer_id: CustomerId,
    pub amount: AmountCents,
    pub status: InvoiceStatus,
}

/// A stored invoice.
///
/// `id` and `date` are write-once: they are set by [`Invoice::create`] and no
/// method changes them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    customer_id: CustomerId,
    amount: AmountCents,
    status: InvoiceStatus,
    date: NaiveDate,
}

impl Invoice {
    pub fn create(id: InvoiceId, date: NaiveDate, fields: ValidatedInvoice) -> Self {
        Self {
            id,
            customer_id: fields.customer_id,
            amount: fields.amount,
            status: fields.status,
            date,
        }
    }

    /// Rebuild from storage columns.
    pub fn from_parts(
        id: InvoiceId,
        customer_id: CustomerId,
        amount: AmountCents,
        status: InvoiceStatus,
        date: NaiveDate,
    ) -> Self {
        Self {
            id,
            customer_id,
            amount,
            status,
            date,
        }
    }

    /// Replace the mutable fields.
    pub fn apply_changes(&mut self, changes: &ValidatedInvoice) {
        self.customer_id = changes.customer_id.clone();
        self.amount = changes.amount;
        self.status = changes.status;
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn amount(&self) -> AmountCents {
        self.amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
