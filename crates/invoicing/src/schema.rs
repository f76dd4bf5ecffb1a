//! Invoice form schema.
//!
//! One process-wide [`InvoiceSchema`] holds the field rules and messages. The
//! create and update forms are derived views over it that differ only in the
//! summary message attached to a failed submission. All three are built once,
//! on first use, and never change.

use std::str::FromStr;
use std::sync::LazyLock;

use invoicedesk_core::CustomerId;
use rust_decimal::Decimal;

use crate::form::{FieldErrors, FormState, InvoiceField, RawInvoiceFields};
use crate::invoice::{AmountCents, InvoiceStatus, ValidatedInvoice};

/// Field rules shared by every invoice form.
#[derive(Debug)]
pub struct InvoiceSchema {
    customer_id_message: &'static str,
    amount_message: &'static str,
    status_message: &'static str,
}

static INVOICE_SCHEMA: LazyLock<InvoiceSchema> = LazyLock::new(|| InvoiceSchema {
    customer_id_message: "Please select a customer",
    amount_message: "Please enter an amount greater than $0.",
    status_message: "Please select an invoice status.",
});

static CREATE_FORM: LazyLock<FormSchema> = LazyLock::new(|| FormSchema {
    base: &INVOICE_SCHEMA,
    failure_summary: "Missing Fields. Failed to Create Invoice.",
});

static UPDATE_FORM: LazyLock<FormSchema> = LazyLock::new(|| FormSchema {
    base: &INVOICE_SCHEMA,
    failure_summary: "Missing Fields. Failed to Update Invoice.",
});

/// Schema view used by the create form.
pub fn create_form() -> &'static FormSchema {
    &CREATE_FORM
}

/// Schema view used by the update form.
pub fn update_form() -> &'static FormSchema {
    &UPDATE_FORM
}

impl InvoiceSchema {
    pub fn shared() -> &'static InvoiceSchema {
        &INVOICE_SCHEMA
    }

    /// Validate every field and collect all violations in one pass.
    pub fn validate(&self, raw: &RawInvoiceFields) -> Result<ValidatedInvoice, FieldErrors> {
        let mut errors = FieldErrors::default();

        let customer_id = raw
            .customer_id
            .as_deref()
            .and_then(|s| s.parse::<CustomerId>().ok());
        if customer_id.is_none() {
            errors.push(InvoiceField::CustomerId, self.customer_id_message);
        }

        let amount = coerce_number(raw.amount.as_deref()).and_then(AmountCents::from_decimal);
        if amount.is_none() {
            errors.push(InvoiceField::Amount, self.amount_message);
        }

        let status = raw
            .status
            .as_deref()
            .and_then(|s| s.parse::<InvoiceStatus>().ok());
        if status.is_none() {
            errors.push(InvoiceField::Status, self.status_message);
        }

        match (customer_id, amount, status) {
            (Some(customer_id), Some(amount), Some(status)) => Ok(ValidatedInvoice {
                customer_id,
                amount,
                status,
            }),
            _ => Err(errors),
        }
    }
}

/// A purpose-specific view over the shared [`InvoiceSchema`].
#[derive(Debug)]
pub struct FormSchema {
    base: &'static InvoiceSchema,
    failure_summary: &'static str,
}

impl FormSchema {
    /// Validate a submission; on failure, return the state the form should
    /// re-render with.
    pub fn validate(&self, raw: &RawInvoiceFields) -> Result<ValidatedInvoice, FormState> {
        self.base
            .validate(raw)
            .map_err(|errors| FormState::invalid(errors, self.failure_summary))
    }
}

/// Numeric coercion for form input: blank or missing input is zero,
/// surrounding whitespace is ignored, anything unparseable is `None`.
///
/// Parsed as an exact decimal so that rounding to cents sees the digits the
/// user typed.
fn coerce_number(input: Option<&str>) -> Option<Decimal> {
    let trimmed = input.unwrap_or("").trim();
    if trimmed.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMER_MSG: &str = "Please select a customer";
    const AMOUNT_MSG: &str = "Please enter an amount greater than $0.";
    const STATUS_MSG: &str = "Please select an invoice status.";

    #[test]
    fn valid_submission_is_coerced() {
        let raw = RawInvoiceFields::new("c1", "15.50", "paid");
        let validated = create_form().validate(&raw).unwrap();

        assert_eq!(validated.customer_id.as_str(), "c1");
        assert_eq!(validated.amount.cents(), 1550);
        assert_eq!(validated.status, InvoiceStatus::Paid);
    }

    #[test]
    fn all_violations_are_reported_together() {
        let raw = RawInvoiceFields::new("", "", "bad");
        let state = create_form().validate(&raw).unwrap_err();

        let errors = state.errors.as_ref().unwrap();
        assert_eq!(errors.get(InvoiceField::CustomerId), [CUSTOMER_MSG]);
        assert_eq!(errors.get(InvoiceField::Amount), [AMOUNT_MSG]);
        assert_eq!(errors.get(InvoiceField::Status), [STATUS_MSG]);
        assert_eq!(
            state.message.as_deref(),
            Some("Missing Fields. Failed to Create Invoice.")
        );
    }

    #[test]
    fn missing_fields_are_field_errors() {
        let state = update_form()
            .validate(&RawInvoiceFields::default())
            .unwrap_err();

        let errors = state.errors.unwrap();
        assert_eq!(errors.fields().len(), 3);
        assert_eq!(
            state.message.as_deref(),
            Some("Missing Fields. Failed to Update Invoice.")
        );
    }

    #[test]
    fn only_the_bad_field_is_reported() {
        let raw = RawInvoiceFields::new("c1", "abc", "pending");
        let errors = InvoiceSchema::shared().validate(&raw).unwrap_err();
        assert_eq!(errors.fields(), vec![InvoiceField::Amount]);
    }

    #[test]
    fn amount_tolerates_surrounding_whitespace() {
        let raw = RawInvoiceFields::new("c1", " 42 ", "pending");
        let validated = create_form().validate(&raw).unwrap();
        assert_eq!(validated.amount.cents(), 4200);
    }

    #[test]
    fn views_share_one_schema() {
        assert!(std::ptr::eq(create_form().base, update_form().base));
        assert!(std::ptr::eq(create_form().base, InvoiceSchema::shared()));
    }

    #[test]
    fn amount_rounds_half_away_from_zero_on_typed_digits() {
        let cases = [("1.005", 101), ("2.675", 268), ("0.005", 1), ("1.0049", 100), ("1e2", 10000)];
        for (input, cents) in cases {
            let raw = RawInvoiceFields::new("c1", input, "paid");
            let validated = create_form().validate(&raw).unwrap();
            assert_eq!(validated.amount.cents(), cents, "input {input}");
        }
    }

    #[test]
    fn amounts_beyond_storable_range_get_the_amount_message() {
        for input in ["90071992547409.92", "1e30", "79228162514264337593543950336"] {
            let raw = RawInvoiceFields::new("c1", input, "paid");
            let errors = InvoiceSchema::shared().validate(&raw).unwrap_err();
            assert_eq!(errors.get(InvoiceField::Amount), [AMOUNT_MSG], "input {input}");
        }
    }

    #[test]
    fn non_finite_words_are_not_amounts() {
        for input in ["NaN", "inf", "-infinity"] {
            let raw = RawInvoiceFields::new("c1", input, "paid");
            let errors = InvoiceSchema::shared().validate(&raw).unwrap_err();
            assert_eq!(errors.fields(), vec![InvoiceField::Amount]);
        }
    }

    #[test]
    fn customer_id_is_kept_as_submitted() {
        let raw = RawInvoiceFields::new(" c1 ", "1", "paid");
        let validated = create_form().validate(&raw).unwrap();
        assert_eq!(validated.customer_id.as_str(), " c1 ");

        let raw = RawInvoiceFields::new("   ", "1", "paid");
        let errors = InvoiceSchema::shared().validate(&raw).unwrap_err();
        assert_eq!(errors.get(InvoiceField::CustomerId), [CUSTOMER_MSG]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: non-positive amounts are always rejected with the amount message.
            #[test]
            fn non_positive_amounts_are_rejected(amount in -1_000_000.0f64..=0.0f64) {
                let raw = RawInvoiceFields::new("c1", amount.to_string(), "pending");
                let errors = InvoiceSchema::shared().validate(&raw).unwrap_err();
                prop_assert_eq!(errors.get(InvoiceField::Amount), [AMOUNT_MSG]);
                prop_assert_eq!(errors.fields(), vec![InvoiceField::Amount]);
            }

            /// Property: anything that is not a number is rejected with the amount message.
            #[test]
            fn non_numeric_amounts_are_rejected(amount in "[a-zA-Z$#%]{1,8}") {
                let raw = RawInvoiceFields::new("c1", amount, "paid");
                let errors = InvoiceSchema::shared().validate(&raw).unwrap_err();
                prop_assert_eq!(errors.get(InvoiceField::Amount), [AMOUNT_MSG]);
            }

            /// Property: statuses outside {pending, paid} are rejected with the status message.
            #[test]
            fn unknown_statuses_are_rejected(status in "\\PC{0,12}") {
                prop_assume!(status != "pending" && status != "paid");
                let raw = RawInvoiceFields::new("c1", "10", status);
                let errors = InvoiceSchema::shared().validate(&raw).unwrap_err();
                prop_assert_eq!(errors.get(InvoiceField::Status), [STATUS_MSG]);
                prop_assert_eq!(errors.fields(), vec![InvoiceField::Status]);
            }

            /// Property: stored cents equal round(amount * 100) and read back to the same cent.
            #[test]
            fn cents_round_trip_to_cent_precision(cents in 1i64..100_000_000_000i64) {
                let whole = cents / 100;
                let frac = cents % 100;
                let input = format!("{whole}.{frac:02}");

                let raw = RawInvoiceFields::new("c1", input.clone(), "paid");
                let validated = InvoiceSchema::shared().validate(&raw).unwrap();

                let parsed = Decimal::from_str(&input).unwrap();
                prop_assert_eq!(validated.amount.cents(), cents);
                prop_assert_eq!(validated.amount.to_string(), input);
                prop_assert_eq!(validated.amount.to_decimal(), parsed);
            }
        }
    }
}
