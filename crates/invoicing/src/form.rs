//! Raw form input and the state a form re-renders from.

use serde::{Deserialize, Serialize};

/// Field set as submitted, before any coercion.
///
/// Every field is optional so that a missing key is reported as a field
/// error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInvoiceFields {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawInvoiceFields {
    pub fn new(
        customer_id: impl Into<String>,
        amount: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            amount: Some(amount.into()),
            status: Some(status.into()),
        }
    }

    /// Build from urlencoded key/value pairs.
    ///
    /// A repeated key keeps its first value and unknown keys are ignored, so
    /// any well-formed body reaches validation.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut fields = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "customerId" => &mut fields.customer_id,
                "amount" => &mut fields.amount,
                "status" => &mut fields.status,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        fields
    }
}

/// Names of the validated form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceField {
    CustomerId,
    Amount,
    Status,
}

impl InvoiceField {
    /// Wire name, as used in form keys and error maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceField::CustomerId => "customerId",
            InvoiceField::Amount => "amount",
            InvoiceField::Status => "status",
        }
    }
}

/// Per-field error messages, in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,
}

impl FieldErrors {
    pub fn push(&mut self, field: InvoiceField, message: impl Into<String>) {
        self.slot_mut(field)
            .get_or_insert_with(Vec::new)
            .push(message.into());
    }

    pub fn get(&self, field: InvoiceField) -> &[String] {
        let slot = match field {
            InvoiceField::CustomerId => &self.customer_id,
            InvoiceField::Amount => &self.amount,
            InvoiceField::Status => &self.status,
        };
        slot.as_deref().unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.amount.is_none() && self.status.is_none()
    }

    /// Fields that carry at least one message.
    pub fn fields(&self) -> Vec<InvoiceField> {
        [InvoiceField::CustomerId, InvoiceField::Amount, InvoiceField::Status]
            .into_iter()
            .filter(|f| !self.get(*f).is_empty())
            .collect()
    }

    fn slot_mut(&mut self, field: InvoiceField) -> &mut Option<Vec<String>> {
        match field {
            InvoiceField::CustomerId => &mut self.customer_id,
            InvoiceField::Amount => &mut self.amount,
            InvoiceField::Status => &mut self.status,
        }
    }
}

/// What a form renders from: `{ errors?, message? }`.
///
/// The default value is the initial state of an untouched form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(default)]
    pub message: Option<String>,
}

impl FormState {
    pub fn invalid(errors: FieldErrors, summary: impl Into<String>) -> Self {
        Self {
            errors: Some(errors),
            message: Some(summary.into()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            errors: None,
            message: Some(message.into()),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_pairs_keeps_first_value_and_ignores_unknown_keys() {
        let fields = RawInvoiceFields::from_pairs([
            ("customerId", "c1"),
            ("amount", "5"),
            ("amount", "6"),
            ("note", "ignored"),
            ("status", "paid"),
        ]);

        assert_eq!(fields, RawInvoiceFields::new("c1", "5", "paid"));
    }

    #[test]
    fn from_pairs_leaves_missing_keys_empty() {
        let fields = RawInvoiceFields::from_pairs([("status", "pending")]);
        assert_eq!(fields.customer_id, None);
        assert_eq!(fields.amount, None);
        assert_eq!(fields.status.as_deref(), Some("pending"));
    }

    #[test]
    fn push_keeps_insertion_order() {
        let mut errors = FieldErrors::default();
        errors.push(InvoiceField::Amount, "first");
        errors.push(InvoiceField::Amount, "second");

        assert_eq!(errors.get(InvoiceField::Amount), ["first", "second"]);
        assert!(errors.get(InvoiceField::Status).is_empty());
        assert_eq!(errors.fields(), vec![InvoiceField::Amount]);
    }

    #[test]
    fn form_state_serializes_with_form_keys() {
        let mut errors = FieldErrors::default();
        errors.push(InvoiceField::CustomerId, "Please select a customer");
        let state = FormState::invalid(errors, "Missing Fields. Failed to Create Invoice.");

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "errors": { "customerId": ["Please select a customer"] },
                "message": "Missing Fields. Failed to Create Invoice.",
            })
        );
    }

    #[test]
    fn initial_state_has_null_message_and_no_errors() {
        let state = FormState::default();
        assert!(!state.has_errors());
        assert_eq!(serde_json::to_value(&state).unwrap(), json!({ "message": null }));
    }

    #[test]
    fn raw_fields_accept_missing_keys() {
        let raw: RawInvoiceFields = serde_json::from_value(json!({ "amount": "3" })).unwrap();
        assert_eq!(raw.customer_id, None);
        assert_eq!(raw.amount.as_deref(), Some("3"));
        assert_eq!(raw.status, None);
    }
}
