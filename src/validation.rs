//! Field-level validation helpers shared by request bodies.
//!
//! Request types derive `validator::Validate`; failures are flattened into a
//! [`FieldErrors`] map (`field -> [messages]`) which is what clients receive.

use std::borrow::Cow;
use std::collections::BTreeMap;

use validator::{ValidationError, ValidationErrors};

use crate::domain::value_objects::Money;

/// `field -> messages`, ordered by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

/// Flattens validator output, substituting readable messages for codes that
/// were raised without one.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs.iter().map(message_for).collect()))
        .collect()
}

fn message_for(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "required" => REQUIRED.to_string(),
        "email" => "Enter a valid email address.".to_string(),
        "length" => length_message(error),
        "range" => "Ensure this value is greater than or equal to 0.".to_string(),
        other => format!("Invalid value ({other})."),
    }
}

fn length_message(error: &ValidationError) -> String {
    let bound = |key: &str| error.params.get(key).and_then(serde_json::Value::as_u64);
    let len = error
        .params
        .get("value")
        .and_then(serde_json::Value::as_str)
        .map_or(0, |v| v.chars().count() as u64);
    match (bound("min"), bound("max")) {
        (Some(1), _) if len == 0 => BLANK.to_string(),
        (Some(min), _) if len < min => format!("Ensure this field has at least {min} characters."),
        (_, Some(max)) => format!("Ensure this field has no more than {max} characters."),
        _ => "Invalid length.".to_string(),
    }
}

/// Adds one message to `field`.
pub fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

/// Custom validator for amounts stored as `NUMERIC(20, 2)`.
pub fn money(value: &Money) -> Result<(), ValidationError> {
    value.check().map_err(|e| {
        let mut error = ValidationError::new("money");
        error.message = Some(Cow::Owned(e.to_string()));
        error
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, max = 5))]
        name: String,
        #[validate(required)]
        product: Option<u32>,
        #[validate(custom = "money")]
        price: Option<Money>,
    }

    #[test]
    fn test_messages_are_readable() {
        let sample = Sample { name: String::new(), product: None, price: Some(Money::from_cents(-5)) };
        let errors = field_errors(&sample.validate().unwrap_err());
        assert_eq!(errors["name"], vec![BLANK.to_string()]);
        assert_eq!(errors["product"], vec![REQUIRED.to_string()]);
        assert_eq!(errors["price"], vec!["Ensure this value is greater than or equal to 0.".to_string()]);
    }

    #[test]
    fn test_valid_sample_passes() {
        let sample = Sample { name: "ok".into(), product: Some(1), price: None };
        assert!(sample.validate().is_ok());
    }
}
