//! Local input validation for sign-up.
//!
//! Catches obviously bad input before it reaches the server. The server
//! remains authoritative and may still reject the request.

use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::FieldErrors;
use crate::{ClientError, Result};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: u64 = 8;

/// Validate that a string is not empty after trimming whitespace.
pub fn not_empty_trimmed(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_empty_trimmed").with_message("Must not be empty".into()));
    }
    Ok(())
}

/// Validate that a password mixes at least one letter and one digit.
pub fn has_letter_and_digit(value: &str) -> std::result::Result<(), ValidationError> {
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(ValidationError::new("letter_and_digit")
            .with_message("Password must contain a letter and a digit".into()));
    }
    Ok(())
}

/// Run `validator` checks and convert failures into `ClientError::Validation`.
pub fn validate<T: Validate>(value: &T) -> Result<()> {
    value
        .validate()
        .map_err(|errors| ClientError::Validation(field_errors(&errors)))
}

/// Flatten `validator` errors into per-field messages keyed by the API's
/// camelCase field names.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut details = FieldErrors::new();

    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
            .collect();
        details.insert(camel_case(field), messages);
    }

    details
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
