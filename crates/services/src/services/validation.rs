use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

pub fn require_percentage(field: &str, value: i32) -> Result<(), ValidationError> {
    if !(0..=100).contains(&value) {
        return Err(ValidationError::new(
            field,
            format!("must be between 0 and 100, got {value}"),
        ));
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(
            field,
            format!("must be a non-negative number, got {value}"),
        ));
    }
    Ok(())
}

pub fn require_in_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {min} and {max}, got {value}"),
        ));
    }
    Ok(())
}

pub fn illegal_transition(field: &str, from: impl Display, to: impl Display) -> ValidationError {
    ValidationError::new(field, format!("cannot move from {from} to {to}"))
}
