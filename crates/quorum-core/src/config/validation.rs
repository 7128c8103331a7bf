//! Configuration validation utilities

use crate::QuorumError;
use std::fmt;

/// Configuration validation result
pub type ValidationResult = Result<(), ValidationError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value is out of acceptable range
    OutOfRange {
        /// Dotted field path
        field: String,
        /// Inclusive lower bound
        min: Option<u64>,
        /// Inclusive upper bound
        max: Option<u64>,
        /// Rejected value
        actual: u64,
    },
    /// Custom validation failed
    Custom {
        /// Dotted field path
        field: String,
        /// Description of the problem
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::Custom { field, message } => {
                write!(f, "Field '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for QuorumError {
    fn from(err: ValidationError) -> Self {
        QuorumError::config(err.to_string())
    }
}

/// Configuration validator that accumulates validation failures
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator for a nested section
    pub fn for_field(&self, field_name: &str) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: self.full_field_name(field_name),
        }
    }

    /// Validate that a number lies in `[min, max]`
    pub fn range(
        &mut self,
        field_name: &str,
        value: u64,
        min: Option<u64>,
        max: Option<u64>,
    ) -> &mut Self {
        let below = min.is_some_and(|min| value < min);
        let above = max.is_some_and(|max| value > max);
        if below || above {
            self.errors.push(ValidationError::OutOfRange {
                field: self.full_field_name(field_name),
                min,
                max,
                actual: value,
            });
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom<T, F>(
        &mut self,
        field_name: &str,
        value: &T,
        predicate: F,
        message: &str,
    ) -> &mut Self
    where
        F: FnOnce(&T) -> bool,
    {
        if !predicate(value) {
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message: message.to_string(),
            });
        }
        self
    }

    /// Merge errors from a nested validator
    pub fn merge(&mut self, other: ConfigValidator) {
        self.errors.extend(other.errors);
    }

    /// First error, if any
    pub fn result(self) -> ValidationResult {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// All accumulated errors
    pub fn all_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn full_field_name(&self, field_name: &str) -> String {
        if self.field_prefix.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, field_name)
        }
    }
}
