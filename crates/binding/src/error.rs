use crate::value::ValueType;
use thiserror::Error;

/// Failures raised while resolving a value slot against a parameter source.
///
/// `slot` names the binding being resolved: `parameter 'name'` for deferred
/// slots and `literal value` for immediate ones.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("Parameter '{name}' is not present in the binding map")]
    MissingParameter { name: String },

    #[error("{slot} resolved to null")]
    NullValue { slot: String },

    #[error("{slot} expects a {expected} value but got {actual}")]
    WrongType {
        slot: String,
        expected: ValueType,
        actual: String,
    },

    #[error("{slot} expects a single value but resolved to {count} values")]
    MultipleValues { slot: String, count: usize },

    #[error("{slot} resolved to an empty collection")]
    EmptyCollection { slot: String },

    #[error("Conversion of {slot} failed: {message}")]
    Conversion { slot: String, message: String },
}

impl BindingError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn wrong_type(
        slot: impl Into<String>,
        expected: ValueType,
        actual: impl Into<String>,
    ) -> Self {
        Self::WrongType {
            slot: slot.into(),
            expected,
            actual: actual.into(),
        }
    }

    pub fn conversion(slot: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            slot: slot.into(),
            message: message.into(),
        }
    }
}
