//! Bridge error taxonomy

use crate::variant::VariantType;
use thiserror::Error;

/// Result alias used throughout the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while marshalling values or dispatching calls across the
/// native/script boundary.
///
/// Every variant is surfaced to scripts as a catchable error; none of them
/// abort the native side.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Wrong number of arguments: {given} (expected: {expected}, at least: {min})")]
    Arity {
        given: usize,
        expected: usize,
        min: usize,
    },

    #[error("Failed to convert argument {index}({value}) to native")]
    ArgumentConversion { index: usize, value: String },

    #[error("Cannot convert {value} to {target}")]
    Conversion { value: String, target: VariantType },

    #[error("Don't pass const scriptable objects to scripts")]
    ConstScriptable,

    #[error("Native object has been deleted")]
    ObjectDeleted,

    #[error("Property '{0}' is not found")]
    NotFound(String),

    #[error("Property '{0}' is read-only")]
    ReadOnly(String),

    #[error("Failed to set property '{0}'")]
    SetFailed(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("{0}")]
    Native(String),
}

impl BridgeError {
    /// Shorthand for a conversion failure of a rendered value.
    pub fn conversion(value: impl Into<String>, target: VariantType) -> Self {
        BridgeError::Conversion {
            value: value.into(),
            target,
        }
    }

    /// Whether this error was raised by the argument count check.
    pub fn is_arity(&self) -> bool {
        matches!(self, BridgeError::Arity { .. })
    }
}
