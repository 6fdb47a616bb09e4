//! Error types for registry operations.
//!
//! Every failure reported by the provider reaches the caller as one of these
//! variants. Nothing is retried and nothing is rolled back.

use crate::provider::{Operation, ReturnCode};
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while working with registry keys and values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The existence probe for a key failed.
    #[error("Key not found: {path}")]
    KeyNotFound {
        /// Display form of the key, including its hive.
        path: String,
    },

    /// The value is not present in the key.
    #[error("Value '{name}' not found in {path}")]
    ValueNotFound {
        /// Name of the missing value.
        name: String,
        /// Display form of the key that was searched.
        path: String,
    },

    /// The provider returned a non-zero result code.
    #[error("{operation} failed for {target} (return code {code})")]
    OperationFailed {
        /// Provider operation that failed.
        operation: Operation,
        /// Key or value the operation was applied to.
        target: String,
        /// Raw provider result code.
        code: ReturnCode,
    },

    /// A type tag outside the supported set, or a value whose shape does not
    /// match its declared type.
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// A textual key path could not be parsed.
    #[error("Invalid key path: {0}")]
    InvalidPath(String),

    /// Iterator access past the captured snapshot.
    #[error("Iterator position {index} out of bounds (snapshot length: {len})")]
    OutOfBounds {
        /// Cursor position that was accessed.
        index: usize,
        /// Number of entries in the snapshot.
        len: usize,
    },
}

impl RegistryError {
    /// Creates a key not found error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use wmi_registry::error::RegistryError;
    /// let err = RegistryError::key_not_found(r"HKEY_LOCAL_MACHINE\Software\Missing");
    /// assert!(err.is_not_found());
    /// ```
    pub fn key_not_found(path: impl ToString) -> Self {
        Self::KeyNotFound {
            path: path.to_string(),
        }
    }

    /// Creates a value not found error.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the value that wasn't found
    /// * `path` - Key that was searched
    pub fn value_not_found(name: &str, path: impl ToString) -> Self {
        Self::ValueNotFound {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    /// Creates an operation failure error with the provider's result code.
    pub fn operation_failed(operation: Operation, target: impl ToString, code: ReturnCode) -> Self {
        Self::OperationFailed {
            operation,
            target: target.to_string(),
            code,
        }
    }

    /// Creates an invalid type error.
    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidType(message.into())
    }

    /// Returns true for both key and value not found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. } | Self::ValueNotFound { .. })
    }

    /// Returns the provider result code, if this error carries one.
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            Self::OperationFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_failed_message() {
        let err = RegistryError::operation_failed(
            Operation::DeleteKey,
            r"HKEY_CURRENT_USER\Software",
            ReturnCode(5),
        );
        assert_eq!(
            err.to_string(),
            r"DeleteKey failed for HKEY_CURRENT_USER\Software (return code 5)"
        );
        assert_eq!(err.return_code(), Some(ReturnCode(5)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(RegistryError::key_not_found("HKEY_USERS\\x").is_not_found());
        assert!(RegistryError::value_not_found("v", "HKEY_USERS\\x").is_not_found());
        assert!(!RegistryError::invalid_type("nope").is_not_found());
    }
}
