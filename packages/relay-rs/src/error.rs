//! Error types and failure categorisation.
//!
//! # The Error Boundary Rule
//!
//! > **No raw error ever reaches the consumption loop.**
//!
//! - Collaborators (cache, network) return their own typed errors
//! - [`CallFailure`](crate::CallFailure) is the sanitised form a job sees
//! - A [`DataState`](crate::DataState) with an error message is the only thing
//!   the loop ever receives
//!
//! Domain errors opt into user-visible messages by implementing
//! [`Categorizable`]. Everything else is reported with a generic message.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Category of a classified failure.
///
/// Only `Validation`, `NotFound` and `Constraint` may carry specific details in
/// their safe message. The others must use generic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller supplied something unusable.
    Validation,
    /// The targeted record does not exist.
    NotFound,
    /// A storage constraint rejected the write (duplicate key, foreign key...).
    Constraint,
    /// Remote side refused or is unreachable.
    ExternalService,
    /// Anything internal. Never expose details.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation_error"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Constraint => write!(f, "constraint_violation"),
            ErrorCategory::ExternalService => write!(f, "external_service_error"),
            ErrorCategory::Internal => write!(f, "internal_error"),
        }
    }
}

/// Errors that can be categorised for display to the user.
///
/// # Example
///
/// ```ignore
/// impl Categorizable for CacheError {
///     fn category(&self) -> ErrorCategory {
///         match self {
///             CacheError::DuplicateKey(_) => ErrorCategory::Constraint,
///             _ => ErrorCategory::Internal,
///         }
///     }
///
///     fn safe_message(&self) -> Cow<'static, str> {
///         match self {
///             CacheError::DuplicateKey(id) => format!("Duplicate note id: {}", id).into(),
///             _ => "Unknown cache error".into(),
///         }
///     }
/// }
/// ```
pub trait Categorizable: std::error::Error + Send + Sync + 'static {
    /// Return the category for this error.
    fn category(&self) -> ErrorCategory;

    /// Return a sanitised, user-safe message.
    fn safe_message(&self) -> Cow<'static, str>;
}

/// Errors raised by the relay API itself.
#[derive(Debug, Error)]
pub enum RelayError {
    /// `setup` was called outside a tokio runtime.
    #[error("no tokio runtime available to host the consumption loop")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCategory::Constraint.to_string(), "constraint_violation");
        assert_eq!(ErrorCategory::Internal.to_string(), "internal_error");
    }

    #[test]
    fn test_relay_error_display() {
        assert!(RelayError::NoRuntime.to_string().contains("tokio runtime"));
    }
}
