//! Error types for irpc.
//!
//! Two classes of failure exist:
//!
//! - [`RegistryError`] - wiring mistakes found while registering or validating
//!   contracts. These are programming errors and are expected at start-up.
//! - [`CallError`] - failures of a single [`Registry::call`](crate::Registry::call),
//!   meant to be handled by the caller.

use std::error::Error as StdError;

use thiserror::Error;

use crate::contract::Shape;

/// Boxed error returned by handlers.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors raised while registering or validating contracts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The implementation has no method for a contract operation.
    #[error("missing method: {service}.{operation}")]
    MissingMethod {
        /// Service name passed to `register_contract`.
        service: String,
        /// Operation declared by the contract.
        operation: String,
    },

    /// The routing key is already taken and overriding is disabled.
    #[error("duplicate method key '{0}'")]
    DuplicateKey(String),

    /// No handler is registered for a contract operation.
    #[error("missing registered handler for {0}")]
    MissingHandler(String),

    /// The implementation method does not have the shape the contract declares.
    #[error("signature mismatch for {key}: contract declares {expected}, implementation provides {found}")]
    SignatureMismatch {
        /// Routing key being bound.
        key: String,
        /// Shape declared by the contract.
        expected: Shape,
        /// Shape of the implementation method.
        found: Shape,
    },

    /// Malformed declarative contract, configuration or schema document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Routing key this error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::DuplicateKey(key) | Self::MissingHandler(key) => Some(key.as_str()),
            Self::SignatureMismatch { key, .. } => Some(key.as_str()),
            Self::MissingMethod { .. } | Self::Json(_) => None,
        }
    }
}

/// Errors returned from a dispatched call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CallError {
    /// Nothing is registered under the routing key.
    #[error("handler not found: {0}")]
    HandlerNotFound(String),

    /// The handler itself failed. The inner error is the handler's, untouched.
    #[error(transparent)]
    Handler(BoxError),

    /// The response did not have the type the caller asked for.
    #[error("unexpected response: {0}")]
    Response(#[source] PayloadMismatch),
}

impl CallError {
    /// Whether the routing key was unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HandlerNotFound(_))
    }

    /// Borrow the handler's error, if the handler failed.
    pub fn handler_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Handler(err) => Some(&**err),
            _ => None,
        }
    }

    /// Take the handler's error, if the handler failed.
    pub fn into_handler_error(self) -> Option<BoxError> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }

    /// Downcast the handler's error to a concrete type.
    pub fn downcast_handler_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.handler_error().and_then(|err| err.downcast_ref::<E>())
    }
}

/// A payload held a different type than the one requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct PayloadMismatch {
    /// Type name the caller asked for.
    pub expected: &'static str,
    /// Type name actually stored in the payload.
    pub found: &'static str,
}

/// Cancellation state reported by a [`Context`](crate::Context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context, or one of its parents, was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline has passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Result type alias using RegistryError.
pub type Result<T> = std::result::Result<T, RegistryError>;
