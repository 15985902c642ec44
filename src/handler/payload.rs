//! Opaque request/response values.
//!
//! The registry never looks inside a [`Payload`]. Callers and handlers agree
//! on the concrete type out-of-band and recover it with a checked downcast.

use std::any::{type_name, Any};
use std::fmt;

use crate::error::PayloadMismatch;

const EMPTY: &str = "()";

/// Type-erased value passed to and returned from handlers.
#[derive(Default)]
pub struct Payload {
    value: Option<Box<dyn Any + Send>>,
    /// Name of the stored type, for diagnostics.
    type_name: &'static str,
}

impl Payload {
    /// Wrap a value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
            type_name: type_name::<T>(),
        }
    }

    /// A payload carrying nothing.
    pub const fn empty() -> Self {
        Self {
            value: None,
            type_name: EMPTY,
        }
    }

    /// Whether the payload carries nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Name of the stored type (`"()"` when empty).
    #[inline]
    pub fn type_name(&self) -> &'static str {
        if self.value.is_none() {
            EMPTY
        } else {
            self.type_name
        }
    }

    /// Whether the payload holds a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is::<T>())
    }

    /// Borrow the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    /// Take the value out as `T`.
    pub fn downcast<T: Any>(self) -> Result<T, PayloadMismatch> {
        let found = self.type_name();
        let mismatch = PayloadMismatch {
            expected: type_name::<T>(),
            found,
        };
        match self.value {
            Some(value) => value.downcast::<T>().map(|v| *v).map_err(|_| mismatch),
            None => Err(mismatch),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.type_name()).finish()
    }
}
