//! Handler module - handler types and dispatch.
//!
//! Provides:
//! - [`Registry`] - maps routing keys to handlers
//! - [`Context`] - cancellation, deadline and ambient values for a call
//! - [`Payload`] - opaque request/response value
//!
//! # Example
//!
//! ```
//! use irpc::{Context, Payload, Registry, RegistryConfig};
//!
//! let registry = Registry::new(RegistryConfig::DEFAULT);
//!
//! registry
//!     .register("Math.Double", |_ctx: &Context, req: Payload| {
//!         let n = req.downcast::<i64>()?;
//!         Ok(Payload::new(n * 2))
//!     })
//!     .unwrap();
//!
//! let res = registry
//!     .call(&Context::background(), "Math.Double", Payload::new(21i64))
//!     .unwrap();
//! assert_eq!(res.downcast::<i64>().unwrap(), 42);
//! ```

use std::sync::Arc;

mod context;
mod payload;
mod registry;

pub use crate::error::BoxError;
pub use context::{CancelHandle, Context};
pub use payload::Payload;
pub use registry::Registry;

/// Result type for handler functions.
pub type HandlerResult = Result<Payload, BoxError>;

/// A bound, type-erased operation.
pub type Handler = Arc<dyn Fn(&Context, Payload) -> HandlerResult + Send + Sync>;
