//! # irpc
//!
//! In-process RPC: modules call each other's operations by a symbolic
//! routing key (`Service.Operation`) without holding a reference to the
//! callee's concrete type. Calls are synchronous and never serialized.
//!
//! ## Architecture
//!
//! - **Contracts** ([`ContractDescriptor`]): ordered lists of named
//!   operations and their shapes
//! - **Implementations** ([`Implementation`]): a service value plus an explicit
//!   method table
//! - **Registry** ([`Registry`]): binds contracts to implementations under a
//!   [`RegistryConfig`] policy and dispatches calls
//!
//! ## Example
//!
//! ```
//! use irpc::{BoxError, Context, ContractDescriptor, Implementation, Registry, RegistryConfig};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Exam {
//!     id: String,
//!     name: String,
//! }
//!
//! struct ExamService;
//!
//! impl ExamService {
//!     fn find_exam_by_id(&self, _ctx: &Context, id: String) -> Result<Exam, BoxError> {
//!         Ok(Exam { id, name: "Mock Exam".into() })
//!     }
//! }
//!
//! let contract = ContractDescriptor::new("ExamContract").unary("FindExamById");
//! let exams = Implementation::new(ExamService).unary("FindExamById", ExamService::find_exam_by_id);
//!
//! let registry = Registry::new(RegistryConfig::DEFAULT);
//! registry.register_contract("Exam", &contract, &exams).unwrap();
//!
//! let exam: Exam = registry
//!     .invoke(&Context::background(), "Exam.FindExamById", "EX-123".to_string())
//!     .unwrap();
//! assert_eq!(exam.name, "Mock Exam");
//! ```

pub mod binder;
pub mod config;
pub mod contract;
pub mod error;
pub mod handler;
pub mod schema;

pub use binder::{Implementation, Method};
pub use config::RegistryConfig;
pub use contract::{routing_key, ContractDescriptor, Operation, Shape};
pub use error::{BoxError, CallError, ContextError, PayloadMismatch, RegistryError};
pub use handler::{CancelHandle, Context, Handler, HandlerResult, Payload, Registry};
pub use schema::RegistrySchema;
