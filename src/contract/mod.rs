//! Contract module - declarative descriptions of service operations.
//!
//! A contract lists the operations a service must provide, in order, with
//! the [`Shape`] of each one. Contracts are built once (in code or from a
//! JSON table) and consulted only while registering or validating.
//!
//! # Example
//!
//! ```
//! use irpc::contract::{ContractDescriptor, Shape};
//!
//! let exam = ContractDescriptor::new("ExamContract")
//!     .unary("FindExamById")
//!     .supplier("FindAllExams");
//!
//! assert_eq!(exam.len(), 2);
//! assert_eq!(exam.operation_named("FindAllExams").unwrap().shape, Shape::Supplier);
//! assert_eq!(exam.keys("Exam"), vec!["Exam.FindExamById", "Exam.FindAllExams"]);
//! ```

mod descriptor;

pub use descriptor::{routing_key, ContractDescriptor, Operation, Shape};
