//! Contract descriptors and operation shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Build the routing key for an operation of a service.
#[inline]
pub fn routing_key(service: &str, operation: &str) -> String {
    let mut key = String::with_capacity(service.len() + operation.len() + 1);
    key.push_str(service);
    key.push('.');
    key.push_str(operation);
    key
}

/// Call shape of an operation: whether it takes a request and whether it
/// produces a response. Every shape can fail with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// `(ctx, request) -> Result<response>`
    Unary,
    /// `(ctx) -> Result<response>`
    Supplier,
    /// `(ctx, request) -> Result<()>`
    Consumer,
    /// `(ctx) -> Result<()>`
    Action,
}

impl Shape {
    /// Build a shape from its two flags.
    pub const fn from_flags(takes_request: bool, returns_response: bool) -> Self {
        match (takes_request, returns_response) {
            (true, true) => Self::Unary,
            (false, true) => Self::Supplier,
            (true, false) => Self::Consumer,
            (false, false) => Self::Action,
        }
    }

    /// Whether the operation accepts a request value.
    #[inline]
    pub const fn takes_request(self) -> bool {
        matches!(self, Self::Unary | Self::Consumer)
    }

    /// Whether the operation produces a response value.
    #[inline]
    pub const fn returns_response(self) -> bool {
        matches!(self, Self::Unary | Self::Supplier)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::Supplier => "supplier",
            Self::Consumer => "consumer",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single operation declared by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operation {
    /// Operation name. Matched case-sensitively against implementation methods.
    pub name: String,
    /// Call shape.
    pub shape: Shape,
}

/// Ordered set of operations a service must provide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractDescriptor {
    /// Contract name, used in logs only.
    #[serde(default)]
    name: String,
    /// Operations in declared order.
    operations: Vec<Operation>,
}

impl ContractDescriptor {
    /// Create an empty contract.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
        }
    }

    /// Parse a contract from a JSON table.
    ///
    /// ```json
    /// { "name": "ExamContract",
    ///   "operations": [ { "name": "FindExamById", "shape": "unary" } ] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Declare an operation with an explicit shape.
    pub fn operation(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.operations.push(Operation {
            name: name.into(),
            shape,
        });
        self
    }

    /// Declare a request/response operation.
    pub fn unary(self, name: impl Into<String>) -> Self {
        self.operation(name, Shape::Unary)
    }

    /// Declare an operation without a request.
    pub fn supplier(self, name: impl Into<String>) -> Self {
        self.operation(name, Shape::Supplier)
    }

    /// Declare an operation without a response.
    pub fn consumer(self, name: impl Into<String>) -> Self {
        self.operation(name, Shape::Consumer)
    }

    /// Declare an operation with neither request nor response.
    pub fn action(self, name: impl Into<String>) -> Self {
        self.operation(name, Shape::Action)
    }

    /// Contract name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operations in declared order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Look up an operation by name.
    pub fn operation_named(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Number of declared operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the contract declares no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Routing keys of every operation for `service`, in declared order.
    pub fn keys(&self, service: &str) -> Vec<String> {
        self.operations
            .iter()
            .map(|op| routing_key(service, &op.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_key() {
        assert_eq!(routing_key("Exam", "FindExamById"), "Exam.FindExamById");
        assert_eq!(routing_key("", "Ping"), ".Ping");
    }

    #[test]
    fn test_shape_flags() {
        assert!(Shape::Unary.takes_request());
        assert!(Shape::Unary.returns_response());
        assert!(!Shape::Supplier.takes_request());
        assert!(Shape::Supplier.returns_response());
        assert!(Shape::Consumer.takes_request());
        assert!(!Shape::Consumer.returns_response());
        assert!(!Shape::Action.takes_request());
        assert!(!Shape::Action.returns_response());

        for shape in [Shape::Unary, Shape::Supplier, Shape::Consumer, Shape::Action] {
            assert_eq!(
                Shape::from_flags(shape.takes_request(), shape.returns_response()),
                shape
            );
        }
    }

    #[test]
    fn test_builder_preserves_order() {
        let contract = ContractDescriptor::new("Inventory")
            .action("Reset")
            .unary("Lookup")
            .consumer("Restock")
            .supplier("List");

        let names: Vec<_> = contract.operations().iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, ["Reset", "Lookup", "Restock", "List"]);
        assert_eq!(contract.name(), "Inventory");
        assert_eq!(contract.len(), 4);
        assert!(!contract.is_empty());
    }

    #[test]
    fn test_operation_lookup_is_case_sensitive() {
        let contract = ContractDescriptor::new("Exam").unary("FindExamById");

        assert!(contract.operation_named("FindExamById").is_some());
        assert!(contract.operation_named("findExamById").is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "name": "ExamContract",
            "operations": [
                { "name": "FindExamById", "shape": "unary" },
                { "name": "FindAllExams", "shape": "supplier" }
            ]
        }"#;

        let contract = ContractDescriptor::from_json(json).unwrap();
        assert_eq!(
            contract,
            ContractDescriptor::new("ExamContract")
                .unary("FindExamById")
                .supplier("FindAllExams")
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_shape() {
        let json = r#"{ "operations": [ { "name": "Stream", "shape": "bidi" } ] }"#;
        assert!(ContractDescriptor::from_json(json).is_err());
    }

    #[test]
    fn test_empty_contract() {
        let contract = ContractDescriptor::default();
        assert!(contract.is_empty());
        assert!(contract.keys("Svc").is_empty());
    }
}
