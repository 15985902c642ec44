//! Registry schema: a snapshot of what is registered.
//!
//! The schema lists every routing key with its service/operation split and
//! the shape it was bound with. It is the in-process counterpart of a
//! service discovery document and renders to JSON for diagnostics.
//!
//! # Example
//!
//! ```
//! use irpc::contract::Shape;
//! use irpc::schema::RegistrySchema;
//!
//! let mut schema = RegistrySchema::new();
//! schema.add("Exam.FindExamById", Some(Shape::Unary));
//! schema.add("Exam.FindAllExams", Some(Shape::Supplier));
//!
//! assert_eq!(schema.services(), ["Exam"]);
//! let json = schema.to_json().unwrap();
//! assert!(json.contains("\"FindAllExams\""));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::contract::Shape;
use crate::error::Result;

/// Description of one registered key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerSchema {
    /// Service part of the key (everything before the last `.`), if any.
    pub service: Option<String>,
    /// Operation part of the key.
    pub operation: String,
    /// Shape the handler was bound with; `None` for direct registrations.
    pub shape: Option<Shape>,
}

/// Snapshot of a registry, keyed by routing key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySchema {
    /// Registered keys, sorted.
    pub handlers: BTreeMap<String, HandlerSchema>,
}

impl RegistrySchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key.
    pub fn add(&mut self, key: &str, shape: Option<Shape>) {
        let (service, operation) = match key.rsplit_once('.') {
            Some((service, operation)) => (Some(service.to_string()), operation),
            None => (None, key),
        };
        self.handlers.insert(
            key.to_string(),
            HandlerSchema {
                service,
                operation: operation.to_string(),
                shape,
            },
        );
    }

    /// Get a key's description.
    pub fn get(&self, key: &str) -> Option<&HandlerSchema> {
        self.handlers.get(key)
    }

    /// Distinct service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut services: Vec<&str> = self
            .handlers
            .values()
            .filter_map(|h| h.service.as_deref())
            .collect();
        services.sort_unstable();
        services.dedup();
        services
    }

    /// Operations registered for `service`, sorted by name.
    pub fn operations(&self, service: &str) -> Vec<&HandlerSchema> {
        self.handlers
            .values()
            .filter(|h| h.service.as_deref() == Some(service))
            .collect()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if schema is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
