//! Registry configuration.
//!
//! # Example
//!
//! ```
//! use irpc::RegistryConfig;
//!
//! let config = RegistryConfig::from_json(r#"{ "allow_partial": true }"#).unwrap();
//! assert!(config.allow_partial);
//! assert!(!config.allow_override);
//!
//! assert_eq!(RegistryConfig::default(), RegistryConfig::DEFAULT);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Registration policy. Fixed for the lifetime of a registry and never
/// consulted on the call path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Let a later registration replace the handler under an existing key.
    pub allow_override: bool,
    /// Skip contract operations the implementation does not provide.
    pub allow_partial: bool,
}

impl RegistryConfig {
    /// Safe mode: the first registration of a key wins and every contract
    /// operation must be implemented.
    pub const DEFAULT: Self = Self {
        allow_override: false,
        allow_partial: false,
    };

    /// Set `allow_override`.
    pub const fn with_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Set `allow_partial`.
    pub const fn with_partial(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }

    /// Parse a configuration document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
