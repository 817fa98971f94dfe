//! Capabilities: service-scoped Actions and Reactions.
//!
//! A capability is identified by a [`CapabilityKey`] (`service` + `name`).
//! Handlers describe themselves with a [`CapabilityInfo`]; integrations
//! describe the upstream service with a [`ServiceInfo`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lookup key for a capability: `(service, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityKey {
    pub service: String,
    pub name: String,
}

impl CapabilityKey {
    #[must_use]
    pub fn new(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.name)
    }
}

/// Metadata a handler declares about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    /// Capability name, unique within its service (e.g. `"SpecificTime"`).
    pub name: String,
    pub description: String,
    /// Floor on the poll interval, in seconds. Always zero for reactions.
    pub minimum_refresh_rate: u64,
    /// Example options payload shown to users composing a unit.
    pub default_options: serde_json::Value,
}

impl CapabilityInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            minimum_refresh_rate: 0,
            default_options: serde_json::json!({}),
        }
    }

    #[must_use]
    pub fn with_minimum_refresh_rate(mut self, seconds: u64) -> Self {
        self.minimum_refresh_rate = seconds;
        self
    }

    #[must_use]
    pub fn with_default_options(mut self, options: serde_json::Value) -> Self {
        self.default_options = options;
        self
    }
}

/// Description of an integrated upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name used in [`CapabilityKey::service`] (e.g. `"timer"`).
    pub name: String,
    pub description: String,
    /// Whether handlers need a per-user access token for this service.
    pub requires_credential: bool,
}

impl ServiceInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requires_credential: false,
        }
    }

    #[must_use]
    pub fn with_credential(mut self) -> Self {
        self.requires_credential = true;
        self
    }
}
