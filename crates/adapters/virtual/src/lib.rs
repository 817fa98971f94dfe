//! # relay-adapter-virtual
//!
//! Virtual integration that needs no network access, for testing and
//! demonstration purposes.
//!
//! ## Provided capabilities
//!
//! | Kind | Name | Behaviour |
//! |------|------|-----------|
//! | Action | `Counter` | Counts cycles; fires `counter=<n>` once `threshold` is reached |
//! | Reaction | `Log` | Logs the fact and keeps it in an in-memory [`LogBook`] |
//!
//! ## Dependency rule
//!
//! Depends on `relay-app` (port traits) and `relay-domain` only.

mod capabilities;

use std::sync::Arc;

use relay_app::ports::capability::{action, reaction};
use relay_app::ports::{ActionHandler, Integration, ReactionHandler};
use relay_domain::capability::ServiceInfo;

pub use capabilities::{Counter, Log, LogBook};

/// Service name every virtual capability is registered under.
pub const SERVICE: &str = "virtual";

/// Virtual integration bundling [`Counter`] and [`Log`].
#[derive(Debug, Default, Clone)]
pub struct VirtualIntegration {
    book: LogBook,
}

impl VirtualIntegration {
    /// Facts received by the `Log` reaction so far.
    #[must_use]
    pub fn book(&self) -> &LogBook {
        &self.book
    }
}

impl Integration for VirtualIntegration {
    fn service(&self) -> ServiceInfo {
        ServiceInfo::new(SERVICE, "In-process capabilities for testing")
    }

    fn actions(&self) -> Vec<Arc<dyn ActionHandler>> {
        vec![action(Counter)]
    }

    fn reactions(&self) -> Vec<Arc<dyn ReactionHandler>> {
        vec![reaction(Log::new(self.book.clone()))]
    }
}
