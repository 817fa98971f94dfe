//! Integration port: one external service and the capabilities it provides.
//!
//! An integration bridges an external API (a weather provider, a music
//! player, a local clock, …) into the engine. It contributes a
//! [`ServiceInfo`] plus the Action and Reaction handlers registered under
//! that service name.

use std::sync::Arc;

use relay_domain::capability::ServiceInfo;

use crate::ports::capability::{ActionHandler, ReactionHandler};

/// A bundle of capabilities registered under one service name.
///
/// Consumed once by [`RegistryBuilder::integration`](crate::registry::RegistryBuilder::integration)
/// at startup; the registry keeps the handlers, not the integration.
pub trait Integration {
    /// Service descriptor; its `name` scopes every capability below.
    fn service(&self) -> ServiceInfo;

    /// Action handlers this service provides.
    fn actions(&self) -> Vec<Arc<dyn ActionHandler>>;

    /// Reaction handlers this service provides.
    fn reactions(&self) -> Vec<Arc<dyn ReactionHandler>>;
}
