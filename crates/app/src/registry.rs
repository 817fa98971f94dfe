//! Capability registry: resolves `(service, name)` to a handler.
//!
//! Built once at startup from explicit registrations, then shared behind an
//! `Arc` and read concurrently without locks. Discovery queries never mutate
//! the registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use relay_domain::capability::{CapabilityInfo, CapabilityKey, ServiceInfo};
use relay_domain::error::ConfigurationError;

use crate::ports::{ActionHandler, Integration, ReactionHandler};

/// Immutable lookup table of every registered Action and Reaction.
pub struct CapabilityRegistry {
    services: BTreeMap<String, ServiceInfo>,
    actions: HashMap<CapabilityKey, Arc<dyn ActionHandler>>,
    reactions: HashMap<CapabilityKey, Arc<dyn ReactionHandler>>,
}

impl CapabilityRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up the Action handler registered under `service`/`name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownAction`] if nothing is registered.
    pub fn resolve_action(
        &self,
        service: &str,
        name: &str,
    ) -> Result<Arc<dyn ActionHandler>, ConfigurationError> {
        let key = CapabilityKey::new(service, name);
        self.actions
            .get(&key)
            .cloned()
            .ok_or(ConfigurationError::UnknownAction(key))
    }

    /// Look up the Reaction handler registered under `service`/`name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownReaction`] if nothing is registered.
    pub fn resolve_reaction(
        &self,
        service: &str,
        name: &str,
    ) -> Result<Arc<dyn ReactionHandler>, ConfigurationError> {
        let key = CapabilityKey::new(service, name);
        self.reactions
            .get(&key)
            .cloned()
            .ok_or(ConfigurationError::UnknownReaction(key))
    }

    /// Every registered service, ordered by name.
    #[must_use]
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.services.values().cloned().collect()
    }

    /// Actions of `service`, ordered by name. Empty for unknown services.
    #[must_use]
    pub fn actions(&self, service: &str) -> Vec<CapabilityInfo> {
        let mut infos: Vec<_> = self
            .actions
            .iter()
            .filter(|(key, _)| key.service == service)
            .map(|(_, handler)| handler.info().clone())
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Reactions of `service`, ordered by name. Empty for unknown services.
    #[must_use]
    pub fn reactions(&self, service: &str) -> Vec<CapabilityInfo> {
        let mut infos: Vec<_> = self
            .reactions
            .iter()
            .filter(|(key, _)| key.service == service)
            .map(|(_, handler)| handler.info().clone())
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.len())
            .field("reactions", &self.reactions.len())
            .finish()
    }
}

/// Collects registrations; [`build`](Self::build) checks for duplicates.
#[derive(Default)]
pub struct RegistryBuilder {
    services: BTreeMap<String, ServiceInfo>,
    actions: Vec<(CapabilityKey, Arc<dyn ActionHandler>)>,
    reactions: Vec<(CapabilityKey, Arc<dyn ReactionHandler>)>,
}

impl RegistryBuilder {
    /// Register a service and all of its capabilities.
    #[must_use]
    pub fn integration(mut self, integration: &impl Integration) -> Self {
        let service = integration.service();
        for handler in integration.actions() {
            self = self.action(&service.name, handler);
        }
        for handler in integration.reactions() {
            self = self.reaction(&service.name, handler);
        }
        self.services.insert(service.name.clone(), service);
        self
    }

    /// Register a single Action handler under `service`.
    #[must_use]
    pub fn action(mut self, service: &str, handler: Arc<dyn ActionHandler>) -> Self {
        self.ensure_service(service);
        let key = CapabilityKey::new(service, &handler.info().name);
        self.actions.push((key, handler));
        self
    }

    /// Register a single Reaction handler under `service`.
    #[must_use]
    pub fn reaction(mut self, service: &str, handler: Arc<dyn ReactionHandler>) -> Self {
        self.ensure_service(service);
        let key = CapabilityKey::new(service, &handler.info().name);
        self.reactions.push((key, handler));
        self
    }

    fn ensure_service(&mut self, service: &str) {
        self.services
            .entry(service.to_string())
            .or_insert_with(|| ServiceInfo::new(service, ""));
    }

    /// Freeze the registrations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateCapability`] if two actions, or
    /// two reactions, share the same `(service, name)`.
    pub fn build(self) -> Result<CapabilityRegistry, ConfigurationError> {
        let mut actions = HashMap::with_capacity(self.actions.len());
        for (key, handler) in self.actions {
            if actions.contains_key(&key) {
                return Err(ConfigurationError::DuplicateCapability(key));
            }
            actions.insert(key, handler);
        }
        let mut reactions = HashMap::with_capacity(self.reactions.len());
        for (key, handler) in self.reactions {
            if reactions.contains_key(&key) {
                return Err(ConfigurationError::DuplicateCapability(key));
            }
            reactions.insert(key, handler);
        }
        tracing::debug!(
            services = self.services.len(),
            actions = actions.len(),
            reactions = reactions.len(),
            "capability registry built"
        );
        Ok(CapabilityRegistry {
            services: self.services,
            actions,
            reactions,
        })
    }
}
