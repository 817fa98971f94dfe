//! # relay-app
//!
//! Application layer: the polling engine, use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `UnitRepository`: persistence for automation units and their state
//!   - `CredentialStore`: per-user access tokens for external services
//!   - `ActionHandler` / `ReactionHandler`: capability implementations
//!   - `Integration`: a service bundling its capabilities
//! - Run the engine:
//!   - `CapabilityRegistry`: immutable `(service, name)` → handler map
//!   - `UnitPoller`: the per-unit Action→Reaction loop
//!   - `PollerSupervisor`: starts, stops and observes pollers
//! - Expose **use-cases** (`UnitService`) that keep storage and running
//!   pollers in step
//!
//! ## Dependency rule
//! Depends on `relay-domain` only (plus `tokio` for tasks and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod poller;
pub mod ports;
pub mod registry;
pub mod services;
pub mod supervisor;

#[cfg(test)]
mod testing;
