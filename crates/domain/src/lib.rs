//! # relay-domain
//!
//! Pure domain model for the relay automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Automation Units** (one Action paired with one Reaction)
//! - Define **Capabilities** (service-scoped Actions and Reactions) and the
//!   metadata handlers declare about themselves
//! - Define the **schedule** policy (effective poll interval)
//! - Define the **state codec** used for the opaque per-unit state blob
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod capability;
pub mod schedule;
pub mod state;
pub mod unit;
