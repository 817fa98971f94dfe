//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod capability;
pub mod credentials;
pub mod integration;
pub mod unit_repo;

pub use capability::{
    ActionHandler, ActionOutcome, Evaluation, HandlerContext, JsonAction, JsonReaction,
    ReactionHandler,
};
pub use credentials::{AccessToken, CredentialStore, NoCredentials};
pub use integration::Integration;
pub use unit_repo::UnitRepository;
