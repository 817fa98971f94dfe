//! # relay-adapter-spotify
//!
//! Spotify integration acting on behalf of each unit's owner.
//!
//! ## Provided capabilities
//!
//! | Kind | Name | Behaviour |
//! |------|------|-----------|
//! | Action | `MusicPlayed` | Fires once when the track `name` starts playing |
//! | Reaction | `SkipNextMusic` | Skips to the next track |
//! | Reaction | `SkipPreviousMusic` | Skips to the previous track |
//!
//! Tokens come from the engine's `CredentialStore`; obtaining and
//! refreshing them is left to the OAuth flow that fills the store.

mod capabilities;
mod client;

use std::sync::Arc;

use relay_app::ports::capability::{action, reaction};
use relay_app::ports::{ActionHandler, Integration, ReactionHandler};
use relay_domain::capability::ServiceInfo;

pub use capabilities::{
    MusicPlayed, MusicPlayedOptions, PlayingState, SkipNextMusic, SkipPreviousMusic,
};
pub use client::{ClientBuildError, DEFAULT_BASE_URL, NowPlaying, Skip, SpotifyClient, SpotifyConfig};

/// Service name every Spotify capability is registered under, and the key
/// tokens are stored under.
pub const SERVICE: &str = "spotify";

#[derive(Debug, Clone)]
pub struct SpotifyIntegration {
    client: Arc<SpotifyClient>,
}

impl SpotifyIntegration {
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new(config: SpotifyConfig) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: Arc::new(SpotifyClient::new(config)?),
        })
    }
}

impl Integration for SpotifyIntegration {
    fn service(&self) -> ServiceInfo {
        ServiceInfo::new(SERVICE, "Music playback on Spotify").with_credential()
    }

    fn actions(&self) -> Vec<Arc<dyn ActionHandler>> {
        vec![action(MusicPlayed::new(Arc::clone(&self.client)))]
    }

    fn reactions(&self) -> Vec<Arc<dyn ReactionHandler>> {
        vec![
            reaction(SkipNextMusic::new(Arc::clone(&self.client))),
            reaction(SkipPreviousMusic::new(Arc::clone(&self.client))),
        ]
    }
}
