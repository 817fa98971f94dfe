//! MusicPlayed: fires when the user starts listening to a given track.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use relay_app::ports::{Evaluation, HandlerContext, JsonAction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

use crate::SERVICE;
use crate::client::SpotifyClient;

#[derive(Debug, Deserialize)]
pub struct MusicPlayedOptions {
    /// Track title, compared case-insensitively.
    pub name: String,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayingState {
    pub playing: bool,
}

/// Fires once with `currently playing: <track> by <artists>` when the track
/// starts, and re-arms when anything else (or nothing) is playing.
pub struct MusicPlayed {
    client: Arc<SpotifyClient>,
}

impl MusicPlayed {
    #[must_use]
    pub fn new(client: Arc<SpotifyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonAction for MusicPlayed {
    type Options = MusicPlayedOptions;
    type State = PlayingState;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("MusicPlayed", "Fires when a given track is played")
            .with_minimum_refresh_rate(10)
            .with_default_options(serde_json::json!({"name": "Believer"}))
    }

    fn default_state(&self) -> PlayingState {
        PlayingState::default()
    }

    async fn evaluate(
        &self,
        ctx: &HandlerContext,
        options: MusicPlayedOptions,
        state: PlayingState,
    ) -> Result<Evaluation<PlayingState>, HandlerError> {
        let token = ctx.access_token(SERVICE).await?;
        let playing = self
            .client
            .now_playing(&token.token)
            .await?
            .filter(|now| now.track.eq_ignore_ascii_case(&options.name));

        match playing {
            Some(now) if !state.playing => Ok(Evaluation::fired(
                format!(
                    "currently playing: {} by {}",
                    now.track,
                    now.artists.join(", ")
                ),
                PlayingState { playing: true },
            )),
            Some(_) => Ok(Evaluation::idle(state)),
            None => Ok(Evaluation::idle(PlayingState::default())),
        }
    }
}
