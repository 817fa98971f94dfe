//! Spotify Web API client for the player endpoints.
//!
//! Every call carries the bearer token of the unit's owner; the client
//! itself holds no credentials.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use relay_domain::error::HandlerError;

pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com";

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client")]
pub struct ClientBuildError(#[source] reqwest::Error);

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Track {
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct PlaybackResponse {
    is_playing: bool,
    item: Option<Track>,
}

/// The track currently playing for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub track: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum Skip {
    Next,
    Previous,
}

impl Skip {
    fn path(self) -> &'static str {
        match self {
            Self::Next => "/v1/me/player/next",
            Self::Previous => "/v1/me/player/previous",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
}

impl SpotifyClient {
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new(config: SpotifyConfig) -> Result<Self, ClientBuildError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientBuildError)?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// What the user is playing right now, if anything.
    ///
    /// A paused player and an idle account (`204 No Content`) both yield
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedStatus`] on any other non-success
    /// status, or [`HandlerError::Upstream`] if the request fails.
    pub async fn now_playing(&self, token: &str) -> Result<Option<NowPlaying>, HandlerError> {
        let response = self
            .http
            .get(format!("{}/v1/me/player", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(HandlerError::upstream)?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::OK => {
                let playback: PlaybackResponse =
                    response.json().await.map_err(HandlerError::upstream)?;
                Ok(playback
                    .item
                    .filter(|_| playback.is_playing)
                    .map(|track| NowPlaying {
                        track: track.name,
                        artists: track.artists.into_iter().map(|a| a.name).collect(),
                    }))
            }
            status => Err(HandlerError::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }

    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedStatus`] on a non-success status,
    /// or [`HandlerError::Upstream`] if the request fails.
    pub async fn skip(&self, token: &str, direction: Skip) -> Result<(), HandlerError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, direction.path()))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(HandlerError::upstream)?;
        let status = response.status();
        tracing::debug!(?direction, %status, "skip requested");
        if status.is_success() {
            Ok(())
        } else {
            Err(HandlerError::UnexpectedStatus {
                status: status.as_u16(),
            })
        }
    }
}
