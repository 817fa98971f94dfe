use std::sync::Arc;

use async_trait::async_trait;
use serde::de::IgnoredAny;

use relay_app::ports::{HandlerContext, JsonReaction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

use crate::SERVICE;
use crate::client::{Skip, SpotifyClient};

async fn skip(
    client: &SpotifyClient,
    ctx: &HandlerContext,
    direction: Skip,
) -> Result<(), HandlerError> {
    let token = ctx.access_token(SERVICE).await?;
    client.skip(&token.token, direction).await
}

/// Skips to the next track in the owner's player.
pub struct SkipNextMusic {
    client: Arc<SpotifyClient>,
}

impl SkipNextMusic {
    #[must_use]
    pub fn new(client: Arc<SpotifyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonReaction for SkipNextMusic {
    type Options = IgnoredAny;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("SkipNextMusic", "Skips to the next track")
    }

    async fn execute(
        &self,
        ctx: &HandlerContext,
        _options: IgnoredAny,
        _fact: &str,
    ) -> Result<String, HandlerError> {
        skip(&self.client, ctx, Skip::Next).await?;
        Ok("skipped to next track".to_string())
    }
}

/// Skips back to the previous track in the owner's player.
pub struct SkipPreviousMusic {
    client: Arc<SpotifyClient>,
}

impl SkipPreviousMusic {
    #[must_use]
    pub fn new(client: Arc<SpotifyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonReaction for SkipPreviousMusic {
    type Options = IgnoredAny;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("SkipPreviousMusic", "Skips to the previous track")
    }

    async fn execute(
        &self,
        ctx: &HandlerContext,
        _options: IgnoredAny,
        _fact: &str,
    ) -> Result<String, HandlerError> {
        skip(&self.client, ctx, Skip::Previous).await?;
        Ok("skipped to previous track".to_string())
    }
}
