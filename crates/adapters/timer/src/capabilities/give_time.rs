use std::sync::Arc;

use async_trait::async_trait;
use serde::de::IgnoredAny;

use relay_app::ports::{HandlerContext, JsonReaction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

use crate::clock::Clock;

/// Answers with `current time is HH:MM:SS`.
pub struct GiveTime {
    clock: Arc<dyn Clock>,
}

impl GiveTime {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl JsonReaction for GiveTime {
    type Options = IgnoredAny;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("GiveTime", "Reports the current time")
    }

    async fn execute(
        &self,
        _ctx: &HandlerContext,
        _options: IgnoredAny,
        _fact: &str,
    ) -> Result<String, HandlerError> {
        Ok(format!(
            "current time is {}",
            self.clock.now().format("%H:%M:%S")
        ))
    }
}
