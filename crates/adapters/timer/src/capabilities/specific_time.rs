//! `SpecificTime`: fires once per day at a given local time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Timelike, Utc};
use serde::{Deserialize, Serialize};

use relay_app::ports::{Evaluation, HandlerContext, JsonAction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;
use relay_domain::time::Timestamp;

use crate::clock::Clock;

#[derive(Debug, Deserialize)]
pub struct SpecificTimeOptions {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificTimeState {
    /// When the action last fired.
    pub last_fired: Option<Timestamp>,
}

/// Fires with `current time is HH:MM` when the clock shows `hour:minute`.
///
/// After firing it stays quiet for a minute, so several cycles inside the
/// matching minute fire only once.
pub struct SpecificTime {
    clock: Arc<dyn Clock>,
}

impl SpecificTime {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl JsonAction for SpecificTime {
    type Options = SpecificTimeOptions;
    type State = SpecificTimeState;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("SpecificTime", "Fires at a specific time of day")
            .with_minimum_refresh_rate(10)
            .with_default_options(serde_json::json!({"hour": 13, "minute": 7}))
    }

    fn default_state(&self) -> SpecificTimeState {
        SpecificTimeState::default()
    }

    async fn evaluate(
        &self,
        _ctx: &HandlerContext,
        options: SpecificTimeOptions,
        state: SpecificTimeState,
    ) -> Result<Evaluation<SpecificTimeState>, HandlerError> {
        let local = self.clock.now();
        let now = local.with_timezone(&Utc);
        let matches = local.hour() == options.hour && local.minute() == options.minute;
        let quiet = state
            .last_fired
            .is_some_and(|at| now < at + chrono::Duration::minutes(1));
        if !matches || quiet {
            return Ok(Evaluation::idle(state));
        }
        Ok(Evaluation::fired(
            format!("current time is {}", local.format("%H:%M")),
            SpecificTimeState {
                last_fired: Some(now),
            },
        ))
    }
}
