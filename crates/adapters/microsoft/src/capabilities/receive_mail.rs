//! ReceiveMicrosoftMail: fires when a new message lands in the inbox.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use relay_app::ports::{Evaluation, HandlerContext, JsonAction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;
use relay_domain::time::{self, Timestamp};

use crate::SERVICE;
use crate::client::MicrosoftClient;

/// Only mail received after `time` can fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailState {
    pub time: Timestamp,
}

/// Fires with the sender and subject of the newest message received after
/// the stored watermark, then moves the watermark one second past it.
pub struct ReceiveMicrosoftMail {
    client: Arc<MicrosoftClient>,
}

impl ReceiveMicrosoftMail {
    #[must_use]
    pub fn new(client: Arc<MicrosoftClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonAction for ReceiveMicrosoftMail {
    type Options = IgnoredAny;
    type State = MailState;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("ReceiveMicrosoftMail", "Fires when a new mail is received")
            .with_minimum_refresh_rate(10)
    }

    /// A fresh unit looks one hour back.
    fn default_state(&self) -> MailState {
        MailState {
            time: time::now() - Duration::hours(1),
        }
    }

    async fn evaluate(
        &self,
        ctx: &HandlerContext,
        _options: IgnoredAny,
        state: MailState,
    ) -> Result<Evaluation<MailState>, HandlerError> {
        let token = ctx.access_token(SERVICE).await?;
        let Some(mail) = self
            .client
            .latest_mail_since(&token.token, state.time)
            .await?
        else {
            return Ok(Evaluation::idle(state));
        };
        Ok(Evaluation::fired(
            format!(
                "New email received from {}: object: {}",
                mail.from, mail.subject
            ),
            MailState {
                time: mail.received_at + Duration::seconds(1),
            },
        ))
    }
}
