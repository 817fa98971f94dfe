use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use relay_app::ports::{HandlerContext, JsonReaction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

use crate::SERVICE;
use crate::client::{MicrosoftClient, OutgoingMail};

#[derive(Debug, Deserialize)]
pub struct SendMailOptions {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub recipient: String,
}

/// Sends a plain-text mail from the owner's mailbox.
pub struct SendMicrosoftMail {
    client: Arc<MicrosoftClient>,
}

impl SendMicrosoftMail {
    #[must_use]
    pub fn new(client: Arc<MicrosoftClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonReaction for SendMicrosoftMail {
    type Options = SendMailOptions;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("SendMicrosoftMail", "Sends a mail using Microsoft services")
            .with_default_options(serde_json::json!({
                "subject": "",
                "body": "",
                "recipient": ""
            }))
    }

    async fn execute(
        &self,
        ctx: &HandlerContext,
        options: SendMailOptions,
        _fact: &str,
    ) -> Result<String, HandlerError> {
        let token = ctx.access_token(SERVICE).await?;
        let mail = OutgoingMail {
            subject: options.subject,
            body: options.body,
            recipient: options.recipient,
        };
        self.client.send_mail(&token.token, &mail).await?;
        Ok(format!("email sent to {}", mail.recipient))
    }
}
