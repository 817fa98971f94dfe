//! # relay-adapter-microsoft
//!
//! Outlook mailbox integration over Microsoft Graph, acting on behalf of
//! each unit's owner.
//!
//! ## Provided capabilities
//!
//! | Kind | Name | Behaviour |
//! |------|------|-----------|
//! | Action | `ReceiveMicrosoftMail` | Fires when a mail arrives after the stored watermark |
//! | Reaction | `SendMicrosoftMail` | Sends `subject` / `body` to `recipient` |
//!
//! Tokens come from the engine's `CredentialStore` under the `microsoft`
//! service key.

mod capabilities;
mod client;

use std::sync::Arc;

use relay_app::ports::capability::{action, reaction};
use relay_app::ports::{ActionHandler, Integration, ReactionHandler};
use relay_domain::capability::ServiceInfo;

pub use capabilities::{MailState, ReceiveMicrosoftMail, SendMailOptions, SendMicrosoftMail};
pub use client::{
    ClientBuildError, DEFAULT_BASE_URL, MicrosoftClient, MicrosoftConfig, OutgoingMail,
    ReceivedMail,
};

pub const SERVICE: &str = "microsoft";

#[derive(Debug, Clone)]
pub struct MicrosoftIntegration {
    client: Arc<MicrosoftClient>,
}

impl MicrosoftIntegration {
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new(config: MicrosoftConfig) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: Arc::new(MicrosoftClient::new(config)?),
        })
    }
}

impl Integration for MicrosoftIntegration {
    fn service(&self) -> ServiceInfo {
        ServiceInfo::new(SERVICE, "Outlook mail through Microsoft Graph").with_credential()
    }

    fn actions(&self) -> Vec<Arc<dyn ActionHandler>> {
        vec![action(ReceiveMicrosoftMail::new(Arc::clone(&self.client)))]
    }

    fn reactions(&self) -> Vec<Arc<dyn ReactionHandler>> {
        vec![reaction(SendMicrosoftMail::new(Arc::clone(&self.client)))]
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use relay_app::registry::CapabilityRegistry;

    #[test]
    fn should_register_mail_capabilities_under_microsoft() {
        let integration = MicrosoftIntegration::new(MicrosoftConfig::default()).unwrap();
        let registry = CapabilityRegistry::builder()
            .integration(&integration)
            .build()
            .unwrap();

        assert!(integration.service().requires_credential);
        let actions = registry.actions(SERVICE);
        assert_eq!(actions[0].name, "ReceiveMicrosoftMail");
        assert_eq!(actions[0].minimum_refresh_rate, 10);
        assert_eq!(registry.reactions(SERVICE)[0].name, "SendMicrosoftMail");
    }
}
