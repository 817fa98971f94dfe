//! # relay-adapter-weather
//!
//! OpenWeatherMap integration.
//!
//! ## Provided capabilities
//!
//! | Kind | Name | Behaviour |
//! |------|------|-----------|
//! | Action | `SpecificWeather` | Fires when a city's condition group matches `weather` |
//! | Action | `SpecificTemperature` | Fires when a city's temperature rounds to `temperature` |
//! | Reaction | `CurrentWeather` | Reports the condition group in `city` |
//! | Reaction | `CurrentTemperature` | Reports the temperature in `city` |
//!
//! All requests share one [`OpenWeatherClient`] and the API key it was
//! configured with; no per-user credential is needed.

mod capabilities;
mod client;
mod error;

use std::sync::Arc;

use relay_app::ports::capability::{action, reaction};
use relay_app::ports::{ActionHandler, Integration, ReactionHandler};
use relay_domain::capability::ServiceInfo;

pub use capabilities::{
    CurrentTemperature, CurrentWeather, MatchState, SpecificTemperature, SpecificWeather,
};
pub use client::{DEFAULT_BASE_URL, Observation, OpenWeatherClient, WeatherConfig};
pub use error::WeatherError;

/// Service name every weather capability is registered under.
pub const SERVICE: &str = "weather";

#[derive(Debug, Clone)]
pub struct WeatherIntegration {
    client: Arc<OpenWeatherClient>,
}

impl WeatherIntegration {
    /// # Errors
    ///
    /// Returns [`WeatherError::Client`] if the HTTP client cannot be built.
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Arc::new(OpenWeatherClient::new(config)?),
        })
    }
}

impl Integration for WeatherIntegration {
    fn service(&self) -> ServiceInfo {
        ServiceInfo::new(SERVICE, "Current weather from OpenWeatherMap")
    }

    fn actions(&self) -> Vec<Arc<dyn ActionHandler>> {
        vec![
            action(SpecificWeather::new(Arc::clone(&self.client))),
            action(SpecificTemperature::new(Arc::clone(&self.client))),
        ]
    }

    fn reactions(&self) -> Vec<Arc<dyn ReactionHandler>> {
        vec![
            reaction(CurrentWeather::new(Arc::clone(&self.client))),
            reaction(CurrentTemperature::new(Arc::clone(&self.client))),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_app::registry::CapabilityRegistry;

    #[test]
    fn should_register_two_actions_and_two_reactions() {
        let integration = WeatherIntegration::new(WeatherConfig::new("key")).unwrap();
        let registry = CapabilityRegistry::builder()
            .integration(&integration)
            .build()
            .unwrap();

        let actions = registry.actions(SERVICE);
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|info| info.minimum_refresh_rate == 60));
        assert_eq!(registry.reactions(SERVICE).len(), 2);
        assert!(!integration.service().requires_credential);
    }
}
