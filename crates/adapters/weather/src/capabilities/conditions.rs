//! Actions firing when a city's weather reaches a target.
//!
//! Both fire once per transition into the matching condition and re-arm once
//! the condition stops matching.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use relay_app::ports::{Evaluation, HandlerContext, JsonAction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

use crate::client::OpenWeatherClient;

/// Polling floor shared by every weather Action, in seconds.
const MINIMUM_REFRESH_RATE: u64 = 60;

/// Whether the condition matched on the previous cycle.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub matched: bool,
}

fn transition(
    matches: bool,
    state: &MatchState,
    fact: impl FnOnce() -> String,
) -> Evaluation<MatchState> {
    let next = MatchState { matched: matches };
    if matches && !state.matched {
        Evaluation::fired(fact(), next)
    } else {
        Evaluation::idle(next)
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherOptions {
    pub city: String,
    /// Condition group, compared case-insensitively (e.g. `Rain`).
    pub weather: String,
}

/// Fires with `current weather in <city> is <condition>`.
pub struct SpecificWeather {
    client: Arc<OpenWeatherClient>,
}

impl SpecificWeather {
    #[must_use]
    pub fn new(client: Arc<OpenWeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonAction for SpecificWeather {
    type Options = WeatherOptions;
    type State = MatchState;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("SpecificWeather", "Fires when a city reaches a weather condition")
            .with_minimum_refresh_rate(MINIMUM_REFRESH_RATE)
            .with_default_options(serde_json::json!({"city": "Paris", "weather": "Rain"}))
    }

    fn default_state(&self) -> MatchState {
        MatchState::default()
    }

    async fn evaluate(
        &self,
        _ctx: &HandlerContext,
        options: WeatherOptions,
        state: MatchState,
    ) -> Result<Evaluation<MatchState>, HandlerError> {
        let observation = self.client.observe(&options.city).await?;
        let matches = observation.condition.eq_ignore_ascii_case(&options.weather);
        Ok(transition(matches, &state, || {
            format!(
                "current weather in {} is {}",
                options.city, observation.condition
            )
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct TemperatureOptions {
    pub city: String,
    /// Target in degrees Celsius.
    pub temperature: f64,
}

/// Fires with `current temperature in <city> is <t>°C` when the temperature
/// rounds to the same whole degree as the target.
pub struct SpecificTemperature {
    client: Arc<OpenWeatherClient>,
}

impl SpecificTemperature {
    #[must_use]
    pub fn new(client: Arc<OpenWeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonAction for SpecificTemperature {
    type Options = TemperatureOptions;
    type State = MatchState;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new(
            "SpecificTemperature",
            "Fires when a city reaches a temperature",
        )
        .with_minimum_refresh_rate(MINIMUM_REFRESH_RATE)
        .with_default_options(serde_json::json!({"city": "Paris", "temperature": 20}))
    }

    fn default_state(&self) -> MatchState {
        MatchState::default()
    }

    async fn evaluate(
        &self,
        _ctx: &HandlerContext,
        options: TemperatureOptions,
        state: MatchState,
    ) -> Result<Evaluation<MatchState>, HandlerError> {
        let observation = self.client.observe(&options.city).await?;
        #[allow(clippy::float_cmp)]
        let matches = observation.temperature.round() == options.temperature.round();
        Ok(transition(matches, &state, || {
            format!(
                "current temperature in {} is {:.1}°C",
                options.city, observation.temperature
            )
        }))
    }
}
