use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use relay_app::ports::{HandlerContext, JsonReaction};
use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;

use crate::client::OpenWeatherClient;

#[derive(Debug, Deserialize)]
pub struct CityOptions {
    pub city: String,
}

/// Answers with `current weather in <city> is <condition>`.
pub struct CurrentWeather {
    client: Arc<OpenWeatherClient>,
}

impl CurrentWeather {
    #[must_use]
    pub fn new(client: Arc<OpenWeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonReaction for CurrentWeather {
    type Options = CityOptions;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("CurrentWeather", "Reports the weather in a city")
            .with_default_options(serde_json::json!({"city": "Paris"}))
    }

    async fn execute(
        &self,
        _ctx: &HandlerContext,
        options: CityOptions,
        _fact: &str,
    ) -> Result<String, HandlerError> {
        let observation = self.client.observe(&options.city).await?;
        Ok(format!(
            "current weather in {} is {}",
            options.city, observation.condition
        ))
    }
}

/// Answers with `current temperature in <city> is <t>°C`.
pub struct CurrentTemperature {
    client: Arc<OpenWeatherClient>,
}

impl CurrentTemperature {
    #[must_use]
    pub fn new(client: Arc<OpenWeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonReaction for CurrentTemperature {
    type Options = CityOptions;

    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("CurrentTemperature", "Reports the temperature in a city")
            .with_default_options(serde_json::json!({"city": "Paris"}))
    }

    async fn execute(
        &self,
        _ctx: &HandlerContext,
        options: CityOptions,
        _fact: &str,
    ) -> Result<String, HandlerError> {
        let observation = self.client.observe(&options.city).await?;
        Ok(format!(
            "current temperature in {} is {:.1}°C",
            options.city, observation.temperature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{mount_city, mount_weather, setup};
    use relay_app::ports::NoCredentials;
    use relay_domain::id::{UnitId, UserId};

    fn ctx() -> HandlerContext {
        HandlerContext::new(UnitId::new(), UserId::new(), Arc::new(NoCredentials))
    }

    fn paris() -> CityOptions {
        CityOptions {
            city: "Paris".to_string(),
        }
    }

    #[tokio::test]
    async fn should_report_current_weather() {
        let (server, client) = setup().await;
        mount_city(&server, "Paris").await;
        mount_weather(&server, "Snow", -1.0).await;

        let message = CurrentWeather::new(Arc::new(client))
            .execute(&ctx(), paris(), "fact")
            .await
            .unwrap();

        assert_eq!(message, "current weather in Paris is Snow");
    }

    #[tokio::test]
    async fn should_report_current_temperature() {
        let (server, client) = setup().await;
        mount_city(&server, "Paris").await;
        mount_weather(&server, "Snow", -1.0).await;

        let message = CurrentTemperature::new(Arc::new(client))
            .execute(&ctx(), paris(), "fact")
            .await
            .unwrap();

        assert_eq!(message, "current temperature in Paris is -1.0°C");
    }
}
