//! Thin OpenWeatherMap HTTP client.
//!
//! Cities are resolved to coordinates through the geocoding API, then the
//! current weather is fetched for those coordinates in metric units.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use relay_domain::error::HandlerError;

use crate::error::WeatherError;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Connection settings for OpenWeatherMap.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    /// Root of the current-weather API.
    pub base_url: String,
    /// Root of the geocoding API.
    pub geo_url: String,
    pub timeout: Duration,
}

impl WeatherConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            geo_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct Measurements {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    weather: Vec<Condition>,
    main: Measurements,
}

/// Current conditions in a city.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Condition group, e.g. `Rain` or `Clear`.
    pub condition: String,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    config: WeatherConfig,
}

impl OpenWeatherClient {
    /// # Errors
    ///
    /// Returns [`WeatherError::Client`] if the HTTP client cannot be built.
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(WeatherError::Client)?;
        Ok(Self { http, config })
    }

    /// Fetch the current conditions in `city`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedStatus`] on a non-success response,
    /// or [`HandlerError::Upstream`] if the request fails, the city is
    /// unknown or the body cannot be decoded.
    pub async fn observe(&self, city: &str) -> Result<Observation, HandlerError> {
        let location = self.locate(city).await?;
        let response = self
            .http
            .get(format!("{}/data/2.5/weather", self.config.base_url))
            .query(&[
                ("lat", location.lat.to_string()),
                ("lon", location.lon.to_string()),
                ("appid", self.config.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(WeatherError::from)?;
        let body: WeatherResponse = check(response)?
            .json()
            .await
            .map_err(WeatherError::from)?;
        let condition = body
            .weather
            .into_iter()
            .next()
            .ok_or(WeatherError::NoCondition)?;
        tracing::debug!(city, condition = %condition.main, temperature = body.main.temp, "weather observed");
        Ok(Observation {
            condition: condition.main,
            temperature: body.main.temp,
        })
    }

    async fn locate(&self, city: &str) -> Result<Location, HandlerError> {
        let response = self
            .http
            .get(format!("{}/geo/1.0/direct", self.config.geo_url))
            .query(&[("q", city), ("limit", "1"), ("appid", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(WeatherError::from)?;
        let locations: Vec<Location> = check(response)?
            .json()
            .await
            .map_err(WeatherError::from)?;
        locations
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::UnknownCity(city.to_string()).into())
    }
}

fn check(response: reqwest::Response) -> Result<reqwest::Response, HandlerError> {
    let status = response.status();
    if status == StatusCode::OK {
        Ok(response)
    } else {
        Err(HandlerError::UnexpectedStatus {
            status: status.as_u16(),
        })
    }
}
