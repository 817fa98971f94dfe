//! Weather-specific errors.

use relay_domain::error::HandlerError;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// A request failed or its body could not be decoded.
    #[error("weather request failed")]
    Request(#[from] reqwest::Error),

    /// The geocoding API knows no such city.
    #[error("unknown city {0:?}")]
    UnknownCity(String),

    /// The weather API returned no condition.
    #[error("no weather condition reported")]
    NoCondition,
}

impl From<WeatherError> for HandlerError {
    fn from(err: WeatherError) -> Self {
        Self::upstream(err)
    }
}
