//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `relay.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use relay_adapter_microsoft::MicrosoftConfig;
use relay_adapter_spotify::SpotifyConfig;
use relay_adapter_weather::WeatherConfig;
use relay_app::supervisor::EngineSettings;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Poller timing.
    pub engine: EngineConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
    pub weather: WeatherSection,
    pub spotify: SpotifySection,
    pub microsoft: MicrosoftSection,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pause after a failed cycle, in milliseconds.
    pub error_backoff_ms: u64,
    /// Grace period for a stopping poller before it is aborted, in milliseconds.
    pub stop_timeout_ms: u64,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo integration.
    pub virtual_enabled: bool,
    pub timer_enabled: bool,
    /// Requires `[weather] api_key`.
    pub weather_enabled: bool,
    pub spotify_enabled: bool,
    pub microsoft_enabled: bool,
}

/// OpenWeatherMap settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WeatherSection {
    pub api_key: Option<String>,
    pub base_url: String,
    pub geo_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpotifySection {
    pub base_url: String,
}

/// Microsoft Graph settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MicrosoftSection {
    pub base_url: String,
}

impl Config {
    /// Load configuration from `relay.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("relay.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RELAY_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("RELAY_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("OPENWEATHERMAP_API_KEY") {
            self.weather.api_key = Some(val);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.stop_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "stop_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.integrations.weather_enabled && self.weather_api_key().is_none() {
            return Err(ConfigError::Validation(
                "weather integration enabled without an api_key".to_string(),
            ));
        }
        Ok(())
    }

    fn weather_api_key(&self) -> Option<&str> {
        self.weather
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            error_backoff: Duration::from_millis(self.engine.error_backoff_ms),
            stop_timeout: Duration::from_millis(self.engine.stop_timeout_ms),
        }
    }

    /// OpenWeatherMap client settings, if the integration is enabled.
    #[must_use]
    pub fn weather_config(&self) -> Option<WeatherConfig> {
        if !self.integrations.weather_enabled {
            return None;
        }
        let mut config = WeatherConfig::new(self.weather_api_key()?);
        config.base_url.clone_from(&self.weather.base_url);
        config.geo_url.clone_from(&self.weather.geo_url);
        Some(config)
    }

    /// Spotify client settings, if the integration is enabled.
    #[must_use]
    pub fn spotify_config(&self) -> Option<SpotifyConfig> {
        self.integrations.spotify_enabled.then(|| SpotifyConfig {
            base_url: self.spotify.base_url.clone(),
            ..SpotifyConfig::default()
        })
    }

    /// Microsoft Graph client settings, if the integration is enabled.
    #[must_use]
    pub fn microsoft_config(&self) -> Option<MicrosoftConfig> {
        self.integrations.microsoft_enabled.then(|| MicrosoftConfig {
            base_url: self.microsoft.base_url.clone(),
            ..MicrosoftConfig::default()
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:relay.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "relayd=info,relay=info".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_backoff_ms: 1000,
            stop_timeout_ms: 5000,
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            timer_enabled: true,
            weather_enabled: false,
            spotify_enabled: false,
            microsoft_enabled: false,
        }
    }
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: relay_adapter_weather::DEFAULT_BASE_URL.to_string(),
            geo_url: relay_adapter_weather::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for SpotifySection {
    fn default() -> Self {
        Self {
            base_url: relay_adapter_spotify::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for MicrosoftSection {
    fn default() -> Self {
        Self {
            base_url: relay_adapter_microsoft::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:relay.db?mode=rwc");
        assert!(config.integrations.virtual_enabled);
        assert!(config.integrations.timer_enabled);
        assert!(!config.integrations.weather_enabled);
        assert_eq!(config.engine_settings(), EngineSettings::default());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.stop_timeout_ms, 5000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [engine]
            error_backoff_ms = 250
            stop_timeout_ms = 2000

            [integrations]
            virtual_enabled = false
            timer_enabled = false
            weather_enabled = true
            spotify_enabled = true
            microsoft_enabled = true

            [weather]
            api_key = 'secret'
            base_url = 'http://localhost:9000'
            geo_url = 'http://localhost:9001'

            [spotify]
            base_url = 'http://localhost:9002'

            [microsoft]
            base_url = 'http://localhost:9003'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database_url(), "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(
            config.engine_settings(),
            EngineSettings {
                error_backoff: Duration::from_millis(250),
                stop_timeout: Duration::from_secs(2),
            }
        );
        assert!(!config.integrations.virtual_enabled);

        let weather = config.weather_config().unwrap();
        assert_eq!(weather.api_key, "secret");
        assert_eq!(weather.base_url, "http://localhost:9000");
        assert_eq!(weather.geo_url, "http://localhost:9001");
        assert_eq!(
            config.spotify_config().unwrap().base_url,
            "http://localhost:9002"
        );
        assert_eq!(
            config.microsoft_config().unwrap().base_url,
            "http://localhost:9003"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.engine.error_backoff_ms, 1000);
    }

    #[test]
    fn should_reject_zero_stop_timeout() {
        let mut config = Config::default();
        config.engine.stop_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_weather_without_api_key() {
        let mut config = Config::default();
        config.integrations.weather_enabled = true;
        config.weather.api_key = Some("  ".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(message)) if message.contains("api_key")
        ));
    }

    #[test]
    fn should_skip_disabled_integrations() {
        let mut config = Config::default();
        config.weather.api_key = Some("secret".to_string());
        assert!(config.weather_config().is_none());
        assert!(config.spotify_config().is_none());
        assert!(config.microsoft_config().is_none());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
