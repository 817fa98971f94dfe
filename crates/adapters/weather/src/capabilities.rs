//! Weather capabilities: condition and temperature Actions, current-weather
//! Reactions.

mod conditions;
mod reports;

pub use conditions::{MatchState, SpecificTemperature, SpecificWeather};
pub use reports::{CityOptions, CurrentTemperature, CurrentWeather};
