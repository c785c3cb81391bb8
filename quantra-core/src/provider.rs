use async_trait::async_trait;
use std::fmt::Debug;

use crate::model::WeatherReading;

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Weather lookup failures. The display text is what the end user sees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeatherError {
    /// Geocoding produced no match, or the geocoding call itself failed.
    #[error("CITY NOT FOUND")]
    CityNotFound,

    /// The forecast call failed after the city was resolved.
    #[error("FAILED TO FETCH WEATHER: {0}")]
    Provider(String),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Resolve `city` and fetch its current conditions.
    async fn get_weather(&self, city: &str) -> Result<WeatherReading, WeatherError>;
}
