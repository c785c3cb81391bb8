use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{
    config::WeatherConfig,
    model::{Coordinates, WeatherReading},
    util::truncate_body,
};

use super::{WeatherError, WeatherProvider};

const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,weather_code";

/// Two-step Open-Meteo client: geocoding search, then current conditions.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("Failed to create weather HTTP client")?;

        Ok(Self {
            http,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
        })
    }

    /// Look up the best geocoding match for `city`.
    ///
    /// A failed request is logged and reported as `CityNotFound`, same as an
    /// empty result set.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_coordinates(&self, city: &str) -> Result<Coordinates, WeatherError> {
        match self.search(city).await {
            Ok(Some(coords)) => Ok(coords),
            Ok(None) => {
                debug!("Geocoding returned no match");
                Err(WeatherError::CityNotFound)
            }
            Err(e) => {
                warn!(error = ?e, "Error fetching coordinates");
                Err(WeatherError::CityNotFound)
            }
        }
    }

    async fn search(&self, city: &str) -> Result<Option<Coordinates>> {
        let res = self
            .http
            .get(&self.geocoding_url)
            .query(&[
                ("name", city),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (geocoding)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read geocoding response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Geocoding request failed with status {}: {}",
                status,
                truncate_body(&body, 200),
            ));
        }

        let parsed: GeoResponse =
            serde_json::from_str(&body).context("Failed to parse geocoding JSON")?;

        let Some(hit) = parsed.results.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(Coordinates {
            latitude: hit.latitude,
            longitude: hit.longitude,
            resolved_name: hit.name,
        }))
    }

    async fn fetch_current(&self, coords: &Coordinates) -> Result<WeatherReading> {
        let res = self
            .http
            .get(&self.forecast_url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                ("current_weather", "true".to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Forecast request failed with status {}: {}",
                status,
                truncate_body(&body, 200),
            ));
        }

        let parsed: ForecastResponse =
            serde_json::from_str(&body).context("Failed to parse forecast JSON")?;

        let current = parsed
            .current_weather
            .ok_or_else(|| anyhow!("Forecast response has no current_weather"))?;

        let observed_at = current
            .time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok());

        Ok(WeatherReading {
            city: coords.resolved_name.clone(),
            temperature: current.temperature,
            wind_speed: current.windspeed,
            condition_code: current.weathercode,
            unit: WeatherReading::CELSIUS.to_string(),
            observed_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoResult>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
    time: Option<String>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    #[instrument(skip(self), level = "info")]
    async fn get_weather(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let coords = self.resolve_coordinates(city).await?;
        debug!(
            lat = coords.latitude,
            lon = coords.longitude,
            name = %coords.resolved_name,
            "Resolved city"
        );

        self.fetch_current(&coords)
            .await
            .map_err(|e| WeatherError::Provider(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocoding_without_results_key_parses_as_empty() {
        let parsed: GeoResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn current_weather_parses() {
        let json = serde_json::json!({
            "current_weather": {
                "temperature": 21.4,
                "windspeed": 7.2,
                "weathercode": 2,
                "time": "2026-10-19T09:00"
            }
        });
        let parsed: ForecastResponse = serde_json::from_value(json).unwrap();
        let current = parsed.current_weather.unwrap();
        assert_eq!(current.weathercode, 2);
        assert_eq!(current.time.as_deref(), Some("2026-10-19T09:00"));
    }

    #[test]
    fn client_builds_with_and_without_timeout() {
        assert!(OpenMeteoClient::new(&WeatherConfig::default()).is_ok());

        let config = WeatherConfig {
            timeout_secs: Some(5),
            ..WeatherConfig::default()
        };
        assert!(OpenMeteoClient::new(&config).is_ok());
    }
}
