use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Classified purpose of a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    WeatherQuery,
    LifestyleSuggestion,
    Chat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::WeatherQuery => "weather_query",
            Intent::LifestyleSuggestion => "lifestyle_suggestion",
            Intent::Chat => "chat",
        }
    }

    /// Whether answering this intent starts with a weather lookup.
    pub fn needs_weather(&self) -> bool {
        matches!(self, Intent::WeatherQuery | Intent::LifestyleSuggestion)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Assistant,
}

/// One message in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A geocoding hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub resolved_name: String,
}

/// Current conditions for a resolved city. Temperatures are always Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub city: String,
    pub temperature: f64,
    pub wind_speed: f64,
    pub condition_code: i32,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<NaiveDateTime>,
}

impl WeatherReading {
    pub const CELSIUS: &'static str = "°C";

    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.condition_code)
    }

    /// Compact payload consumed by the result page's weather widget.
    ///
    /// `time` (provider time, GMT) is only present when the forecast carried one.
    pub fn widget_json(&self) -> serde_json::Value {
        let mut widget = serde_json::json!({
            "city": self.city,
            "temp": self.temperature,
            "wind": self.wind_speed,
            "code": self.condition_code,
            "unit": self.unit,
        });
        if let Some(at) = self.observed_at {
            widget["time"] = at.format("%Y-%m-%d %H:%M").to_string().into();
        }
        widget
    }
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet,
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub decision: Intent,
    pub response: String,
    pub query: String,
    pub city: Option<String>,
    pub history: Vec<ConversationTurn>,
}

/// Acknowledgement returned after the conversation log is wiped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearAck {
    pub status: String,
    pub message: String,
}
