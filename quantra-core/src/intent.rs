//! Keyword-based intent classification.

use crate::model::Intent;

const SUGGESTION_KEYWORDS: &[&str] = &[
    "wear",
    "outfit",
    "jacket",
    "shirt",
    "dress",
    "clothing",
    "suggest",
    "recommend",
    "should i",
    "can i go",
    "clothes",
    "style",
    "today's look",
];

// Includes common misspellings of "weather".
const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "temperature",
    "temp",
    "rain",
    "rainy",
    "sunny",
    "cloudy",
    "wind",
    "humidity",
    "forecast",
    "sky",
    "wethaer",
    "wheather",
    "weater",
    "hot",
    "cold",
    "degree",
    "celcius",
    "fahrenheit",
];

/// Classify a raw query. Suggestion keywords win over weather keywords.
///
/// Matching is plain substring containment on the lowercased query, so
/// "rainy" also matches "rain" and "weathers" matches "weather".
pub fn classify(query: &str) -> Intent {
    let query = query.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| query.contains(k));

    if contains_any(SUGGESTION_KEYWORDS) {
        Intent::LifestyleSuggestion
    } else if contains_any(WEATHER_KEYWORDS) {
        Intent::WeatherQuery
    } else {
        Intent::Chat
    }
}
