//! Core library for the QUANTRA weather assistant.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Intent classification and city extraction for free-text queries
//! - The Open-Meteo weather client and the Gemini text generator
//! - The in-memory conversation log and the query orchestrator
//!
//! It is used by `quantra-server`, but can also be reused by other binaries or services.

pub mod assistant;
pub mod city;
pub mod config;
pub mod conversation;
pub mod generation;
pub mod intent;
pub mod model;
pub mod provider;
pub mod responder;

mod util;

pub use assistant::{Assistant, WEATHER_WIDGET_PREFIX};
pub use city::extract_city;
pub use config::Config;
pub use conversation::ConversationStore;
pub use generation::{GeminiClient, GenerationError, TextGenerator};
pub use intent::classify;
pub use model::{
    ClearAck, ConversationTurn, Coordinates, Intent, QueryRequest, QueryResponse, Role,
    WeatherReading,
};
pub use provider::{OpenMeteoClient, WeatherError, WeatherProvider};
pub use responder::ResponseGenerator;
