use anyhow::Result;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    city::extract_city,
    config::Config,
    conversation::ConversationStore,
    intent::classify,
    model::{ClearAck, ConversationTurn, Intent, QueryRequest, QueryResponse, Role},
    provider::{OpenMeteoClient, WeatherProvider},
    responder::ResponseGenerator,
};

/// Prefix the result page looks for to render the weather widget.
pub const WEATHER_WIDGET_PREFIX: &str = "WIDGET_WEATHER:";

/// Routes a query to weather data, an outfit suggestion, or chat, and keeps
/// the conversation log up to date.
#[derive(Debug, Clone)]
pub struct Assistant {
    weather: Arc<dyn WeatherProvider>,
    responder: ResponseGenerator,
    history: Arc<ConversationStore>,
}

impl Assistant {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        responder: ResponseGenerator,
        history: Arc<ConversationStore>,
    ) -> Self {
        Self {
            weather,
            responder,
            history,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(OpenMeteoClient::new(&config.weather)?),
            ResponseGenerator::from_config(config)?,
            Arc::new(ConversationStore::new()),
        ))
    }

    /// The shared conversation log.
    pub fn history(&self) -> &ConversationStore {
        &self.history
    }

    pub fn ai_available(&self) -> bool {
        self.responder.is_available()
    }

    #[instrument(skip_all, fields(query = %request.query))]
    pub async fn handle_query(&self, request: QueryRequest) -> QueryResponse {
        let QueryRequest { query, city } = request;

        let decision = classify(&query);
        let city = city
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .or_else(|| extract_city(&query));
        info!(%decision, city = ?city, "Classified query");

        self.history.append(Role::User, query.as_str());
        let history = self.history.snapshot();

        let response = self
            .answer(decision, &query, city.as_deref(), &history)
            .await;

        self.history.append(Role::Assistant, response.as_str());

        QueryResponse {
            decision,
            response,
            query,
            city,
            history: self.history.snapshot(),
        }
    }

    pub fn clear_history(&self) -> ClearAck {
        info!("Clearing conversation history");
        self.history.clear()
    }

    async fn answer(
        &self,
        decision: Intent,
        query: &str,
        city: Option<&str>,
        history: &[ConversationTurn],
    ) -> String {
        let city = match city {
            Some(city) if decision.needs_weather() => city,
            _ => return self.responder.chat(query, history).await.to_uppercase(),
        };

        let reading = match self.weather.get_weather(city).await {
            Ok(reading) => reading,
            Err(e) => {
                info!(error = %e, "Weather lookup failed, answering conversationally");
                return self.responder.chat(query, history).await.to_uppercase();
            }
        };

        match decision {
            Intent::LifestyleSuggestion => {
                self.responder.suggest_outfit(&reading).await.to_uppercase()
            }
            _ => format!("{WEATHER_WIDGET_PREFIX}{}", reading.widget_json()),
        }
    }
}
