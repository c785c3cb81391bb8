//! Outfit suggestions and conversational replies built on a text generator.
//!
//! Nothing here returns an error: provider failures become reply text.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    config::{Config, GeminiConfig, PersonaConfig},
    generation::{GeminiClient, GenerationError, PromptTurn, TextGenerator, generate_with_fallback},
    model::{ConversationTurn, Role, WeatherReading},
    util::take_chars,
};

pub const NO_KEY_SUGGESTION: &str =
    "I NEED A GEMINI API KEY TO GIVE YOU A SMART SUGGESTION! (SET GEMINI_API_KEY OR RUN QUANTRA CONFIGURE)";

pub const NO_KEY_CHAT: &str =
    "QUANTRA 0.5: PLEASE ADD YOUR GEMINI_API_KEY (OR RUN QUANTRA CONFIGURE) TO CHAT!";

pub const FALLBACK_OUTFIT: &str =
    "THE WEATHER IS PLEASANT. A LIGHT SWEATER OR A T-SHIRT SHOULD WORK FINE.";

const OWNER_TROUBLE: &str = "I AM HAVING TROUBLE CONNECTING.";

const ERROR_SNIPPET_CHARS: usize = 150;

#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    /// `None` when no credential was configured at startup.
    generator: Option<Arc<dyn TextGenerator>>,
    suggestion_models: Vec<String>,
    chat_models: Vec<String>,
    persona: PersonaConfig,
}

impl ResponseGenerator {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        gemini: &GeminiConfig,
        persona: PersonaConfig,
    ) -> Self {
        Self {
            generator,
            suggestion_models: gemini.suggestion_models.clone(),
            chat_models: gemini.chat_models.clone(),
            persona,
        }
    }

    /// Wire up Gemini when a key is configured; otherwise run in template-only mode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let generator: Option<Arc<dyn TextGenerator>> = match config.api_key() {
            Some(key) => {
                info!("Gemini key configured; generative replies enabled");
                let client = GeminiClient::new(key, &config.gemini)?;
                Some(Arc::new(client) as Arc<dyn TextGenerator>)
            }
            None => {
                warn!("GEMINI_API_KEY not configured; replies fall back to fixed templates");
                None
            }
        };

        Ok(Self::new(generator, &config.gemini, config.persona.clone()))
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn suggest_outfit(&self, weather: &WeatherReading) -> String {
        let turns = [PromptTurn::user(self.outfit_prompt(weather))];

        match self.generate(&self.suggestion_models, &turns).await {
            Ok(text) => normalize(&text),
            Err(GenerationError::Unavailable) => NO_KEY_SUGGESTION.to_string(),
            Err(e) => {
                info!(error = %e, "Outfit suggestion unavailable, using fallback sentence");
                FALLBACK_OUTFIT.to_string()
            }
        }
    }

    /// Conversational reply to `query`.
    ///
    /// Precondition: `history` already ends with `query` as a user turn. That
    /// turn is re-sent as the live prompt rather than replayed as context. If
    /// the last turn is anything else the whole history is replayed.
    pub async fn chat(&self, query: &str, history: &[ConversationTurn]) -> String {
        let mut turns: Vec<PromptTurn> = prior_context(history, query)
            .iter()
            .map(|turn| PromptTurn {
                speaker: turn.role.into(),
                text: turn.content.clone(),
            })
            .collect();
        let live = format!("{}\n\nUSER: {query}", self.persona_prompt());
        turns.push(PromptTurn::user(live));

        match self.generate(&self.chat_models, &turns).await {
            Ok(text) => normalize(&text),
            Err(GenerationError::Unavailable) => NO_KEY_CHAT.to_string(),
            Err(e) => self.chat_failure_text(query, &e),
        }
    }

    /// Run the fallback chain, or report `Unavailable` when no key was configured.
    async fn generate(
        &self,
        models: &[String],
        turns: &[PromptTurn],
    ) -> Result<String, GenerationError> {
        match &self.generator {
            Some(generator) => generate_with_fallback(generator.as_ref(), models, turns).await,
            None => Err(GenerationError::Unavailable),
        }
    }

    fn outfit_prompt(&self, weather: &WeatherReading) -> String {
        format!(
            "YOU ARE {name}, A HELPFUL AI WEATHER ASSISTANT.\n\
             BASED ON THIS WEATHER DATA: CITY {city}, TEMPERATURE {temp}{unit}, WIND {wind} KM/H, \
             CONDITION {condition} (WMO CODE {code}), SUGGEST EXACTLY WHAT THE USER SHOULD WEAR.\n\
             KEEP THE ANSWER VERY SIMPLE, HUMAN-LIKE, AND USE SHORT SENTENCES.\n\
             RESPONSE MUST BE IN ALL CAPITAL LETTERS.",
            name = self.persona.name,
            city = weather.city,
            temp = weather.temperature,
            unit = weather.unit,
            wind = weather.wind_speed,
            condition = weather.condition().description().to_uppercase(),
            code = weather.condition_code,
        )
    }

    fn persona_prompt(&self) -> String {
        let mut prompt = format!(
            "YOU ARE {}, A SOPHISTICATED YET FRIENDLY AI ASSISTANT.\n",
            self.persona.name
        );

        let respect_rule = match self.owner() {
            Some(owner) => {
                prompt.push_str(&format!("PROJECT OWNER: {owner}.\n"));
                format!("ADDRESS {owner} AS '{owner} SIR' WITH EXTREME RESPECT.")
            }
            None => "ALWAYS BE POLITE AND RESPECTFUL.".to_string(),
        };

        prompt.push_str("RULES:\n");
        prompt.push_str("1. ALWAYS TALK IN ALL CAPITAL LETTERS.\n");
        prompt.push_str(&format!("2. {respect_rule}\n"));
        prompt.push_str("3. KEEP RESPONSES VERY SHORT (UNDER 50 WORDS).\n");
        prompt.push_str("4. NO MARKDOWN.");
        prompt
    }

    fn chat_failure_text(&self, query: &str, error: &GenerationError) -> String {
        let last_error = match error {
            GenerationError::Exhausted { last_error, .. } => last_error.clone(),
            other => other.to_string(),
        };
        let snippet = take_chars(&last_error.to_uppercase(), ERROR_SNIPPET_CHARS);

        match self.owner() {
            Some(owner) if query.to_uppercase().contains(&owner) => {
                format!("HELLO {owner} SIR! {OWNER_TROUBLE} ERROR: {snippet}")
            }
            _ => format!("BRAIN FOG! ERROR: {snippet}"),
        }
    }

    fn owner(&self) -> Option<String> {
        self.persona
            .owner
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_uppercase)
    }
}

fn prior_context<'a>(history: &'a [ConversationTurn], query: &str) -> &'a [ConversationTurn] {
    match history.split_last() {
        Some((last, rest)) if last.role == Role::User && last.content == query => rest,
        _ => {
            debug!("Live query is not the last history entry; replaying full history");
            history
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{Speaker, testing::ScriptedGenerator};

    fn reading() -> WeatherReading {
        WeatherReading {
            city: "Tokyo".into(),
            temperature: 12.5,
            wind_speed: 9.0,
            condition_code: 61,
            unit: WeatherReading::CELSIUS.into(),
            observed_at: None,
        }
    }

    fn responder(generator: Arc<ScriptedGenerator>, owner: Option<&str>) -> ResponseGenerator {
        let persona = PersonaConfig {
            owner: owner.map(str::to_string),
            ..PersonaConfig::default()
        };
        let generator: Arc<dyn TextGenerator> = generator;
        ResponseGenerator::new(Some(generator), &GeminiConfig::default(), persona)
    }

    fn offline() -> ResponseGenerator {
        ResponseGenerator::new(None, &GeminiConfig::default(), PersonaConfig::default())
    }

    #[tokio::test]
    async fn without_key_returns_fixed_messages() {
        let r = offline();

        assert!(!r.is_available());
        assert_eq!(r.suggest_outfit(&reading()).await, NO_KEY_SUGGESTION);
        assert_eq!(r.chat("anything at all", &[]).await, NO_KEY_CHAT);
    }

    #[tokio::test]
    async fn without_key_generation_is_unavailable() {
        let turns = [PromptTurn::user("hi")];

        let result = offline().generate(&["model-a".to_string()], &turns).await;

        assert_eq!(result, Err(GenerationError::Unavailable));
    }

    #[test]
    fn from_config_without_key_is_offline() {
        let r = ResponseGenerator::from_config(&Config::default()).unwrap();
        assert!(!r.is_available());
    }

    #[tokio::test]
    async fn outfit_is_trimmed_and_uppercased() {
        let outcomes = vec![Ok("  Wear a raincoat.\n".into())];
        let generator = Arc::new(ScriptedGenerator::new(outcomes));
        let r = responder(generator.clone(), None);

        assert_eq!(r.suggest_outfit(&reading()).await, "WEAR A RAINCOAT.");

        let calls = generator.calls.lock();
        assert_eq!(calls[0].0, "models/gemini-2.0-flash-exp");
        let prompt = &calls[0].1[0].text;
        assert!(prompt.contains("TOKYO") || prompt.contains("Tokyo"));
        assert!(prompt.contains("RAIN"));
        assert!(prompt.contains("12.5°C"));
    }

    #[tokio::test]
    async fn outfit_falls_back_after_every_model_fails() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(GenerationError::Request("a".into())),
            Err(GenerationError::Request("b".into())),
            Err(GenerationError::Request("c".into())),
        ]));
        let r = responder(generator.clone(), None);

        assert_eq!(r.suggest_outfit(&reading()).await, FALLBACK_OUTFIT);
        assert_eq!(generator.models_called().len(), 3);
    }

    #[tokio::test]
    async fn chat_excludes_live_query_from_context() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok("hi there".into())]));
        let r = responder(generator.clone(), None);
        let history = vec![
            ConversationTurn::new(Role::User, "hello"),
            ConversationTurn::new(Role::Assistant, "HELLO!"),
            ConversationTurn::new(Role::User, "how are you"),
        ];

        assert_eq!(r.chat("how are you", &history).await, "HI THERE");

        let calls = generator.calls.lock();
        let turns = &calls[0].1;
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], PromptTurn::user("hello"));
        assert_eq!(turns[1], PromptTurn::model("HELLO!"));
        assert_eq!(turns[2].speaker, Speaker::User);
        assert!(turns[2].text.ends_with("USER: how are you"));
        assert!(turns[2].text.contains("UNDER 50 WORDS"));
    }

    #[tokio::test]
    async fn chat_replays_everything_when_precondition_does_not_hold() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok("ok".into())]));
        let r = responder(generator.clone(), None);
        let history = vec![ConversationTurn::new(Role::User, "earlier question")];

        r.chat("new question", &history).await;

        let calls = generator.calls.lock();
        assert_eq!(calls[0].1.len(), 2);
        assert_eq!(calls[0].1[0], PromptTurn::user("earlier question"));
    }

    #[tokio::test]
    async fn chat_failure_embeds_truncated_last_error() {
        let mut outcomes: Vec<_> = (0..3)
            .map(|i| Err(GenerationError::Request(format!("e{i}"))))
            .collect();
        outcomes.push(Err(GenerationError::Request("x".repeat(400))));
        let r = responder(Arc::new(ScriptedGenerator::new(outcomes)), None);
        let history = [ConversationTurn::new(Role::User, "hello")];

        let reply = r.chat("hello", &history).await;

        assert!(reply.starts_with("BRAIN FOG! ERROR: XXX"));
        assert_eq!(reply.len(), "BRAIN FOG! ERROR: ".len() + 150);
    }

    #[tokio::test]
    async fn chat_failure_greets_owner() {
        let outcomes = (0..4)
            .map(|_| Err(GenerationError::Request("quota exceeded".into())))
            .collect();
        let r = responder(Arc::new(ScriptedGenerator::new(outcomes)), Some("Parth"));

        let reply = r.chat("hey parth here", &[]).await;

        assert_eq!(
            reply,
            "HELLO PARTH SIR! I AM HAVING TROUBLE CONNECTING. ERROR: QUOTA EXCEEDED"
        );
    }

    #[test]
    fn persona_mentions_owner_only_when_configured() {
        let generator = Arc::new(ScriptedGenerator::default());

        let with_owner = responder(generator.clone(), Some("Parth")).persona_prompt();
        let without_owner = responder(generator, None).persona_prompt();

        assert!(with_owner.contains("'PARTH SIR'"));
        assert!(!without_owner.contains("SIR"));
    }
}
