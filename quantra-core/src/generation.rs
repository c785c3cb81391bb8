//! Text generation seam and the ordered model-fallback strategy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::model::Role;

pub mod gemini;

pub use gemini::GeminiClient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// No credential was configured, so there is nothing to call.
    #[error("no Gemini API key configured")]
    Unavailable,

    /// A single model call failed.
    #[error("{0}")]
    Request(String),

    /// Every model identifier was tried and none produced text.
    #[error("all {attempts} model identifiers failed; last error: {last_error}")]
    Exhausted { attempts: usize, last_error: String },
}

/// Who authored a turn, in the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

impl From<Role> for Speaker {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Speaker::User,
            Role::Assistant => Speaker::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl PromptTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Model,
            text: text.into(),
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync + Debug {
    /// Run one generation against a single model identifier.
    async fn generate(&self, model: &str, turns: &[PromptTurn]) -> Result<String, GenerationError>;
}

/// Try `models` in order and return the first successful generation.
///
/// Each identifier is attempted exactly once. When all fail the error carries
/// the last failure's message.
pub async fn generate_with_fallback(
    generator: &dyn TextGenerator,
    models: &[String],
    turns: &[PromptTurn],
) -> Result<String, GenerationError> {
    let mut last_error = String::from("no model identifiers configured");

    for model in models {
        match generator.generate(model, turns).await {
            Ok(text) => {
                debug!(model = %model, "Generation succeeded");
                return Ok(text);
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Generation failed, trying next model");
                last_error = e.to_string();
            }
        }
    }

    Err(GenerationError::Exhausted {
        attempts: models.len(),
        last_error,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Generator that replays scripted outcomes and records every call.
    #[derive(Debug, Default)]
    pub struct ScriptedGenerator {
        outcomes: Mutex<VecDeque<Result<String, GenerationError>>>,
        pub calls: Mutex<Vec<(String, Vec<PromptTurn>)>>,
    }

    impl ScriptedGenerator {
        pub fn new(outcomes: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::default(),
            }
        }

        pub fn models_called(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            model: &str,
            turns: &[PromptTurn],
        ) -> Result<String, GenerationError> {
            self.calls.lock().push((model.to_string(), turns.to_vec()));
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Request("script exhausted".into())))
        }
    }
}
