use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use quantra_core::model::WeatherCondition;
use quantra_core::{Assistant, Config, QueryRequest, WEATHER_WIDGET_PREFIX};
use std::path::PathBuf;
use tracing::info;

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "quantra", version, about = "QUANTRA weather assistant")]
pub struct Cli {
    /// Read and write this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the web pages and the query API.
    Serve {
        /// Address to listen on, e.g. "127.0.0.1:8000".
        #[arg(long)]
        bind: Option<String>,

        /// Directory containing the HOME/, RESULT/, ... page folders.
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Store a Gemini API key (and optional project owner) in the config file.
    Configure,

    /// Answer a single query in the terminal.
    Ask {
        /// Free-text question, e.g. "what should I wear in Tokyo?".
        query: String,

        /// City to use instead of guessing one from the query.
        #[arg(long)]
        city: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind, static_dir } => {
                let mut config = load_config(self.config.as_ref())?;
                if let Some(bind) = bind {
                    config.server.bind = bind;
                }
                if let Some(dir) = static_dir {
                    config.server.static_dir = dir;
                }
                server::serve(config).await
            }
            Command::Configure => configure(self.config),
            Command::Ask { query, city } => {
                let config = load_config(self.config.as_ref())?;
                let assistant = Assistant::from_config(&config)?;
                let response = assistant.handle_query(QueryRequest { query, city }).await;

                let reply = render_reply(&response.response);
                println!("[{}] {reply}", response.decision);
                if let Some(city) = response.city {
                    println!("city: {city}");
                }
                Ok(())
            }
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();
    Ok(config)
}

fn configure(path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = match &path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if config.has_api_key() {
        println!("Replacing the stored Gemini API key.");
    }

    let key = Password::new("Gemini API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if key.trim().is_empty() {
        anyhow::bail!("API key cannot be empty");
    }
    config.set_api_key(key.trim().to_string());

    let owner = Text::new("Project owner to greet (leave empty to skip):")
        .prompt()
        .context("Failed to read project owner")?;
    config.persona.owner = Some(owner.trim().to_string()).filter(|o| !o.is_empty());

    let saved_to = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };

    info!(path = %saved_to.display(), "Configuration saved");
    println!("Saved configuration to {}", saved_to.display());
    Ok(())
}

/// Turn a weather widget payload into a line of text; other replies pass through.
fn render_reply(response: &str) -> String {
    let Some(payload) = response.strip_prefix(WEATHER_WIDGET_PREFIX) else {
        return response.to_string();
    };

    #[derive(serde::Deserialize)]
    struct Widget {
        city: String,
        temp: f64,
        wind: f64,
        code: i32,
        unit: String,
        #[serde(default)]
        time: Option<String>,
    }

    let Ok(w) = serde_json::from_str::<Widget>(payload) else {
        return response.to_string();
    };

    let mut line = format!(
        "{}: {}{}, wind {} km/h, {}",
        w.city,
        w.temp,
        w.unit,
        w.wind,
        WeatherCondition::from_wmo_code(w.code).description()
    );
    if let Some(time) = w.time {
        line.push_str(&format!(" ({time} GMT)"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["quantra", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        match cli.command {
            Command::Serve { bind, static_dir } => {
                assert_eq!(bind.as_deref(), Some("127.0.0.1:9000"));
                assert!(static_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_ask_with_city() {
        let args = ["quantra", "ask", "is it cold?", "--city", "Oslo"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Ask { query, city } => {
                assert_eq!(query, "is it cold?");
                assert_eq!(city.as_deref(), Some("Oslo"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn renders_widget_payload_as_text() {
        let line = render_reply(
            r#"WIDGET_WEATHER:{"city":"Oslo","temp":-2.5,"wind":11.0,"code":71,"unit":"°C"}"#,
        );
        assert_eq!(line, "Oslo: -2.5°C, wind 11 km/h, Snow");
    }

    #[test]
    fn renders_observation_time_when_present() {
        let widget = serde_json::json!({
            "city": "Oslo",
            "temp": 1,
            "wind": 3,
            "code": 0,
            "unit": "°C",
            "time": "2026-10-19 09:00"
        });

        let line = render_reply(&format!("{WEATHER_WIDGET_PREFIX}{widget}"));

        assert_eq!(line, "Oslo: 1°C, wind 3 km/h, Clear (2026-10-19 09:00 GMT)");
    }

    #[test]
    fn plain_replies_pass_through() {
        assert_eq!(render_reply("HELLO THERE"), "HELLO THERE");
    }
}
