//! Startup wiring: turns a [`Config`] into a ready-to-run [`Session`].

use crate::config::Config;
use crate::voice::SystemSpeech;
use anyhow::{Context, Result};
use clotilde_core::{JokeCorpus, Session, SessionDeps, VoiceSettings, WikipediaClient};
use std::sync::Arc;
use tracing::info;

/// The joke corpus shipped with the binary.
pub const BUNDLED_JOKES: &str = include_str!("../data/jokes.json");

/// Loads the configured corpus, falling back to the bundled one.
pub fn load_jokes(config: &Config) -> Result<JokeCorpus> {
    let corpus = match &config.jokes_path {
        Some(path) => JokeCorpus::from_path(path)
            .with_context(|| format!("Failed to load jokes from {}", path.display()))?,
        None => JokeCorpus::from_json(BUNDLED_JOKES).context("Bundled joke corpus is invalid")?,
    };
    info!(jokes = corpus.len(), "Joke corpus loaded");
    Ok(corpus)
}

/// Creates the Wikipedia client: the explicit base URL if one is set,
/// otherwise the configured language edition.
pub fn wikipedia_client(config: &Config) -> Result<WikipediaClient> {
    let client = match &config.wikipedia_base_url {
        Some(url) => WikipediaClient::new(url, config.http_timeout),
        None => WikipediaClient::for_language(&config.wikipedia_language, config.http_timeout),
    };
    client.context("Failed to create Wikipedia client")
}

/// Builds the collaborators and the session from configuration.
pub fn build_session(config: &Config) -> Result<Session> {
    let jokes = load_jokes(config)?;
    let knowledge = wikipedia_client(config)?;
    let speech = SystemSpeech::new(config.backend);

    info!(
        backend = ?config.backend,
        voice = %config.voice(),
        rate = config.rate,
        wikipedia = %knowledge.base_url(),
        "Session configured"
    );

    let deps = SessionDeps {
        speech: Arc::new(speech),
        knowledge: Arc::new(knowledge),
        jokes: Arc::new(jokes),
    };
    Ok(Session::new(
        deps,
        VoiceSettings {
            voice: config.voice().to_string(),
            rate: config.rate,
        },
    ))
}
