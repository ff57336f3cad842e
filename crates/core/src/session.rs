//! Interactive Session Loop
//!
//! Drives one conversation: ask the user's name, greet them, then answer one
//! typed query per turn with exactly one spoken reply until the user types
//! `stop`, the input stream ends or a shutdown signal arrives. Turns are
//! strictly sequential; a turn is complete only once its reply has finished
//! playing.

use crate::joke::JokeCorpus;
use crate::knowledge::{KnowledgeBase, fetch_summary};
use crate::speech::{SpeechEngine, VoiceSettings};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{debug, info, instrument, warn};

pub const ASSISTANT_NAME: &str = "Clotilde";
pub const NAME_PROMPT: &str = "What is your name ? ";
pub const QUERY_PROMPT: &str = "ask me something: ";
pub const STOP_COMMAND: &str = "stop";
pub const JOKE_KEYWORD: &str = "joke";
pub const FAREWELL_LINE: &str = "\nBYE BYE !!!";
pub const FAREWELL_SPEECH: &str = "Bye Bye";

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingName,
    Greeting,
    AwaitingQuery,
    Dispatching,
    Joking,
    Searching,
    Closing,
    Terminated,
}

/// What a query line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Stop,
    Joke,
    Search(String),
}

/// Classifies one input line.
///
/// `stop` must match exactly (case-sensitive). Otherwise any whitespace
/// separated token equal to `joke`, ignoring case, asks for a joke; every
/// other line is a search topic, passed through untouched.
pub fn classify(line: &str) -> Intent {
    if line == STOP_COMMAND {
        return Intent::Stop;
    }
    let lowered = line.to_lowercase();
    if lowered.split_whitespace().any(|token| token == JOKE_KEYWORD) {
        Intent::Joke
    } else {
        Intent::Search(line.to_string())
    }
}

/// Everything the assistant can say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Greeting { name: String },
    Joke(String),
    Summary(String),
    Apology { query: String },
    Farewell,
}

impl Reply {
    /// The exact text handed to the speech engine.
    pub fn text(&self) -> String {
        match self {
            Reply::Greeting { name } => format!("Hello {name}, my name is {ASSISTANT_NAME}"),
            Reply::Joke(text) => text.clone(),
            Reply::Summary(extract) => format!("According to wikipedia, {extract}"),
            Reply::Apology { query } => format!("Sorry, I couldn't find anything about {query}"),
            Reply::Farewell => FAREWELL_SPEECH.to_string(),
        }
    }
}

/// Why a session ended. All are normal terminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The user typed the stop command.
    Stopped,
    /// The input stream ended.
    InputClosed,
    /// The shutdown future resolved (Ctrl+C in the binary).
    Interrupted,
}

/// The collaborators a session talks to.
#[derive(Clone)]
pub struct SessionDeps {
    pub speech: Arc<dyn SpeechEngine>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub jokes: Arc<JokeCorpus>,
}

/// One interactive conversation. Owns its state; nothing is global.
pub struct Session {
    deps: SessionDeps,
    voice: VoiceSettings,
    rng: StdRng,
    state: SessionState,
    user_name: Option<String>,
}

impl Session {
    pub fn new(deps: SessionDeps, voice: VoiceSettings) -> Self {
        Self {
            deps,
            voice,
            rng: StdRng::from_os_rng(),
            state: SessionState::AwaitingName,
            user_name: None,
        }
    }

    /// Replaces the joke selection RNG, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Runs the conversation to completion.
    ///
    /// Collaborator failures never end the session. Only a failure to write
    /// to `writer` is returned as an error.
    pub async fn run<R, W>(&mut self, reader: R, writer: W) -> Result<SessionOutcome>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.run_until(reader, writer, std::future::pending()).await
    }

    /// Like [`Session::run`], but ends the conversation early once `shutdown`
    /// resolves. A pending prompt or turn is abandoned and the farewell is
    /// still given.
    #[instrument(name = "session", skip_all)]
    pub async fn run_until<R, W, S>(
        &mut self,
        reader: R,
        mut writer: W,
        shutdown: S,
    ) -> Result<SessionOutcome>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        self.transition(SessionState::AwaitingName);
        let name = tokio::select! {
            biased;
            _ = shutdown.as_mut() => Err(SessionOutcome::Interrupted),
            name = self.prompt(&mut lines, &mut writer, NAME_PROMPT) => {
                name?.ok_or(SessionOutcome::InputClosed)
            }
        };
        let outcome = match name {
            Err(outcome) => outcome,
            Ok(name) => {
                self.user_name = Some(name.clone());
                self.transition(SessionState::Greeting);
                self.say(&Reply::Greeting { name }).await;
                self.converse(&mut lines, &mut writer, shutdown.as_mut())
                    .await?
            }
        };

        if outcome != SessionOutcome::InputClosed {
            self.transition(SessionState::Closing);
            self.deps.speech.stop();
        }
        drop(lines);

        self.transition(SessionState::Terminated);
        writer
            .write_all(format!("{FAREWELL_LINE}\n").as_bytes())
            .await
            .context("Failed to write farewell")?;
        writer.flush().await.context("Failed to flush output")?;
        self.say(&Reply::Farewell).await;

        info!(?outcome, "Session finished");
        Ok(outcome)
    }

    /// Handles one classified query and returns the reply to speak.
    ///
    /// Returns `None` for [`Intent::Stop`], which has no reply of its own.
    pub async fn respond(&mut self, intent: Intent) -> Option<Reply> {
        match intent {
            Intent::Stop => None,
            Intent::Joke => {
                self.transition(SessionState::Joking);
                let joke = self.deps.jokes.pick(&mut self.rng);
                Some(Reply::Joke(joke.text.clone()))
            }
            Intent::Search(query) => {
                self.transition(SessionState::Searching);
                match fetch_summary(self.deps.knowledge.as_ref(), &query).await {
                    Ok(extract) => Some(Reply::Summary(extract)),
                    Err(e) => {
                        warn!(%query, error = %e, "Lookup failed");
                        Some(Reply::Apology { query })
                    }
                }
            }
        }
    }

    async fn converse<R, W, S>(
        &mut self,
        lines: &mut Lines<R>,
        writer: &mut W,
        mut shutdown: Pin<&mut S>,
    ) -> Result<SessionOutcome>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        loop {
            self.transition(SessionState::AwaitingQuery);
            let line = tokio::select! {
                biased;
                _ = shutdown.as_mut() => return Ok(SessionOutcome::Interrupted),
                line = self.prompt(lines, writer, QUERY_PROMPT) => line?,
            };
            let Some(line) = line else {
                return Ok(SessionOutcome::InputClosed);
            };

            self.transition(SessionState::Dispatching);
            let intent = classify(&line);
            if intent == Intent::Stop {
                return Ok(SessionOutcome::Stopped);
            }
            tokio::select! {
                biased;
                _ = shutdown.as_mut() => return Ok(SessionOutcome::Interrupted),
                _ = self.turn(intent) => {}
            }
        }
    }

    /// Answers one non-stop intent with exactly one utterance.
    async fn turn(&mut self, intent: Intent) {
        if let Some(reply) = self.respond(intent).await {
            self.say(&reply).await;
        }
    }

    /// Writes `prompt` and waits for one line. `None` means the input is gone.
    async fn prompt<R, W>(
        &self,
        lines: &mut Lines<R>,
        writer: &mut W,
        prompt: &str,
    ) -> Result<Option<String>>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        writer
            .write_all(prompt.as_bytes())
            .await
            .context("Failed to write prompt")?;
        writer.flush().await.context("Failed to flush output")?;

        match lines.next_line().await {
            Ok(line) => Ok(line),
            Err(e) => {
                warn!(error = %e, "Failed to read input, closing session");
                Ok(None)
            }
        }
    }

    /// Speaks a reply. Speech failures are logged and otherwise ignored.
    async fn say(&self, reply: &Reply) {
        let text = reply.text();
        debug!(%text, "Speaking");
        if let Err(e) = self
            .deps
            .speech
            .speak(&text, &self.voice.voice, self.voice.rate)
            .await
        {
            warn!(error = %e, "Speech failed, continuing");
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Session transition");
        self.state = next;
    }
}
