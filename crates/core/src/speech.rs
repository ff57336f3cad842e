//! Speech Output
//!
//! Defines the contract for the text-to-speech engine the assistant talks
//! through. Engines live outside the core; the session only needs to await an
//! utterance and to be able to interrupt playback.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Failures reported by a speech engine.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Nothing to say")]
    EmptyText,
    #[error("Failed to start speech program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Speech program '{program}' exited with {status}")]
    Failed { program: String, status: String },
    #[error("Speech was interrupted")]
    Interrupted,
    #[error("Failed to emit speech: {0}")]
    Output(#[from] std::io::Error),
}

/// Voice parameters applied to every utterance of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    /// Engine-specific voice identifier (e.g. `Samantha`).
    pub voice: String,
    /// Speed multiplier, `1.0` being the engine's normal rate.
    pub rate: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: "Samantha".to_string(),
            rate: 0.9,
        }
    }
}

/// Defines the contract for a text-to-speech engine.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speaks `text` and resolves once playback has finished or failed.
    async fn speak(&self, text: &str, voice: &str, rate: f32) -> Result<(), SpeechError>;

    /// Interrupts any in-flight utterance. Best effort, never blocks.
    fn stop(&self);
}
