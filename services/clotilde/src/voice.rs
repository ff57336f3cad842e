//! System Speech Engine
//!
//! Speaks through the text-to-speech program installed on the machine: `say`
//! on macOS, `espeak` elsewhere. A `text` backend prints utterances instead,
//! for terminals without audio.

use async_trait::async_trait;
use clotilde_core::speech::{SpeechEngine, SpeechError};
use std::process::Stdio;
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::debug;

/// Words per minute at a rate multiplier of `1.0`.
pub const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Which program turns text into sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SpeechBackend {
    /// macOS `say`.
    Say,
    /// `espeak` (Linux and friends).
    Espeak,
    /// Print utterances to stdout instead of speaking them.
    Text,
}

impl SpeechBackend {
    /// The platform's native backend.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            SpeechBackend::Say
        } else {
            SpeechBackend::Espeak
        }
    }

    /// A voice that exists for this backend out of the box.
    pub fn default_voice(&self) -> &'static str {
        match self {
            SpeechBackend::Say | SpeechBackend::Text => "Samantha",
            SpeechBackend::Espeak => "en",
        }
    }

    /// The program to spawn, or `None` for the text backend.
    pub fn program(&self) -> Option<&'static str> {
        match self {
            SpeechBackend::Say => Some("say"),
            SpeechBackend::Espeak => Some("espeak"),
            SpeechBackend::Text => None,
        }
    }

    /// Command-line arguments for one utterance. The text itself is written
    /// to the program's stdin so it can never be mistaken for a flag.
    pub fn args(&self, voice: &str, rate: f32) -> Vec<String> {
        let wpm = words_per_minute(rate).to_string();
        match self {
            SpeechBackend::Say => vec![
                "-v".into(),
                voice.into(),
                "-r".into(),
                wpm,
                "-f".into(),
                "-".into(),
            ],
            SpeechBackend::Espeak => vec![
                "-v".into(),
                voice.into(),
                "-s".into(),
                wpm,
                "--stdin".into(),
            ],
            SpeechBackend::Text => vec![],
        }
    }
}

impl FromStr for SpeechBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "say" => Ok(SpeechBackend::Say),
            "espeak" => Ok(SpeechBackend::Espeak),
            "text" => Ok(SpeechBackend::Text),
            other => Err(format!(
                "'{other}' is not a speech backend (expected say, espeak or text)"
            )),
        }
    }
}

/// Converts a speed multiplier into the words-per-minute both programs expect.
pub fn words_per_minute(rate: f32) -> u32 {
    (rate * BASE_WORDS_PER_MINUTE).ceil().max(1.0) as u32
}

/// A [`SpeechEngine`] backed by an external program.
///
/// One child process per utterance. [`SpeechEngine::stop`] kills whichever
/// child is currently playing.
pub struct SystemSpeech {
    backend: SpeechBackend,
    custom: Option<(String, Vec<String>)>,
    interrupt: Notify,
}

impl SystemSpeech {
    pub fn new(backend: SpeechBackend) -> Self {
        Self {
            backend,
            custom: None,
            interrupt: Notify::new(),
        }
    }

    /// Speaks through an arbitrary program that reads the text on stdin.
    /// Voice and rate are not passed to it.
    pub fn with_command(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            custom: Some((
                program.into(),
                args.iter().map(|arg| arg.to_string()).collect(),
            )),
            ..Self::new(SpeechBackend::Say)
        }
    }

    pub fn backend(&self) -> SpeechBackend {
        self.backend
    }

    async fn print(&self, text: &str) -> Result<(), SpeechError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}: {text}\n", clotilde_core::session::ASSISTANT_NAME).as_bytes())
            .await?;
        stdout.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SpeechEngine for SystemSpeech {
    async fn speak(&self, text: &str, voice: &str, rate: f32) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        let (program, args) = match &self.custom {
            Some((program, args)) => (program.as_str(), args.clone()),
            None => match self.backend.program() {
                Some(program) => (program, self.backend.args(voice, rate)),
                None => return self.print(text).await,
            },
        };

        // Register for interrupts before the child exists so a stop issued
        // while spawning is not lost.
        let interrupted = self.interrupt.notified();
        tokio::pin!(interrupted);
        interrupted.as_mut().enable();

        debug!(program, ?args, "Spawning speech program");
        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(SpeechError::Failed {
                        program: program.to_string(),
                        status: status.to_string(),
                    })
                }
            }
            _ = &mut interrupted => {
                debug!(program, "Interrupting speech program");
                let _ = child.kill().await;
                Err(SpeechError::Interrupted)
            }
        }
    }

    fn stop(&self) {
        self.interrupt.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_words_per_minute() {
        assert_eq!(words_per_minute(1.0), 175);
        // 0.9 * 175 = 157.5, rounded up.
        assert_eq!(words_per_minute(0.9), 158);
        assert_eq!(words_per_minute(0.0), 1);
    }

    #[test]
    fn test_say_args() {
        assert_eq!(
            SpeechBackend::Say.args("Samantha", 0.9),
            vec!["-v", "Samantha", "-r", "158", "-f", "-"]
        );
    }

    #[test]
    fn test_espeak_args() {
        assert_eq!(
            SpeechBackend::Espeak.args("en", 1.0),
            vec!["-v", "en", "-s", "175", "--stdin"]
        );
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("say".parse::<SpeechBackend>(), Ok(SpeechBackend::Say));
        assert_eq!("ESPEAK".parse::<SpeechBackend>(), Ok(SpeechBackend::Espeak));
        assert_eq!("text".parse::<SpeechBackend>(), Ok(SpeechBackend::Text));
        assert!("festival".parse::<SpeechBackend>().is_err());
    }

    #[test]
    fn test_text_backend_spawns_nothing() {
        assert_eq!(SpeechBackend::Text.program(), None);
        assert!(SpeechBackend::Text.args("Samantha", 1.0).is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let speech = SystemSpeech::new(SpeechBackend::Text);
        let err = speech.speak("  ", "Samantha", 1.0).await.unwrap_err();
        assert!(matches!(err, SpeechError::EmptyText));
    }

    #[tokio::test]
    async fn test_text_backend_speaks() {
        let speech = SystemSpeech::new(SpeechBackend::Text);
        assert!(speech.speak("Hello", "Samantha", 1.0).await.is_ok());
        // Stopping with nothing playing is a no-op.
        speech.stop();
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let speech = SystemSpeech::with_command("clotilde-no-such-speech-program", &[]);
        let err = speech.speak("Hello", "Samantha", 1.0).await.unwrap_err();
        assert!(
            matches!(err, SpeechError::Spawn { program, .. } if program == "clotilde-no-such-speech-program")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_speak_waits_for_the_program() {
        let speech = SystemSpeech::with_command("cat", &[]);
        assert!(speech.speak("Hello", "Samantha", 1.0).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_interrupts_playback() {
        let speech = Arc::new(SystemSpeech::with_command("sleep", &["30"]));
        let playing = {
            let speech = speech.clone();
            tokio::spawn(async move { speech.speak("A very long story", "Samantha", 1.0).await })
        };

        // `stop` only reaches an utterance that is already playing.
        for _ in 0..100 {
            if playing.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            speech.stop();
        }

        let result = tokio::time::timeout(Duration::from_secs(5), playing)
            .await
            .expect("speech should end once stopped")
            .unwrap();
        assert!(matches!(result, Err(SpeechError::Interrupted)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_with_nothing_playing_does_not_affect_the_next_utterance() {
        let speech = SystemSpeech::with_command("cat", &[]);
        speech.stop();
        assert!(speech.speak("Hello", "Samantha", 1.0).await.is_ok());
    }
}
