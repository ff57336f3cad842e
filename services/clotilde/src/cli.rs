use crate::voice::SpeechBackend;
use clap::Parser;
use std::path::PathBuf;

/// Ask Clotilde something: she tells jokes and reads you Wikipedia.
///
/// Type `stop` or close the input (Ctrl+D) to leave.
#[derive(Parser, Debug, Default)]
#[command(name = "clotilde", version, about)]
pub struct Cli {
    /// Voice passed to the speech program (overrides CLOTILDE_VOICE)
    #[arg(long)]
    pub voice: Option<String>,

    /// Speech speed multiplier, 1.0 being normal (overrides CLOTILDE_RATE)
    #[arg(long)]
    pub rate: Option<f32>,

    /// Speech program to use (overrides CLOTILDE_SPEECH_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<SpeechBackend>,

    /// JSON joke corpus to use instead of the bundled one
    #[arg(long)]
    pub jokes: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "clotilde", "--voice", "Thomas", "--rate", "1.1", "--backend", "text", "--jokes",
            "j.json",
        ]);
        assert_eq!(cli.voice.as_deref(), Some("Thomas"));
        assert_eq!(cli.rate, Some(1.1));
        assert_eq!(cli.backend, Some(SpeechBackend::Text));
        assert_eq!(cli.jokes, Some(PathBuf::from("j.json")));
    }

    #[test]
    fn test_no_flags() {
        let cli = Cli::parse_from(["clotilde"]);
        assert!(cli.voice.is_none() && cli.rate.is_none() && cli.backend.is_none());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["clotilde", "--backend", "festival"]).is_err());
    }
}
