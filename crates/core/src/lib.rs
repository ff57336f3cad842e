//! Clotilde Core
//!
//! The collaborator contracts (speech, knowledge base), the joke corpus and
//! the interactive session loop of the Clotilde voice assistant. Concrete
//! speech engines and process wiring live in the service crate.

pub mod joke;
pub mod knowledge;
pub mod session;
pub mod speech;
pub mod wikipedia;

pub use joke::{CorpusError, Joke, JokeCorpus};
pub use knowledge::{KnowledgeBase, LookupError, fetch_summary};
pub use session::{Session, SessionDeps, SessionOutcome};
pub use speech::{SpeechEngine, SpeechError, VoiceSettings};
pub use wikipedia::WikipediaClient;
