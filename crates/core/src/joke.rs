//! Joke Corpus
//!
//! The static list of jokes the assistant can tell. The corpus is loaded once
//! at startup and never changes afterwards; only the `text` field of each
//! record is ever spoken.

use rand::Rng;
use serde::Deserialize;
use std::path::Path;

/// Errors raised while loading a joke corpus.
///
/// Every variant is a configuration problem and is fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Joke corpus is empty")]
    Empty,
    #[error("Joke #{index} has no text")]
    BlankJoke { index: usize },
    #[error("Failed to read joke corpus {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed joke corpus: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single joke record.
///
/// Corpus files may carry any number of extra fields (ids, categories...);
/// they are kept in `extra` but never interpreted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Joke {
    pub text: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Joke {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// An immutable, non-empty, ordered list of jokes.
#[derive(Debug, Clone)]
pub struct JokeCorpus {
    jokes: Vec<Joke>,
}

impl JokeCorpus {
    /// Builds a corpus from already parsed records. Every joke must have
    /// something to say.
    pub fn new(jokes: Vec<Joke>) -> Result<Self, CorpusError> {
        if jokes.is_empty() {
            return Err(CorpusError::Empty);
        }
        if let Some(index) = jokes.iter().position(|joke| joke.text.trim().is_empty()) {
            return Err(CorpusError::BlankJoke { index });
        }
        Ok(Self { jokes })
    }

    /// Parses a JSON array of joke records.
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let jokes: Vec<Joke> = serde_json::from_str(json)?;
        Self::new(jokes)
    }

    /// Reads and parses a JSON corpus file.
    pub fn from_path(path: &Path) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.jokes.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.jokes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Joke> {
        self.jokes.get(index)
    }

    /// Picks one joke uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &Joke {
        // The constructor guarantees at least one joke.
        let index = select_index(self.jokes.len(), rng).unwrap_or(0);
        &self.jokes[index]
    }
}

/// Draws an index uniformly from `[0, n)`.
///
/// Returns `None` for an empty range instead of panicking.
pub fn select_index<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Option<usize> {
    if n == 0 {
        return None;
    }
    Some(rng.random_range(0..n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;

    #[test]
    fn test_from_json_keeps_order_and_extra_fields() {
        let json = r#"[
            {"id": 1, "text": "first", "category": "pun"},
            {"text": "second"}
        ]"#;

        let corpus = JokeCorpus::from_json(json).expect("corpus should parse");

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get(0).unwrap().text, "first");
        assert_eq!(corpus.get(1).unwrap().text, "second");
        assert_eq!(
            corpus.get(0).unwrap().extra.get("category"),
            Some(&serde_json::json!("pun"))
        );
        assert!(corpus.get(2).is_none());
    }

    #[test]
    fn test_empty_corpus_is_a_configuration_error() {
        let err = JokeCorpus::from_json("[]").unwrap_err();
        assert!(matches!(err, CorpusError::Empty));
        assert_eq!(err.to_string(), "Joke corpus is empty");

        assert!(matches!(JokeCorpus::new(vec![]), Err(CorpusError::Empty)));
    }

    #[test]
    fn test_blank_jokes_are_rejected() {
        let err = JokeCorpus::from_json(r#"[{"text": "fine"}, {"text": "   "}]"#).unwrap_err();
        assert!(matches!(err, CorpusError::BlankJoke { index: 1 }));
        assert_eq!(err.to_string(), "Joke #1 has no text");

        assert!(matches!(
            JokeCorpus::new(vec![Joke::new("")]),
            Err(CorpusError::BlankJoke { index: 0 })
        ));
    }

    #[test]
    fn test_records_without_text_are_rejected() {
        let err = JokeCorpus::from_json(r#"[{"body": "no text field"}]"#).unwrap_err();
        assert!(matches!(err, CorpusError::Parse(_)));
    }

    #[test]
    fn test_from_path() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, r#"[{{"text": "from disk"}}]"#)?;

        let corpus = JokeCorpus::from_path(file.path())?;
        assert_eq!(corpus.get(0).unwrap().text, "from disk");

        let missing = JokeCorpus::from_path(Path::new("definitely/not/here.json"));
        assert!(matches!(missing, Err(CorpusError::Io { .. })));
        Ok(())
    }

    #[test]
    fn test_select_index_guards_empty_range() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select_index(0, &mut rng), None);
        assert_eq!(select_index(1, &mut rng), Some(0));
    }

    #[test]
    fn test_select_index_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 5;
        let trials = 50_000;
        let mut counts = vec![0usize; n];

        for _ in 0..trials {
            let index = select_index(n, &mut rng).unwrap();
            assert!(index < n);
            counts[index] += 1;
        }

        let expected = trials / n;
        for (index, count) in counts.iter().enumerate() {
            let deviation = (*count as f64 - expected as f64).abs() / expected as f64;
            assert!(
                deviation < 0.05,
                "index {index} drawn {count} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn test_pick_returns_a_corpus_member() {
        let corpus = JokeCorpus::new(vec![Joke::new("a"), Joke::new("b"), Joke::new("c")]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            let joke = corpus.pick(&mut rng);
            assert!(["a", "b", "c"].contains(&joke.text.as_str()));
        }
    }
}
