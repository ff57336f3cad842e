//! Knowledge Base Lookup
//!
//! This module defines the contract for the encyclopedia the assistant reads
//! from and the two-stage "search, then summarize" lookup built on top of it.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

/// Failures of any knowledge-base stage.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("No results found for '{0}'")]
    NoResults(String),
    #[error("Page '{0}' does not exist")]
    NotFound(String),
    #[error("'{0}' is a disambiguation page")]
    Disambiguation(String),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// One candidate returned by a search, best match first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
}

/// A resolved article. `title` is the canonical title after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub page_id: u64,
}

/// The short summary of an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub extract: String,
    /// Article kind as reported by the service (e.g. `standard`).
    pub kind: String,
}

/// Defines the contract for an encyclopedia the assistant can query.
///
/// Implementations must not cache: asking twice performs two lookups.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Full-text search. An empty list is a valid answer.
    async fn search(&self, topic: &str) -> Result<Vec<SearchResult>, LookupError>;

    /// Resolves a title to a page, following redirects.
    async fn page(&self, title: &str) -> Result<Page, LookupError>;

    /// Fetches the summary for a resolved page.
    async fn summary(&self, page: &Page) -> Result<Summary, LookupError>;
}

/// Looks up `topic` and returns the extract of the best matching article.
///
/// The search results are never assumed to be non-empty: an empty list, or a
/// blank topic, fails with [`LookupError::NoResults`].
pub async fn fetch_summary(
    knowledge: &dyn KnowledgeBase,
    topic: &str,
) -> Result<String, LookupError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(LookupError::NoResults(String::new()));
    }

    let results = knowledge.search(topic).await?;
    let best = results
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::NoResults(topic.to_string()))?;
    debug!(topic, title = %best.title, "Resolved best search candidate");

    let page = knowledge.page(&best.title).await?;
    let summary = knowledge.summary(&page).await?;
    Ok(summary.extract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn page(title: &str) -> Page {
        Page {
            title: title.to_string(),
            page_id: 736,
        }
    }

    fn summary(title: &str, extract: &str) -> Summary {
        Summary {
            title: title.to_string(),
            extract: extract.to_string(),
            kind: "standard".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_summary_uses_first_candidate() {
        let mut kb = MockKnowledgeBase::new();
        let mut seq = Sequence::new();

        kb.expect_search()
            .withf(|topic| topic == "Albert Einstein")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![
                    SearchResult { title: "Albert Einstein".into() },
                    SearchResult { title: "Einstein family".into() },
                ])
            });
        kb.expect_page()
            .withf(|title| title == "Albert Einstein")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|title| Ok(page(title)));
        kb.expect_summary()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|p| Ok(summary(&p.title, "Albert Einstein was a physicist.")));

        let extract = fetch_summary(&kb, "Albert Einstein").await.unwrap();
        assert_eq!(extract, "Albert Einstein was a physicist.");
    }

    #[tokio::test]
    async fn test_fetch_summary_empty_results() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_search().times(1).returning(|_| Ok(vec![]));
        kb.expect_page().never();
        kb.expect_summary().never();

        let err = fetch_summary(&kb, "qwxzzy").await.unwrap_err();
        match err {
            LookupError::NoResults(topic) => assert_eq!(topic, "qwxzzy"),
            other => panic!("Expected NoResults, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_summary_blank_topic_skips_network() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_search().never();

        let err = fetch_summary(&kb, "   ").await.unwrap_err();
        assert!(matches!(err, LookupError::NoResults(_)));
    }

    #[tokio::test]
    async fn test_fetch_summary_propagates_page_failure() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_search()
            .returning(|_| Ok(vec![SearchResult { title: "Gone".into() }]));
        kb.expect_page()
            .returning(|title| Err(LookupError::NotFound(title.to_string())));
        kb.expect_summary().never();

        let err = fetch_summary(&kb, "gone").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound(t) if t == "Gone"));
    }

    #[tokio::test]
    async fn test_fetch_summary_propagates_summary_failure() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_search()
            .returning(|_| Ok(vec![SearchResult { title: "Mercury".into() }]));
        kb.expect_page().returning(|title| Ok(page(title)));
        kb.expect_summary()
            .returning(|p| Err(LookupError::Disambiguation(p.title.clone())));

        let err = fetch_summary(&kb, "mercury").await.unwrap_err();
        assert_eq!(err.to_string(), "'Mercury' is a disambiguation page");
    }

    #[tokio::test]
    async fn test_fetch_summary_is_repeatable_without_caching() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_search()
            .times(2)
            .returning(|_| Ok(vec![SearchResult { title: "Rust".into() }]));
        kb.expect_page().times(2).returning(|title| Ok(page(title)));
        kb.expect_summary()
            .times(2)
            .returning(|p| Ok(summary(&p.title, "Rust is a language.")));

        let first = fetch_summary(&kb, "Rust").await.unwrap();
        let second = fetch_summary(&kb, "Rust").await.unwrap();
        assert_eq!(first, second);
    }
}
