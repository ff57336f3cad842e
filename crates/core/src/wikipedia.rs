//! Wikipedia Knowledge Base
//!
//! A [`KnowledgeBase`] backed by the public Wikipedia APIs. Search and page
//! resolution go through the MediaWiki action API; summaries come from the
//! REST `page/summary` endpoint.

use crate::knowledge::{KnowledgeBase, LookupError, Page, SearchResult, Summary};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Number of candidates requested per search.
pub const SEARCH_LIMIT: u32 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!(
    "clotilde/",
    env!("CARGO_PKG_VERSION"),
    " (voice question-answering toy)"
);

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct ActionResponse<T> {
    query: Option<T>,
    error: Option<ActionError>,
}

#[derive(Debug, Deserialize)]
struct ActionError {
    code: String,
    info: String,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    title: String,
    pageid: Option<u64>,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    disambiguation: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RestSummary {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    #[serde(default)]
    extract: String,
}

// --- Client ---

/// A client for one Wikipedia language edition.
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    client: Client,
    base_url: Url,
}

impl WikipediaClient {
    /// Creates a client for an arbitrary base URL (e.g. `https://en.wikipedia.org`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LookupError::Malformed(format!("invalid base URL '{base_url}': {e}")))?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Creates a client for `https://{language}.wikipedia.org`.
    pub fn for_language(language: &str, timeout: Duration) -> Result<Self, LookupError> {
        Self::new(&format!("https://{language}.wikipedia.org"), timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::Malformed(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, LookupError> {
        debug!(%url, ?query, "GET");
        let response = self.client.get(url.clone()).query(query).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LookupError::Malformed(e.to_string()))
    }

    async fn action_query<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, LookupError> {
        let mut query = vec![("action", "query"), ("format", "json"), ("formatversion", "2")];
        query.extend_from_slice(params);

        let url = self.endpoint(&["w", "api.php"])?;
        let response: ActionResponse<T> = self.get_json(url, &query).await?;
        if let Some(error) = response.error {
            return Err(LookupError::Malformed(format!("{}: {}", error.code, error.info)));
        }
        response
            .query
            .ok_or_else(|| LookupError::Malformed("response has no 'query' object".to_string()))
    }
}

#[async_trait]
impl KnowledgeBase for WikipediaClient {
    async fn search(&self, topic: &str) -> Result<Vec<SearchResult>, LookupError> {
        let limit = SEARCH_LIMIT.to_string();
        let query: SearchQuery = self
            .action_query(&[
                ("list", "search"),
                ("srsearch", topic),
                ("srlimit", limit.as_str()),
                ("srprop", ""),
            ])
            .await?;

        Ok(query
            .search
            .into_iter()
            .map(|hit| SearchResult { title: hit.title })
            .collect())
    }

    async fn page(&self, title: &str) -> Result<Page, LookupError> {
        let query: PagesQuery = self
            .action_query(&[
                ("prop", "info|pageprops"),
                ("ppprop", "disambiguation"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        let info = query
            .pages
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(title.to_string()))?;
        if info.missing || info.invalid {
            return Err(LookupError::NotFound(title.to_string()));
        }
        if info
            .pageprops
            .as_ref()
            .is_some_and(|props| props.disambiguation.is_some())
        {
            return Err(LookupError::Disambiguation(info.title));
        }
        let page_id = info
            .pageid
            .ok_or_else(|| LookupError::Malformed(format!("page '{}' has no id", info.title)))?;

        Ok(Page {
            title: info.title,
            page_id,
        })
    }

    async fn summary(&self, page: &Page) -> Result<Summary, LookupError> {
        let slug = page.title.replace(' ', "_");
        let url = self.endpoint(&["api", "rest_v1", "page", "summary", slug.as_str()])?;
        let summary: RestSummary = match self.get_json::<RestSummary>(url, &[]).await {
            Err(LookupError::NotFound(_)) => return Err(LookupError::NotFound(page.title.clone())),
            other => other?,
        };

        if summary.kind == "disambiguation" {
            return Err(LookupError::Disambiguation(summary.title));
        }
        if summary.extract.trim().is_empty() {
            return Err(LookupError::Malformed(format!(
                "summary for '{}' has no extract",
                summary.title
            )));
        }

        Ok(Summary {
            title: summary.title,
            extract: summary.extract,
            kind: summary.kind,
        })
    }
}
