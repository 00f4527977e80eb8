//! Interfaces of the external services agents rely on.
//!
//! Both traits are implemented for async closures, so a test or a small
//! program can pass one directly:
//!
//! ```
//! use verdict_core::collaborator::{PageReader, SearchCandidate, Searcher};
//! use verdict_core::CollaboratorError;
//!
//! fn assert_searcher<S: Searcher>(_: &S) {}
//! fn assert_page_reader<R: PageReader>(_: &R) {}
//!
//! let searcher = |query: String| async move {
//!     Ok::<_, CollaboratorError>(vec![SearchCandidate::new(
//!         "https://example.com",
//!         query,
//!         "An example page.",
//!     )])
//! };
//! let reader = |_url: String| async { Ok::<_, CollaboratorError>(None) };
//! assert_searcher(&searcher);
//! assert_page_reader(&reader);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// One search engine result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Address of the page.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Snippet shown by the search engine.
    pub description: String,
}

impl SearchCandidate {
    /// Creates a search result.
    #[inline]
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// A web search engine.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Searches for `query`.
    ///
    /// "No results" is an empty list, not an error. Timeouts and retries are
    /// up to the implementation.
    async fn search(
        &self,
        query: &str,
    ) -> Result<Vec<SearchCandidate>, CollaboratorError>;
}

/// Fetches the readable text of a web page.
#[async_trait]
pub trait PageReader: Send + Sync {
    /// Reads the page at `url`.
    ///
    /// `Ok(None)` means the page could not be retrieved.
    async fn read(
        &self,
        url: &str,
    ) -> Result<Option<String>, CollaboratorError>;
}

#[async_trait]
impl<F, Fut> Searcher for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<SearchCandidate>, CollaboratorError>>
        + Send,
{
    async fn search(
        &self,
        query: &str,
    ) -> Result<Vec<SearchCandidate>, CollaboratorError> {
        self(query.to_owned()).await
    }
}

#[async_trait]
impl<F, Fut> PageReader for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, CollaboratorError>> + Send,
{
    async fn read(
        &self,
        url: &str,
    ) -> Result<Option<String>, CollaboratorError> {
        self(url.to_owned()).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_closures() {
        let searcher = |query: String| async move {
            if query.is_empty() {
                return Err(CollaboratorError::new("empty query"));
            }
            Ok(vec![SearchCandidate::new("https://a.b", query, "")])
        };
        let results = Searcher::search(&searcher, "rust").await.unwrap();
        assert_eq!(results[0].title, "rust");
        let err = Searcher::search(&searcher, "").await.unwrap_err();
        assert_eq!(err.message(), "empty query");

        let reader: Box<dyn PageReader> = Box::new(|url: String| async move {
            let page =
                url.starts_with("https://").then(|| "<p>Hi</p>".to_owned());
            Ok::<_, CollaboratorError>(page)
        });
        let page = reader.read("https://a.b").await.unwrap();
        assert_eq!(page.as_deref(), Some("<p>Hi</p>"));
        assert_eq!(reader.read("ftp://a.b").await.unwrap(), None);
    }

    #[test]
    fn test_candidate_wire_shape() {
        let candidate = SearchCandidate::new("https://a.b", "A", "About A");
        assert_eq!(
            serde_json::to_value(&candidate).unwrap(),
            json!({
                "url": "https://a.b",
                "title": "A",
                "description": "About A"
            })
        );
    }
}
