//! Tavily search API response models.

use serde::{Deserialize, Serialize};

/// A single search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Page title.
    #[serde(default)]
    pub title: Option<String>,

    /// Page URL.
    pub url: String,

    /// Extracted page content relevant to the query.
    #[serde(default)]
    pub content: Option<String>,

    /// Relevance score (0.0 - 1.0).
    #[serde(default)]
    pub score: Option<f64>,
}

impl SearchResultItem {
    /// Title, or a placeholder when the API omits it.
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// Response from the Tavily `/search` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Echo of the query.
    #[serde(default)]
    pub query: Option<String>,

    /// AI-generated answer summary, when requested.
    #[serde(default)]
    pub answer: Option<String>,

    /// Search hits.
    #[serde(default)]
    pub results: Vec<SearchResultItem>,

    /// Upstream processing time in seconds.
    #[serde(default)]
    pub response_time: Option<f64>,
}
