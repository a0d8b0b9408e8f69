//! Typesense multi-search wire shapes and HTTP transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::search_result::FacetStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMultiSearchRequest {
    pub searches: Vec<RawSearchParams>,
}

/// One entry of the batched request body. Field names follow the engine's
/// parameter names exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSearchParams {
    pub collection: String,
    pub q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_facet_values: Option<u32>,
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_start_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_end_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMultiSearchResponse {
    pub results: Vec<RawSearchResult>,
}

/// One per-collection result, in request order. A per-collection fault shows
/// up as `error`/`code` on this shape while the sibling entries stay intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawSearchResult {
    pub found: u64,
    pub out_of: u64,
    pub page: u32,
    pub hits: Vec<RawHit>,
    pub facet_counts: Vec<RawFacetCount>,
    pub search_time_ms: u64,
    pub error: Option<String>,
    pub code: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawHit {
    pub document: serde_json::Value,
    pub highlights: Vec<RawHighlight>,
    pub text_match: Option<u64>,
    pub text_match_info: Option<RawTextMatchInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawHighlight {
    pub field: String,
    pub snippet: Option<String>,
    pub snippets: Vec<String>,
    pub matched_tokens: Vec<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawTextMatchInfo {
    pub best_field_score: String,
    pub best_field_weight: u64,
    pub fields_matched: u64,
    pub score: String,
    pub tokens_matched: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawFacetCount {
    pub field_name: String,
    pub counts: Vec<RawFacetCountEntry>,
    pub stats: Option<FacetStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawFacetCountEntry {
    /// The engine sends strings for string facets and numbers for numeric
    /// ones; stringified during normalization.
    pub value: serde_json::Value,
    pub count: u64,
    pub highlighted: String,
}

/// The one suspending operation of the subsystem: a single batched POST.
/// Timeouts and retries are the transport's own business; failures surface
/// unchanged to the dispatcher.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn multi_search(&self, request: &RawMultiSearchRequest) -> anyhow::Result<RawMultiSearchResponse>;
}

pub struct HttpSearchTransport {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpSearchTransport {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        HttpSearchTransport {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TYPESENSE_URL").unwrap_or("http://127.0.0.1:8108".to_string());
        let api_key = std::env::var("TYPESENSE_API_KEY").ok();
        Self::new(base_url, api_key)
    }
}

#[async_trait]
impl SearchTransport for HttpSearchTransport {
    async fn multi_search(&self, request: &RawMultiSearchRequest) -> anyhow::Result<RawMultiSearchResponse> {
        let url = format!("{}/multi_search", self.base_url);
        let mut http_request = self.client.post(url).json(request);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("X-TYPESENSE-API-KEY", api_key);
        }
        let response = http_request.send().await?;
        let status = response.status();
        let response_txt = response.text().await?;
        if status.is_client_error() || status.is_server_error() {
            anyhow::bail!("Error: {}: {}", status, response_txt);
        }
        tracing::debug!("multi_search response: len = {}", response_txt.len());
        let response: RawMultiSearchResponse = serde_json::from_str(&response_txt)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_one_search() -> RawMultiSearchRequest {
        RawMultiSearchRequest {
            searches: vec![RawSearchParams {
                collection: "articles".to_string(),
                q: "*".to_string(),
                query_by: None,
                filter_by: None,
                sort_by: None,
                facet_by: None,
                max_facet_values: None,
                page: 1,
                per_page: 10,
                highlight_start_tag: None,
                highlight_end_tag: None,
            }],
        }
    }

    #[tokio::test]
    async fn posts_batch_and_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/multi_search")
            .match_header("x-typesense-api-key", "test-key")
            .with_status(200)
            .with_body(
                r#"{"results":[{"found":2,"out_of":10,"page":1,"hits":[],"facet_counts":[],"search_time_ms":3}]}"#,
            )
            .create_async()
            .await;

        let transport = HttpSearchTransport::new(server.url(), Some("test-key".to_string()));
        let response = transport.multi_search(&request_with_one_search()).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].found, 2);
        assert_eq!(response.results[0].search_time_ms, 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/multi_search")
            .with_status(503)
            .with_body("engine unavailable")
            .create_async()
            .await;

        let transport = HttpSearchTransport::new(server.url(), None);
        let err = transport.multi_search(&request_with_one_search()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("engine unavailable"));
    }

    #[test]
    fn optional_params_are_omitted_from_the_body() {
        let body = serde_json::to_string(&request_with_one_search()).unwrap();
        assert!(!body.contains("filter_by"));
        assert!(!body.contains("sort_by"));
        assert!(body.contains("\"per_page\":10"));
    }
}
