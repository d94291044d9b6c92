//! Model-based extractor (AI): submits a bounded HTML prefix to a large
//! language model and post-processes its structured response. Failures
//! (provider error, malformed output) yield an empty list — this extractor
//! never propagates an error, matching the spec's `ParseFailure` absorption.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{Extractor, ParserKind};

/// Pragmatic bound to fit model context windows; part of the contract, kept
/// stable for deterministic testing.
pub const MODEL_HTML_PREFIX_CHARS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct ModelUrlResponse {
    pub urls: Vec<String>,
    #[allow(dead_code)]
    pub reasoning: String,
}

/// Thin seam over whatever LLM provider a deployment wires in. Kept as a
/// trait so the extractor is testable without a live model call, the same
/// way [`crate::storage::Storage`] is injected rather than a singleton.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn classify_urls(&self, html_prefix: &str, base_url: &str) -> anyhow::Result<ModelUrlResponse>;
}

const SYSTEM_PROMPT: &str = "You are a specialized web scraper assistant focused on e-commerce \
sites. Analyze the given HTML and return the product-detail URLs it links to, plus a brief \
reasoning for your selection. Respond as JSON matching {\"urls\": [...], \"reasoning\": \"...\"}.";

/// Calls an OpenAI-compatible chat-completions endpoint and expects the
/// provider to already emit `{urls, reasoning}` JSON — deployments that speak
/// a bare completions API put a translation layer in front of this client
/// rather than this crate growing one.
pub struct HttpModelClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpModelClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn classify_urls(&self, html_prefix: &str, base_url: &str) -> anyhow::Result<ModelUrlResponse> {
        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Base URL: {base_url}\n\nHTML content:\n{html_prefix}"
                    ),
                },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("model request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model provider returned {status}: {body}");
        }

        response
            .json::<ModelUrlResponse>()
            .await
            .map_err(|e| anyhow::anyhow!("model response did not match expected schema: {e}"))
    }
}

pub struct ModelExtractor {
    client: std::sync::Arc<dyn ModelClient>,
}

impl ModelExtractor {
    pub fn new(client: std::sync::Arc<dyn ModelClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Extractor for ModelExtractor {
    fn kind(&self) -> ParserKind {
        ParserKind::Ai
    }

    async fn parse(&self, html: &str, base_url: &str) -> Vec<String> {
        let prefix: String = html.chars().take(MODEL_HTML_PREFIX_CHARS).collect();

        let response = match self.client.classify_urls(&prefix, base_url).await {
            Ok(r) => r,
            Err(e) => {
                warn!(base_url, error = %e, "model extractor: provider call failed");
                return Vec::new();
            }
        };

        let Ok(base) = url::Url::parse(base_url) else {
            return Vec::new();
        };

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for raw in response.urls {
            if raw.trim().is_empty() {
                continue;
            }
            let absolute = match url::Url::parse(&raw) {
                Ok(u) => u.to_string(),
                Err(_) => match base.join(&raw) {
                    Ok(u) => u.to_string(),
                    Err(_) => continue,
                },
            };
            if seen.insert(absolute.clone()) {
                out.push(absolute);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClient {
        urls: Vec<String>,
    }

    #[async_trait]
    impl ModelClient for StubClient {
        async fn classify_urls(&self, _html_prefix: &str, _base_url: &str) -> anyhow::Result<ModelUrlResponse> {
            Ok(ModelUrlResponse {
                urls: self.urls.clone(),
                reasoning: "stub".to_string(),
            })
        }
    }

    struct FailingClient;

    #[async_trait]
    impl ModelClient for FailingClient {
        async fn classify_urls(&self, _html_prefix: &str, _base_url: &str) -> anyhow::Result<ModelUrlResponse> {
            anyhow::bail!("provider unavailable")
        }
    }

    #[tokio::test]
    async fn makes_relative_urls_absolute_and_dedupes() {
        let client = std::sync::Arc::new(StubClient {
            urls: vec![
                "/product/1".to_string(),
                "".to_string(),
                "/product/1".to_string(),
                "https://other.test/x".to_string(),
            ],
        });
        let extractor = ModelExtractor::new(client);
        let urls = extractor.parse("<html></html>", "https://example.com/").await;
        assert_eq!(
            urls,
            vec![
                "https://example.com/product/1".to_string(),
                "https://other.test/x".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn provider_failure_yields_empty_list() {
        let extractor = ModelExtractor::new(std::sync::Arc::new(FailingClient));
        let urls = extractor.parse("<html></html>", "https://example.com/").await;
        assert!(urls.is_empty());
    }
}
