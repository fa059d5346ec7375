use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{json_to_vec, validate_embeddings, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{RagError, RagResult};
use crate::http;

const DEFAULT_URL: &str = "https://api.openai.com";

/// Embedding provider using the OpenAI API.
///
/// Calls the `POST /v1/embeddings` endpoint with the configured model.
/// The API key is read from the environment variable named by
/// `embedding.api_key_env` (default `OPENAI_API_KEY`).
///
/// # Features
///
/// - Batched embedding (multiple texts per API call)
/// - Exponential backoff retry for rate limits and server errors
/// - Configurable timeout and max retries
pub struct OpenAIProvider {
    /// Model name (e.g. `"text-embedding-3-small"`).
    model: String,
    /// Vector dimensionality (e.g. `1536`).
    dims: usize,
    api_key: String,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if the API key variable is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", config.api_key_env),
        };
        Self::with_api_key(config, api_key)
    }

    /// Create a provider with an explicitly supplied credential.
    pub fn with_api_key(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let base = config.url.as_deref().unwrap_or(DEFAULT_URL);

        Ok(Self {
            model,
            dims,
            api_key: api_key.into(),
            endpoint: format!("{}/v1/embeddings", base.trim_end_matches('/')),
            max_retries: config.max_retries,
            client: http::client_with_timeout(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), model = %self.model, "requesting OpenAI embeddings");

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let json = http::post_json_with_retry(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI API",
        )
        .await
        .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let vectors = parse_openai_response(&json)?;
        validate_embeddings(texts.len(), self.dims, vectors)
    }
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Extracts the `data[].embedding` arrays, ordered by `data[].index`. The
/// indices must be exactly `0..data.len()`, each appearing once.
fn parse_openai_response(json: &serde_json::Value) -> RagResult<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| {
            RagError::Embedding("Invalid OpenAI response: missing data array".to_string())
        })?;

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; data.len()];

    for item in data {
        let embedding = item.get("embedding").ok_or_else(|| {
            RagError::Embedding("Invalid OpenAI response: missing embedding".to_string())
        })?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .ok_or_else(|| {
                RagError::Embedding("Invalid OpenAI response: missing index".to_string())
            })?;
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| slots.get_mut(i))
            .ok_or_else(|| {
                RagError::Embedding(format!(
                    "Invalid OpenAI response: index {} out of range for {} items",
                    index,
                    data.len()
                ))
            })?;
        if slot.is_some() {
            return Err(RagError::Embedding(format!(
                "Invalid OpenAI response: duplicate index {}",
                index
            )));
        }
        *slot = Some(json_to_vec(embedding)?);
    }

    // Every slot is filled: data.len() distinct in-range indices.
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_orders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] },
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_rejects_duplicate_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 0, "embedding": [1.0, 0.0] },
                { "index": 0, "embedding": [0.0, 1.0] },
            ]
        });
        let err = parse_openai_response(&json).unwrap_err();
        assert!(err.to_string().contains("duplicate index 0"));
    }

    #[test]
    fn test_parse_rejects_out_of_range_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 0, "embedding": [1.0, 0.0] },
                { "index": 2, "embedding": [0.0, 1.0] },
            ]
        });
        let err = parse_openai_response(&json).unwrap_err();
        assert!(err.to_string().contains("index 2 out of range"));
    }

    #[test]
    fn test_parse_requires_index() {
        let json = serde_json::json!({
            "data": [
                { "embedding": [1.0, 0.0] },
                { "index": 0, "embedding": [0.0, 1.0] },
            ]
        });
        let err = parse_openai_response(&json).unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert!(err.to_string().contains("missing index"));
    }

    #[test]
    fn test_parse_missing_data() {
        let json = serde_json::json!({ "object": "list" });
        assert!(parse_openai_response(&json).is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let json = serde_json::json!({
            "data": [ { "index": 0, "embedding": [1.0, "x"] } ]
        });
        assert!(parse_openai_response(&json).is_err());
    }

    #[test]
    fn test_with_api_key_requires_model() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            dims: Some(3),
            ..EmbeddingConfig::default()
        };
        assert!(OpenAIProvider::with_api_key(&config, "sk-test").is_err());
    }

    #[test]
    fn test_endpoint_uses_configured_url() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-small".to_string()),
            dims: Some(3),
            url: Some("http://localhost:9999/".to_string()),
            ..EmbeddingConfig::default()
        };
        let provider = OpenAIProvider::with_api_key(&config, "sk-test").unwrap();
        assert_eq!(provider.endpoint, "http://localhost:9999/v1/embeddings");
        assert_eq!(provider.model_name(), "text-embedding-3-small");
        assert_eq!(provider.dims(), 3);
    }
}
