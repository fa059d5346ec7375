//! Answer generation backends.
//!
//! A [`Generator`] turns a user question plus retrieved grounding context
//! into reply text:
//! - **[`OpenAIChatGenerator`]**: `POST /v1/chat/completions`, same retry and
//!   timeout policy as the embedding providers.
//! - **[`ExtractiveGenerator`]**: offline; replies with the grounding
//!   context itself.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::error::{RagError, RagResult};
use crate::http;

const DEFAULT_URL: &str = "https://api.openai.com";

/// Inputs for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub query: &'a str,
    /// Numbered excerpts from the index; empty when nothing matched.
    pub context: &'a str,
    /// Human-readable reply language, e.g. `"Korean"`.
    pub language: &'a str,
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest<'_>) -> RagResult<String>;
}

/// System prompt for the living-in-Korea assistant.
pub fn system_prompt(language: &str) -> String {
    format!(
        "You are a friendly assistant helping foreigners with everyday life in Korea. \
         Answer using only the reference notes provided. If the notes do not cover \
         the question, say that you do not know. Reply in {}.",
        language
    )
}

/// User message combining the reference notes and the question.
pub fn user_prompt(query: &str, context: &str) -> String {
    let notes = if context.trim().is_empty() {
        "(no matching notes)"
    } else {
        context
    };
    format!("Reference notes:\n{}\n\nQuestion: {}", notes, query)
}

// ============ OpenAI chat completions ============

pub struct OpenAIChatGenerator {
    model: String,
    api_key: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIChatGenerator {
    /// Build from config, reading the key from `generation.api_key_env`.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", config.api_key_env),
        };
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(DEFAULT_URL);
        Ok(Self {
            model: config.model.clone(),
            api_key: api_key.into(),
            endpoint: format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client: http::client_with_timeout(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> RagResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt(request.language) },
                { "role": "user", "content": user_prompt(request.query, request.context) },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let json = http::post_json_with_retry(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI chat API",
        )
        .await
        .map_err(|e| RagError::Generation(format!("{:#}", e)))?;

        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &serde_json::Value) -> RagResult<String> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            RagError::Generation("Invalid chat response: missing message content".to_string())
        })?;
    let content = content.trim();
    if content.is_empty() {
        return Err(RagError::Generation("empty completion".to_string()));
    }
    Ok(content.to_string())
}

// ============ Extractive ============

/// Replies with the retrieved notes verbatim. Needs no network access.
pub struct ExtractiveGenerator;

pub const NO_MATCH_REPLY: &str = "I could not find anything about that in my notes.";

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn model_name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> RagResult<String> {
        let context = request.context.trim();
        if context.is_empty() {
            Ok(NO_MATCH_REPLY.to_string())
        } else {
            Ok(context.to_string())
        }
    }
}

/// Create the configured [`Generator`].
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIChatGenerator::new(config)?)),
        "extractive" => Ok(Arc::new(ExtractiveGenerator)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
