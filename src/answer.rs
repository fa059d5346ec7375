//! Retrieval-augmented answering.
//!
//! [`RagAssistant`] binds a loaded [`VectorIndex`] to a freshly built
//! embedding provider and generator. Each question is embedded once,
//! searched against the index, and the matched chunk texts become the
//! grounding context for the generator.

use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::generation::{self, GenerationRequest, Generator};
use crate::index::VectorIndex;
use crate::models::SearchHit;
use crate::snapshot;

/// A generated reply and the chunks that grounded it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub id: String,
    pub document_id: Option<String>,
    pub score: f32,
}

pub struct RagAssistant {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl RagAssistant {
    /// Bind a loaded index to live providers.
    ///
    /// # Errors
    ///
    /// [`RagError::DimensionMismatch`] if the provider's vectors would not
    /// be comparable with the stored ones.
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn Generator>,
        top_k: usize,
    ) -> RagResult<Self> {
        if let Some(dims) = index.dims() {
            if embedder.dims() != dims {
                return Err(RagError::DimensionMismatch {
                    expected: dims,
                    actual: embedder.dims(),
                });
            }
        }
        Ok(Self {
            index,
            embedder,
            generator,
            top_k: top_k.max(1),
        })
    }

    /// Load the configured snapshot and build providers from config and
    /// environment.
    ///
    /// # Errors
    ///
    /// [`RagError::IndexUnavailable`] if the snapshot is missing or
    /// corrupt, or the providers cannot be constructed.
    pub fn from_config(config: &Config) -> RagResult<Self> {
        let path = &config.snapshot.path;
        let index = snapshot::load(path).map_err(|e| {
            RagError::IndexUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let embedder = embedding::create_provider(&config.embedding)
            .context("creating embedding provider")
            .map_err(|e| RagError::IndexUnavailable(format!("{:#}", e)))?;
        let generator = generation::create_generator(&config.generation)
            .context("creating generator")
            .map_err(|e| RagError::IndexUnavailable(format!("{:#}", e)))?;

        if let Some(model) = index.model() {
            if model != embedder.model_name() {
                tracing::warn!(
                    snapshot_model = model,
                    provider_model = embedder.model_name(),
                    "snapshot was built with a different embedding model"
                );
            }
        }

        Self::new(
            Arc::new(index),
            embedder,
            generator,
            config.retrieval.top_k,
        )
        .map_err(|e| RagError::IndexUnavailable(e.to_string()))
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query` and return the `top_k` best matches.
    pub async fn retrieve(&self, query: &str) -> RagResult<Vec<SearchHit<'_>>> {
        self.retrieve_k(query, self.top_k).await
    }

    pub async fn retrieve_k(&self, query: &str, k: usize) -> RagResult<Vec<SearchHit<'_>>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.search(&vector, k)?;
        debug!(
            query_len = query.len(),
            hits = hits.len(),
            best = hits.first().map(|h| h.score).unwrap_or(0.0),
            "retrieved context"
        );
        Ok(hits)
    }

    /// Answer `query` in the language named by `language_hint` (a code
    /// such as `"ko"`), grounded on the best-matching chunks.
    ///
    /// Errors propagate to the caller, which is expected to show
    /// [`fallback_message`] instead.
    pub async fn answer(&self, query: &str, language_hint: &str) -> RagResult<Answer> {
        let hits = self.retrieve(query).await?;
        let context = build_context(&hits);
        let request = GenerationRequest {
            query: query.trim(),
            context: &context,
            language: language_name(language_hint),
        };
        let text = self.generator.generate(&request).await?;

        Ok(Answer {
            text,
            sources: hits
                .iter()
                .map(|h| SourceRef {
                    id: h.chunk.id.clone(),
                    document_id: h.chunk.document_id().map(str::to_string),
                    score: h.score,
                })
                .collect(),
        })
    }
}

/// Number and join matched chunk texts, best first.
pub fn build_context(hits: &[SearchHit<'_>]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| format!("[{}] {}", i + 1, h.chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Map a language code to the name used in prompts. Unknown codes fall
/// back to English.
pub fn language_name(code: &str) -> &'static str {
    match code.trim().to_ascii_lowercase().as_str() {
        "ko" => "Korean",
        "en" => "English",
        "ja" => "Japanese",
        "zh" => "Chinese",
        "fr" => "French",
        "de" => "German",
        "th" => "Thai",
        "vi" => "Vietnamese",
        _ => "English",
    }
}

/// Apology shown in place of an answer when a query fails.
pub fn fallback_message(language_hint: &str) -> &'static str {
    if language_hint.trim().eq_ignore_ascii_case("ko") {
        "죄송합니다. 지금은 답변을 드릴 수 없습니다. 잠시 후 다시 시도해 주세요."
    } else {
        "Sorry, I can't answer that right now. Please try again in a moment."
    }
}
