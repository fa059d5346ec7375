//! Application context handed to the chat layer.
//!
//! Built once at startup. If the snapshot cannot be loaded the assistant is
//! left out and the RAG entry point stays disabled for the life of the
//! process; the rest of the chat application keeps working.

use std::sync::Arc;
use tracing::{info, warn};

use crate::answer::{fallback_message, RagAssistant};
use crate::config::Config;

pub struct AppContext {
    config: Arc<Config>,
    assistant: Option<Arc<RagAssistant>>,
}

impl AppContext {
    /// Load the snapshot and bind providers; degrade instead of failing.
    pub fn init(config: Config) -> Self {
        let assistant = match RagAssistant::from_config(&config) {
            Ok(rag) => {
                info!(
                    chunks = rag.index().len(),
                    dims = rag.index().dims().unwrap_or(0),
                    "RAG assistant ready"
                );
                Some(Arc::new(rag))
            }
            Err(e) => {
                warn!("RAG assistant disabled: {}", e);
                None
            }
        };
        Self {
            config: Arc::new(config),
            assistant,
        }
    }

    /// Build a context around an already-constructed assistant.
    pub fn with_assistant(config: Config, assistant: Option<RagAssistant>) -> Self {
        Self {
            config: Arc::new(config),
            assistant: assistant.map(Arc::new),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_rag_available(&self) -> bool {
        self.assistant.is_some()
    }

    pub fn assistant(&self) -> Option<&Arc<RagAssistant>> {
        self.assistant.as_ref()
    }

    /// Reply to a message sent to the assistant room.
    ///
    /// Returns `None` when RAG is disabled, so the caller can hide the
    /// assistant room. Query-time failures produce the localized apology
    /// rather than an error.
    pub async fn reply(&self, query: &str, language_hint: &str) -> Option<String> {
        let assistant = self.assistant.as_ref()?;
        match assistant.answer(query, language_hint).await {
            Ok(answer) => Some(answer.text),
            Err(e) => {
                warn!("RAG answer failed: {}", e);
                Some(fallback_message(language_hint).to_string())
            }
        }
    }
}
