//! `kguide search` and `kguide ask`.
//!
//! Both load the snapshot the same way the server does. `search` prints the
//! raw retrieval ranking; `ask` runs the full answer path, including the
//! localized apology on query-time failures.

use anyhow::{bail, Result};

use crate::answer::RagAssistant;
use crate::app::AppContext;
use crate::config::Config;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let rag = RagAssistant::from_config(config)?;
    let k = limit.unwrap_or(rag.top_k());
    let hits = rag.retrieve_k(query, k).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let title = hit
            .chunk
            .metadata
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("(untitled)");
        println!("{}. [{:.2}] {}", i + 1, hit.score, title);
        if let Some(doc) = hit.chunk.document_id() {
            println!("    document: {}", doc);
        }
        println!(
            "    excerpt: \"{}\"",
            excerpt(&hit.chunk.text, 160).replace('\n', " ").trim()
        );
        println!("    id: {}", hit.chunk.id);
        println!();
    }

    Ok(())
}

pub async fn run_ask(config: &Config, query: &str, language: &str) -> Result<()> {
    let ctx = AppContext::init(config.clone());
    match ctx.reply(query, language).await {
        Some(reply) => {
            println!("{}", reply);
            Ok(())
        }
        None => bail!(
            "RAG is unavailable: no usable snapshot at {}. Run `kguide ingest` first.",
            config.snapshot.path.display()
        ),
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
