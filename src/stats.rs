//! Snapshot overview for `kguide info`.
//!
//! Reads only the snapshot header fields that matter for operations: format
//! version, build time, model, dimensionality and chunk count. Vectors and
//! the checksum are not verified here; `search` and `ask` do that on load.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::snapshot;

pub fn run_info(config: &Config) -> Result<()> {
    let path = &config.snapshot.path;
    let info = snapshot::inspect(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("Korea Guide RAG: Snapshot");
    println!("=========================");
    println!();
    println!("  Snapshot:    {}", path.display());
    println!("  Size:        {}", format_bytes(size));
    println!("  Version:     {}", info.version);
    println!(
        "  Built:       {}",
        info.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Model:       {}", info.model.as_deref().unwrap_or("(unknown)"));
    println!(
        "  Dims:        {}",
        info.dims.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("  Chunks:      {}", info.chunk_count);

    if info.model.is_some() && config.embedding.is_enabled() {
        let configured = configured_model(config);
        if info.model.as_deref() != Some(configured.as_str()) {
            println!();
            println!(
                "  warning: configured embedding model is {}; rebuild with `kguide ingest`",
                configured
            );
        }
    }

    Ok(())
}

fn configured_model(config: &Config) -> String {
    match config.embedding.provider.as_str() {
        "hashing" => "hashing-trigram".to_string(),
        _ => config.embedding.model.clone().unwrap_or_default(),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
