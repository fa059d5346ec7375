//! Corpus loader for offline ingestion.
//!
//! Walks the configured corpus directory and turns every matching text
//! file into a [`SourceDocument`] whose id is the path relative to the
//! root. Output is sorted by id so ingestion is reproducible.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::SourceDocument;

pub fn scan_corpus(config: &CorpusConfig) -> Result<Vec<SourceDocument>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        // Forward slashes keep ids identical across platforms.
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        documents.push(file_to_document(path, &rel_str)?);
    }

    documents.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(documents)
}

/// Wrap raw texts as documents with ids `doc-0`, `doc-1`, …
pub fn documents_from_texts<S: AsRef<str>>(texts: &[S]) -> Vec<SourceDocument> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| SourceDocument::new(format!("doc-{}", i), t.as_ref()))
        .collect()
}

fn file_to_document(path: &Path, relative_path: &str) -> Result<SourceDocument> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    let title = body
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("# "))
        .map(|l| l.trim_start_matches("# ").trim().to_string())
        .or_else(|| {
            path.file_stem()
                .map(|n| n.to_string_lossy().to_string())
        });

    Ok(SourceDocument {
        id: relative_path.to_string(),
        title,
        body,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
