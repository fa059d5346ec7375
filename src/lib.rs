//! # Korea Guide RAG
//!
//! Retrieval-augmented answering for a "living in Korea" chat assistant.
//!
//! A curated corpus of practical notes (hospitals, transport, visas,
//! recycling rules, …) is chunked and embedded offline into a versioned
//! snapshot. At runtime the snapshot is loaded into an in-memory
//! [`index::VectorIndex`], each question is embedded and matched with exact
//! cosine search, and the best chunks ground a chat-completion reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Corpus  │──▶│   Ingest     │──▶│   Snapshot   │
//! │ .md/.txt │   │ Chunk+Embed  │   │  (JSON, v1)  │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          │ load
//!                                          ▼
//!                ┌──────────┐       ┌──────────────┐
//!                │ Embedder │──────▶│ RagAssistant │──▶ Generator
//!                └──────────┘       │ (VectorIndex)│
//!                                   └──────┬───────┘
//!                          ┌───────────────┤
//!                          ▼               ▼
//!                     ┌──────────┐   ┌──────────┐
//!                     │   CLI    │   │   HTTP   │
//!                     │ (kguide) │   │  (axum)  │
//!                     └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kguide ingest                         # build the snapshot
//! kguide info                           # inspect it
//! kguide search "hospital hours"        # raw retrieval
//! kguide ask "병원은 몇 시에 열어요?" --lang ko
//! kguide serve                          # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed error taxonomy |
//! | [`corpus`] | Corpus directory scanning |
//! | [`chunk`] | Paragraph-aware text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory vector index and cosine search |
//! | [`snapshot`] | Versioned snapshot persistence |
//! | [`ingest`] | Offline ingestion pipeline |
//! | [`generation`] | Answer generation backends |
//! | [`answer`] | Retrieval-augmented answering |
//! | [`app`] | Application context with graceful degradation |
//! | [`server`] | JSON HTTP server |
//! | [`search`] | `search` and `ask` commands |
//! | [`stats`] | `info` command |

pub mod answer;
pub mod app;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
mod http;
pub mod index;
pub mod ingest;
pub mod models;
pub mod search;
pub mod server;
pub mod snapshot;
pub mod stats;
