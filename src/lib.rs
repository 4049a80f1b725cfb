//! # Page Recall
//!
//! Web page ingestion and semantic retrieval over a hosted vector store.
//!
//! Page Recall fetches a web page, extracts its text (whole-page or
//! per-element with character offsets), splits it into overlapping chunks,
//! embeds and upserts them into a vector store, and ranks the stored chunks
//! by cosine similarity against an embedded query. Results are served over
//! HTTP or printed from a one-shot CLI search.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────┐
//! │  Fetch    │──▶│  Pipeline    │──▶│ Weaviate  │
//! │ HTTP GET │   │ Chunk+Embed │   │ (vectors) │
//! └──────────┘   └─────────────┘   └────┬─────┘
//!                                       │
//!                   ┌───────────────────┤
//!                   ▼                   ▼
//!              ┌──────────┐       ┌──────────┐
//!              │   CLI    │       │   HTTP   │
//!              │ (recall) │       │ /search  │
//!              └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! recall search https://example.com/article "main argument"
//! recall serve                  # start HTTP server
//! curl -X POST http://127.0.0.1:8000/search \
//!     -H 'Content-Type: application/json' \
//!     -d '{"url": "https://example.com/article", "query": "main argument"}'
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fetch`] | Page download |
//! | [`extract`] | HTML text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`align`] | Chunk-to-markup alignment |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store abstraction |
//! | [`search`] | Ranking and the end-to-end pipeline |
//! | [`server`] | HTTP server |

pub mod align;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod search;
pub mod server;
pub mod store;
