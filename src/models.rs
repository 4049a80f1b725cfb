//! Core data models used throughout Page Recall.
//!
//! These types represent the fragments, chunks, and stored records that flow
//! through the ingestion and retrieval pipeline.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One content element lifted from a page: its serialized markup and the
/// span its text occupies in the flattened page text. Offsets are char
/// positions, half-open `[start, end)`.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub markup: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// An overlapping window of the flattened page text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A record as held by the vector store: chunk text, the page it came from,
/// and its embedding.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub text: String,
    pub source_url: String,
    pub vector: Vec<f32>,
}

impl StoredRecord {
    /// Builds a record with a content-addressed id: a UUIDv5 over the
    /// SHA-256 of the source URL and chunk text. Re-indexing the same page
    /// produces the same ids, so upserts replace rather than accumulate.
    pub fn new(text: String, source_url: String, vector: Vec<f32>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_url.as_bytes());
        hasher.update(b"\n");
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, &digest).to_string();
        Self {
            id,
            text,
            source_url,
            vector,
        }
    }
}

/// A ranked hit produced by the similarity scan.
#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub text: String,
    pub score: f32,
}
