//! Similarity ranking and the end-to-end search pipeline.
//!
//! A search fetches the page, extracts and chunks its text, embeds the
//! chunks, upserts them into the vector store, embeds the query, scans
//! every stored vector, and returns the `top_n` most similar chunk texts.
//! Under the "elements" extract policy each result also carries the HTML
//! fragments its chunk overlapped.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::align::{self, NO_MATCHING_HTML};
use crate::chunk;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::extract;
use crate::fetch;
use crate::models::{Chunk, RankedMatch, StoredRecord};
use crate::store::{self, VectorStore};

/// Response payload for a search: bare chunk texts under the "page" policy,
/// text/html pairs under the "elements" policy.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    Texts(Vec<String>),
    Fragments(Vec<FragmentMatch>),
}

/// One ranked result under the "elements" policy.
#[derive(Debug, Serialize)]
pub struct FragmentMatch {
    pub text: String,
    pub html: MatchedMarkup,
}

/// Markup for a match: the overlapping fragments, or a placeholder string
/// when the matched record has no entry in this request's alignment table.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MatchedMarkup {
    Fragments(Vec<String>),
    Missing(String),
}

/// Scores every stored record against the query vector and keeps the best
/// `top_n`, highest similarity first. Returns `min(top_n, records.len())`
/// hits. Equal scores keep the order the store returned them in.
pub fn rank_candidates(
    query_vec: &[f32],
    records: Vec<StoredRecord>,
    top_n: usize,
) -> Vec<RankedMatch> {
    let mut candidates: Vec<RankedMatch> = records
        .into_iter()
        .map(|record| RankedMatch {
            score: embedding::cosine_similarity(query_vec, &record.vector),
            text: record.text,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(top_n);
    candidates
}

/// Runs the full pipeline for one request and shapes the response for the
/// configured extract policy.
pub async fn run_search(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    url: &str,
    query: &str,
) -> Result<SearchOutcome> {
    let html = fetch::fetch_page(url).await?;

    match config.extract.policy.as_str() {
        "page" => {
            let text = extract::page_text(&html);
            let chunks =
                chunk::split_text(&text, config.chunking.max_chars, config.chunking.overlap);
            let matches = index_and_rank(config, provider, store, url, query, &chunks).await?;

            Ok(SearchOutcome::Texts(
                matches
                    .into_iter()
                    .map(|m| extract::clean_text(&m.text))
                    .collect(),
            ))
        }
        "elements" => {
            let (text, fragments) = extract::element_fragments(&html);
            let chunks =
                chunk::split_text(&text, config.chunking.max_chars, config.chunking.overlap);
            let mapping = align::build_mapping(&chunks, &fragments);
            let matches = index_and_rank(config, provider, store, url, query, &chunks).await?;

            let results = matches
                .into_iter()
                .map(|m| {
                    let html = match align::lookup(&mapping, &m.text) {
                        Some(markup) => MatchedMarkup::Fragments(markup.to_vec()),
                        None => {
                            tracing::warn!(
                                text = %excerpt(&m.text, 80),
                                "no alignment entry for ranked match"
                            );
                            MatchedMarkup::Missing(NO_MATCHING_HTML.to_string())
                        }
                    };
                    FragmentMatch {
                        text: extract::clean_text(&m.text),
                        html,
                    }
                })
                .collect();

            Ok(SearchOutcome::Fragments(results))
        }
        other => bail!("Unknown extract policy: {}", other),
    }
}

/// Embeds and upserts the page's chunks, then embeds the query and ranks
/// every stored record against it.
async fn index_and_rank(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    url: &str,
    query: &str,
    chunks: &[Chunk],
) -> Result<Vec<RankedMatch>> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedding::embed_texts(provider, &config.embedding, &texts).await?;

    let records: Vec<StoredRecord> = texts
        .into_iter()
        .zip(vectors)
        .map(|(text, vector)| StoredRecord::new(text, url.to_string(), vector))
        .collect();

    tracing::debug!(chunks = records.len(), url = %url, "indexing page chunks");
    store.upsert(&records).await?;

    let query_vec = embedding::embed_query(provider, &config.embedding, query).await?;
    let stored = store.fetch_all().await?;
    tracing::debug!(stored = stored.len(), "scanning stored records");

    Ok(rank_candidates(&query_vec, stored, config.retrieval.top_n))
}

/// One-shot CLI search: builds the provider and store from config, runs the
/// pipeline, and prints ranked results to stdout.
pub async fn run_search_command(config: &Config, url: &str, query: &str) -> Result<()> {
    let provider = embedding::create_provider(&config.embedding)?;
    let store = store::connect(config)?;

    let outcome = run_search(config, provider.as_ref(), store.as_ref(), url, query).await?;

    match outcome {
        SearchOutcome::Texts(texts) => {
            if texts.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, text) in texts.iter().enumerate() {
                println!("{}. {}", i + 1, excerpt(text, 200));
            }
        }
        SearchOutcome::Fragments(matches) => {
            if matches.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, m) in matches.iter().enumerate() {
                println!("{}. {}", i + 1, excerpt(&m.text, 200));
                match &m.html {
                    MatchedMarkup::Fragments(markup) => {
                        println!("    html: {} fragment(s)", markup.len())
                    }
                    MatchedMarkup::Missing(placeholder) => {
                        println!("    html: {}", placeholder)
                    }
                }
            }
        }
    }

    Ok(())
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
