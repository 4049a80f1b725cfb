//! Chunk-to-fragment alignment.
//!
//! Chunks and fragments both carry char spans into the same flattened page
//! text. This module builds the table mapping each chunk to every fragment
//! whose span overlaps it, and resolves ranked match texts back to markup.

use crate::models::{Chunk, Fragment};

/// Placeholder markup for a match with no entry in the alignment table,
/// e.g. a record stored by an earlier request for a different page.
pub const NO_MATCHING_HTML: &str = "No matching HTML";

/// One chunk's alignment entry: its text and the markup of every fragment
/// overlapping its span, in document order.
#[derive(Debug, Clone)]
pub struct ChunkHtml {
    pub chunk_text: String,
    pub markup: Vec<String>,
}

/// Half-open interval overlap: `[a, b)` and `[c, d)` share at least one
/// position. Touching intervals do not overlap.
pub fn spans_overlap(a: usize, b: usize, c: usize, d: usize) -> bool {
    !(b <= c || a >= d)
}

/// Builds the alignment table for one page. Every chunk gets an entry, even
/// when no fragment overlaps it.
pub fn build_mapping(chunks: &[Chunk], fragments: &[Fragment]) -> Vec<ChunkHtml> {
    chunks
        .iter()
        .map(|chunk| ChunkHtml {
            chunk_text: chunk.text.clone(),
            markup: fragments
                .iter()
                .filter(|fragment| {
                    spans_overlap(chunk.start, chunk.end, fragment.start, fragment.end)
                })
                .map(|fragment| fragment.markup.clone())
                .collect(),
        })
        .collect()
}

/// Finds the markup list for a ranked match. Texts are compared trimmed and
/// case-insensitively; the first matching entry wins. Returns `None` when no
/// entry matches.
pub fn lookup<'a>(mapping: &'a [ChunkHtml], matched_text: &str) -> Option<&'a [String]> {
    let needle = matched_text.trim().to_lowercase();
    mapping
        .iter()
        .find(|entry| entry.chunk_text.trim().to_lowercase() == needle)
        .map(|entry| entry.markup.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str, start: usize, end: usize) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            start,
            end,
        }
    }

    fn fragment(markup: &str, start: usize, end: usize) -> Fragment {
        Fragment {
            markup: markup.to_string(),
            text: String::new(),
            start,
            end,
        }
    }

    #[test]
    fn overlap_is_symmetric() {
        let spans = [(0, 5), (3, 8), (5, 10), (0, 0), (2, 2), (1, 9)];
        for &(a, b) in &spans {
            for &(c, d) in &spans {
                assert_eq!(spans_overlap(a, b, c, d), spans_overlap(c, d, a, b));
            }
        }
    }

    #[test]
    fn touching_spans_do_not_overlap() {
        assert!(!spans_overlap(0, 5, 5, 10));
        assert!(!spans_overlap(5, 10, 0, 5));
    }

    #[test]
    fn contained_and_crossing_spans_overlap() {
        assert!(spans_overlap(0, 10, 3, 5));
        assert!(spans_overlap(3, 5, 0, 10));
        assert!(spans_overlap(0, 5, 4, 9));
    }

    #[test]
    fn empty_span_never_overlaps() {
        assert!(!spans_overlap(3, 3, 0, 10));
        assert!(!spans_overlap(0, 10, 3, 3));
    }

    #[test]
    fn chunk_crossing_a_boundary_maps_to_both_fragments() {
        let fragments = vec![fragment("<p>one</p>", 0, 10), fragment("<p>two</p>", 10, 20)];
        let chunks = vec![chunk(0, "", 0, 12), chunk(1, "", 12, 20)];

        let mapping = build_mapping(&chunks, &fragments);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping[0].markup, vec!["<p>one</p>", "<p>two</p>"]);
        assert_eq!(mapping[1].markup, vec!["<p>two</p>"]);
    }

    #[test]
    fn single_chunk_maps_to_every_fragment() {
        let fragments = vec![
            fragment("<h1>t</h1>", 0, 5),
            fragment("<p>a</p>", 5, 12),
            fragment("<p>b</p>", 12, 30),
        ];
        let chunks = vec![chunk(0, "", 0, 30)];

        let mapping = build_mapping(&chunks, &fragments);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping[0].markup.len(), 3);
    }

    #[test]
    fn chunk_with_no_fragments_gets_empty_entry() {
        let chunks = vec![chunk(0, "text", 0, 4)];
        let mapping = build_mapping(&chunks, &[]);
        assert_eq!(mapping.len(), 1);
        assert!(mapping[0].markup.is_empty());
    }

    #[test]
    fn lookup_ignores_case_and_surrounding_whitespace() {
        let mapping = vec![ChunkHtml {
            chunk_text: "  Rust is FAST  ".to_string(),
            markup: vec!["<p>Rust is FAST</p>".to_string()],
        }];

        let found = lookup(&mapping, "rust is fast").unwrap();
        assert_eq!(found, ["<p>Rust is FAST</p>".to_string()]);
    }

    #[test]
    fn lookup_misses_unknown_text() {
        let mapping = vec![ChunkHtml {
            chunk_text: "known".to_string(),
            markup: vec![],
        }];
        assert!(lookup(&mapping, "unknown").is_none());
    }

    #[test]
    fn lookup_returns_first_matching_entry() {
        let mapping = vec![
            ChunkHtml {
                chunk_text: "same".to_string(),
                markup: vec!["<p>first</p>".to_string()],
            },
            ChunkHtml {
                chunk_text: "same".to_string(),
                markup: vec!["<p>second</p>".to_string()],
            },
        ];
        let found = lookup(&mapping, "same").unwrap();
        assert_eq!(found, ["<p>first</p>".to_string()]);
    }
}
