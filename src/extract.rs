//! HTML text extraction.
//!
//! Two policies over a parsed document. "page" flattens every visible text
//! node into one string. "elements" walks the content elements, records each
//! one's serialized markup, and tracks the char span its text occupies in
//! the flattened string so chunks can later be traced back to markup.

use scraper::{ElementRef, Html};

use crate::models::Fragment;

fn is_skipped_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "template" | "noscript" | "svg")
}

fn is_content_tag(tag: &str) -> bool {
    matches!(
        tag,
        "h1" | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "p"
            | "li"
            | "blockquote"
            | "pre"
            | "code"
            | "td"
            | "th"
            | "dt"
            | "dd"
            | "figcaption"
    )
}

/// Collapses runs of whitespace to single spaces and trims the ends.
/// Applying it twice gives the same result as applying it once.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flattens the whole document into one string by concatenating its text
/// nodes in document order. Non-visible subtrees (script, style, template,
/// noscript, svg) are skipped. No separators are inserted and whitespace is
/// left as-is; callers clean it when rendering.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();

    for node in document.root_element().descendants() {
        if let Some(text) = node.value().as_text() {
            if let Some(parent) = node.parent().and_then(ElementRef::wrap) {
                if is_skipped_tag(parent.value().name()) || in_skipped_subtree(&parent) {
                    continue;
                }
            }
            out.push_str(text);
        }
    }

    out
}

/// Walks the outermost content elements (headings, paragraphs, list items,
/// table cells, and the like) and returns the flattened text plus one
/// [`Fragment`] per element. Each fragment's cleaned text is appended to the
/// flat string with no separator, so spans tile it exactly:
/// `fragments[i].end == fragments[i + 1].start`. Elements with no visible
/// text are dropped, and non-visible subtrees nested inside an element are
/// excluded from its text just as in [`page_text`].
pub fn element_fragments(html: &str) -> (String, Vec<Fragment>) {
    let document = Html::parse_document(html);
    let mut flat = String::new();
    let mut fragments = Vec::new();
    let mut cursor = 0usize;

    for element in document.root_element().descendent_elements() {
        if !is_content_tag(element.value().name()) {
            continue;
        }
        if in_skipped_subtree(&element) || has_content_ancestor(&element) {
            continue;
        }

        let text = element_text(&element);
        if text.is_empty() {
            continue;
        }

        let start = cursor;
        let end = start + text.chars().count();
        flat.push_str(&text);
        fragments.push(Fragment {
            markup: element.html(),
            text,
            start,
            end,
        });
        cursor = end;
    }

    (flat, fragments)
}

fn element_text(element: &ElementRef) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            if let Some(parent) = node.parent().and_then(ElementRef::wrap) {
                if is_skipped_tag(parent.value().name()) || in_skipped_subtree(&parent) {
                    continue;
                }
            }
            raw.push_str(text);
        }
    }
    clean_text(&raw)
}

fn in_skipped_subtree(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_skipped_tag(ancestor.value().name()))
}

fn has_content_ancestor(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_content_tag(ancestor.value().name()))
}
