//! Utilities for highlighting text spans in search results.

use serde::{Deserialize, Serialize};

use crate::search_const::{
    HIGHLIGHT_ALT_END_TAG, HIGHLIGHT_ALT_START_TAG, HIGHLIGHT_END_TAG, HIGHLIGHT_START_TAG,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightTextSpan {
    pub text: String,
    pub is_match: bool,
    pub index: u64,
}

const OPEN_TAGS: [&str; 2] = [HIGHLIGHT_START_TAG, HIGHLIGHT_ALT_START_TAG];
const CLOSE_TAGS: [&str; 2] = [HIGHLIGHT_END_TAG, HIGHLIGHT_ALT_END_TAG];

/// Converts engine highlight markup (`<mark>`/`<em>` pairs) into neutral
/// spans, then numbers the match spans so the UI can jump between hits.
pub fn decompose_text_into_spans(text: String) -> Vec<HighlightTextSpan> {
    let mut spans = _do_decompose_text_into_spans(text.trim().to_string());
    reindex_match_spans(&mut spans);
    spans
}

/// Re-runs the decomposition over an already-neutral span list. Span text
/// contains no markup after one pass, so this is a no-op on its own output.
pub fn normalize_spans(spans: Vec<HighlightTextSpan>) -> Vec<HighlightTextSpan> {
    let mut out: Vec<HighlightTextSpan> = Vec::new();
    for span in spans {
        let was_match = span.is_match;
        for sub in _do_decompose_text_into_spans(span.text) {
            let is_match = sub.is_match || was_match;
            if let Some(last) = out.last_mut() {
                if last.is_match == is_match {
                    last.text.push_str(&sub.text);
                    continue;
                }
            }
            out.push(HighlightTextSpan { text: sub.text, is_match, index: 0 });
        }
    }
    reindex_match_spans(&mut out);
    out
}

fn reindex_match_spans(spans: &mut [HighlightTextSpan]) {
    let mut index = 0;
    for span in spans.iter_mut() {
        span.index = 0;
        if span.is_match {
            span.index = index;
            index += 1;
        }
    }
}

fn find_next_tag(s: &str, from: usize, tags: &[&'static str; 2]) -> Option<(usize, &'static str)> {
    tags.iter()
        .filter_map(|tag| s[from..].find(tag).map(|p| (p + from, *tag)))
        .min_by_key(|(pos, _)| *pos)
}

fn _do_decompose_text_into_spans(text: String) -> Vec<HighlightTextSpan> {
    if text.is_empty() {
        return vec![];
    }
    // Fast path: no opening tag at all, nothing to parse. Stray closers are
    // preserved as literal text.
    if OPEN_TAGS.iter().all(|tag| !text.contains(tag)) {
        return vec![HighlightTextSpan { text, is_match: false, index: 0 }];
    }

    let input = text;
    let mut spans: Vec<HighlightTextSpan> = Vec::new();
    let mut buffer = String::new(); // accumulates plain text between tags
    let mut mark_depth: usize = 0; // supports nested tags safely
    let mut i: usize = 0;
    let s = input.as_str();

    // Flush the buffer into a span, merging with the previous span if it
    // shares the same highlight state to avoid tiny adjacent spans.
    let flush_buffer = |spans: &mut Vec<HighlightTextSpan>, buffer: &mut String, is_match: bool| {
        if buffer.is_empty() {
            return;
        }
        if let Some(last) = spans.last_mut() {
            if last.is_match == is_match {
                last.text.push_str(buffer);
                buffer.clear();
                return;
            }
        }
        spans.push(HighlightTextSpan {
            text: std::mem::take(buffer),
            is_match,
            index: 0,
        });
    };

    // Always consume the nearest tag, whichever of the four it is.
    while i < s.len() {
        let next_open = find_next_tag(s, i, &OPEN_TAGS);
        let next_close = find_next_tag(s, i, &CLOSE_TAGS);

        let (pos, tag, is_open) = match (next_open, next_close) {
            (None, None) => break, // no more tags
            (Some((op, tag)), None) => (op, tag, true),
            (None, Some((cp, tag))) => (cp, tag, false),
            (Some((op, otag)), Some((cp, ctag))) => {
                if op < cp { (op, otag, true) } else { (cp, ctag, false) }
            }
        };

        buffer.push_str(&s[i..pos]);
        flush_buffer(&mut spans, &mut buffer, mark_depth > 0);

        if is_open {
            mark_depth = mark_depth.saturating_add(1);
            i = pos + tag.len();
        } else {
            if mark_depth > 0 {
                mark_depth -= 1;
                i = pos + tag.len();
            } else {
                // Stray closing tag with no matching open: keep it as
                // literal text to preserve the original content.
                buffer.push_str(tag);
                i = pos + tag.len();
            }
        }
    }

    if i < s.len() {
        buffer.push_str(&s[i..]);
    }
    // Unmatched opening tags leave the trailing text highlighted.
    flush_buffer(&mut spans, &mut buffer, mark_depth > 0);

    spans
}
