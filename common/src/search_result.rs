//! Normalized, UI-owned result shapes produced from raw engine responses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text_highlight::HighlightTextSpan;

/// One value of a facet field, with its hit count and whether the user
/// currently has it selected. `highlighted` keeps the engine markup as-is;
/// it is only rendered, never filtered on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
    pub highlighted: String,
    pub selected: bool,
}

/// Numeric stats the engine computes for number-typed facet fields.
/// Stored unrounded; two-decimal display of `avg` is a presentation concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FacetStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: Option<f64>,
}

impl FacetStats {
    /// Two-decimal rendering for display. The stored value stays unrounded.
    pub fn avg_display(&self) -> Option<String> {
        self.avg.map(|avg| format!("{avg:.2}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub field_name: String,
    pub values: Vec<FacetValue>,
    pub stats: Option<FacetStats>,
}

/// Highlight data for one field of one hit, with all engine markup already
/// converted to neutral spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HitHighlight {
    pub field: String,
    pub snippet: Option<Vec<HighlightTextSpan>>,
    pub snippets: Vec<Vec<HighlightTextSpan>>,
    pub matched_tokens: Vec<String>,
    pub value: Option<Vec<HighlightTextSpan>>,
}

/// Match-quality breakdown as reported by the engine. The 64-bit scores come
/// over the wire as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMatchInfo {
    pub best_field_score: String,
    pub best_field_weight: u64,
    pub fields_matched: u64,
    pub score: String,
    pub tokens_matched: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultHit {
    /// The matched document, kept opaque; the admin UI renders whatever
    /// fields the collection schema declares.
    pub document: serde_json::Value,
    pub highlights: Vec<HitHighlight>,
    pub text_match_score: Option<u64>,
    pub text_match_info: Option<TextMatchInfo>,
}

/// A fault the engine reported for one collection inside an otherwise
/// successful batch. Carried inline; siblings stay usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("collection fault ({code:?}): {message}")]
pub struct PerCollectionFault {
    pub message: String,
    pub code: Option<u16>,
}

/// The normalized result for one query specification.
///
/// An empty `hits` list means zero matches and is distinct from `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCollectionResult {
    pub specification_id: Uuid,
    pub collection: String,
    pub found: u64,
    pub out_of: u64,
    pub page: u32,
    pub hits: Vec<SearchResultHit>,
    pub facets: Vec<Facet>,
    pub search_time_ms: u64,
    pub error: Option<PerCollectionFault>,
}

impl PerCollectionResult {
    pub fn is_fault(&self) -> bool {
        self.error.is_some()
    }

    pub fn facet(&self, field_name: &str) -> Option<&Facet> {
        self.facets.iter().find(|f| f.field_name == field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_display_rounds_without_touching_stored_state() {
        let stats = FacetStats { avg: Some(12.3456), ..Default::default() };
        assert_eq!(stats.avg_display().as_deref(), Some("12.35"));
        assert_eq!(stats.avg, Some(12.3456));
        assert_eq!(FacetStats::default().avg_display(), None);
    }
}
