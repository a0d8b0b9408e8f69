//! Reshaping raw engine responses into UI-owned normalized results.

use std::collections::HashSet;

use common::search_query::{FieldSelections, QuerySpecification};
use common::search_result::{
    Facet, FacetValue, HitHighlight, PerCollectionFault, PerCollectionResult, SearchResultHit,
    TextMatchInfo,
};
use common::text_highlight::decompose_text_into_spans;

use crate::engine_utils::typesense_utils::{RawFacetCount, RawHit, RawSearchResult};

/// Produces the normalized, request-outliving copy of one raw result.
///
/// Selection state is only *reflected* here: the `selected` flag on each
/// facet value mirrors the caller's selection set, and the set itself is
/// never touched. An empty hit list is a valid zero-match result, distinct
/// from an inline engine fault.
pub fn normalize_result(
    raw: RawSearchResult,
    spec: &QuerySpecification,
    selections: &FieldSelections,
) -> PerCollectionResult {
    let error = raw.error.map(|message| PerCollectionFault { message, code: raw.code });
    let hits = raw.hits.into_iter().map(normalize_hit).collect();
    let facets = raw
        .facet_counts
        .into_iter()
        .map(|facet| normalize_facet(facet, selections))
        .collect();
    PerCollectionResult {
        specification_id: spec.id,
        collection: spec.collection.clone(),
        found: raw.found,
        out_of: raw.out_of,
        page: raw.page,
        hits,
        facets,
        search_time_ms: raw.search_time_ms,
        error,
    }
}

fn normalize_hit(raw: RawHit) -> SearchResultHit {
    let highlights = raw
        .highlights
        .into_iter()
        .map(|highlight| HitHighlight {
            field: highlight.field,
            snippet: highlight.snippet.map(decompose_text_into_spans),
            snippets: highlight
                .snippets
                .into_iter()
                .map(decompose_text_into_spans)
                .collect(),
            matched_tokens: highlight.matched_tokens,
            value: highlight.value.map(decompose_text_into_spans),
        })
        .collect();
    SearchResultHit {
        document: raw.document,
        highlights,
        text_match_score: raw.text_match,
        text_match_info: raw.text_match_info.map(|info| TextMatchInfo {
            best_field_score: info.best_field_score,
            best_field_weight: info.best_field_weight,
            fields_matched: info.fields_matched,
            score: info.score,
            tokens_matched: info.tokens_matched,
        }),
    }
}

fn facet_value_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn normalize_facet(raw: RawFacetCount, selections: &FieldSelections) -> Facet {
    let selected_values = selections.get(&raw.field_name);
    let mut present_values = HashSet::new();
    let mut values = Vec::new();
    for entry in raw.counts {
        let value = facet_value_string(&entry.value);
        // values must be unique per field within one result
        if present_values.contains(&value) {
            continue;
        }
        present_values.insert(value.clone());
        let selected = selected_values.map(|set| set.contains(&value)).unwrap_or(false);
        values.push(FacetValue {
            value,
            count: entry.count,
            highlighted: entry.highlighted,
            selected,
        });
    }
    Facet {
        field_name: raw.field_name,
        values,
        // numeric stats pass through unrounded; display formatting is the UI's job
        stats: raw.stats,
    }
}
