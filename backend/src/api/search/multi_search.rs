//! Batched multi-search dispatch.

use thiserror::Error;
use tracing::{info, warn};

use common::search_const;
use common::search_query::{FacetSelections, FieldSelections, QuerySpecification};
use common::search_result::PerCollectionResult;

use crate::api::search::normalize_results::normalize_result;
use crate::engine_utils::typesense_utils::{
    RawMultiSearchRequest, RawSearchParams, SearchTransport,
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("batch of {0} specifications exceeds the multi-search limit of {1}")]
    BatchTooLarge(usize, usize),
    #[error("multi-search transport failure: {0}")]
    Transport(#[from] anyhow::Error),
    #[error("engine returned {got} results for {expected} requests")]
    ResultCountMismatch { expected: usize, got: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub results: Vec<PerCollectionResult>,
    /// Wall-clock time for the whole round trip, display only. Per-collection
    /// timing comes from each result's engine-reported `search_time_ms`.
    pub total_time_ms: u64,
}

/// Builds the wire entry for one specification, with the current facet
/// selections for its collection folded into `filter_by`.
pub fn build_search_params(
    spec: &QuerySpecification,
    selections: &FieldSelections,
) -> Result<RawSearchParams, common::filter_expression::FilterError> {
    let filter_by = spec.filter_by_string(selections)?;
    Ok(RawSearchParams {
        collection: spec.collection.clone(),
        q: spec.query.clone(),
        query_by: (!spec.query_by_fields.is_empty()).then(|| spec.query_by_string()),
        filter_by: (!filter_by.is_empty()).then_some(filter_by),
        sort_by: (!spec.sort_options.is_empty()).then(|| spec.sort_by_string()),
        facet_by: (!spec.facet_by_fields.is_empty()).then(|| spec.facet_by_string()),
        max_facet_values: Some(spec.max_facet_values),
        page: spec.page,
        per_page: spec.per_page,
        highlight_start_tag: Some(search_const::HIGHLIGHT_START_TAG.to_string()),
        highlight_end_tag: Some(search_const::HIGHLIGHT_END_TAG.to_string()),
    })
}

/// Sends every enabled, valid specification as one batched request and
/// returns normalized results in the same order.
///
/// Invalid specifications are skipped with a warning; their siblings still
/// go out. With nothing to send this returns an empty success without
/// touching the transport. A transport failure yields `DispatchError` and
/// no partial results; per-collection engine faults stay inline on the
/// affected position.
pub async fn dispatch(
    transport: &dyn SearchTransport,
    specs: &[QuerySpecification],
    selections: &FacetSelections,
) -> Result<DispatchOutcome, DispatchError> {
    let empty_selections = FieldSelections::new();
    let mut dispatched: Vec<&QuerySpecification> = Vec::new();
    let mut searches = Vec::new();
    for spec in specs.iter().filter(|spec| spec.enabled) {
        if let Err(errors) = spec.validate() {
            warn!(
                collection = %spec.collection,
                specification = %spec.id,
                "skipping invalid specification: {}",
                errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
            );
            continue;
        }
        let fields = selections.get(&spec.collection).unwrap_or(&empty_selections);
        match build_search_params(spec, fields) {
            Ok(params) => {
                dispatched.push(spec);
                searches.push(params);
            }
            Err(e) => {
                warn!(
                    collection = %spec.collection,
                    specification = %spec.id,
                    "skipping specification with unserializable filter: {e}"
                );
            }
        }
    }

    if searches.is_empty() {
        return Ok(DispatchOutcome { results: vec![], total_time_ms: 0 });
    }
    if searches.len() > search_const::MAX_MULTI_SEARCH_BATCH {
        return Err(DispatchError::BatchTooLarge(
            searches.len(),
            search_const::MAX_MULTI_SEARCH_BATCH,
        ));
    }

    let t0 = std::time::Instant::now();
    let response = transport
        .multi_search(&RawMultiSearchRequest { searches })
        .await?;
    let total_time_ms = t0.elapsed().as_millis() as u64;

    // Results correlate with requests by position, never by content.
    if response.results.len() != dispatched.len() {
        return Err(DispatchError::ResultCountMismatch {
            expected: dispatched.len(),
            got: response.results.len(),
        });
    }
    let results = response
        .results
        .into_iter()
        .zip(&dispatched)
        .map(|(raw, spec)| {
            let fields = selections.get(&spec.collection).unwrap_or(&empty_selections);
            normalize_result(raw, spec, fields)
        })
        .collect::<Vec<_>>();

    info!(
        collections = results.len(),
        total_time_ms, "multi-search dispatch complete"
    );
    Ok(DispatchOutcome { results, total_time_ms })
}
