//! Mutable multi-search state: specifications, results, facet selections,
//! request-sequence tokens, and display timing.
//!
//! All mutation happens on discrete UI or network events, never in parallel.
//! Facet mutations are synchronous and optimistic; the checkbox may show as
//! checked before the server-confirmed counts arrive.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};
use uuid::Uuid;

use common::search_query::{FacetSelections, FieldSelections, QuerySpecification};
use common::search_result::PerCollectionResult;

use crate::api::search::{DispatchError, DispatchOutcome, dispatch};
use crate::engine_utils::typesense_utils::SearchTransport;

pub type DispatchToken = u64;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformanceMetrics {
    pub total_time_ms: u64,
    /// Engine-reported search time per specification, not measured locally.
    pub per_collection_ms: BTreeMap<Uuid, u64>,
}

/// The top-level owned state behind the multi-search screen.
///
/// Results are applied only when their dispatch token is still the latest
/// one issued; anything older is discarded silently (late-result
/// suppression, not an error).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiSearchState {
    pub specifications: Vec<QuerySpecification>,
    pub results: BTreeMap<Uuid, PerCollectionResult>,
    pub selected_facet_values: FacetSelections,
    pub loading: bool,
    pub performance_metrics: PerformanceMetrics,
    /// Last whole-batch failure, for inline display. Cleared on success.
    pub last_dispatch_error: Option<String>,
    latest_token: DispatchToken,
}

impl MultiSearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_specification(&mut self, spec: QuerySpecification) {
        self.specifications.push(spec);
    }

    /// Drops a search panel. Its last result goes with it; facet selections
    /// for its collection survive only while another panel targets that
    /// collection.
    pub fn remove_specification(&mut self, id: Uuid) {
        let Some(position) = self.specifications.iter().position(|spec| spec.id == id) else {
            return;
        };
        let removed = self.specifications.remove(position);
        self.results.remove(&id);
        self.performance_metrics.per_collection_ms.remove(&id);
        let collection_still_used = self
            .specifications
            .iter()
            .any(|spec| spec.collection == removed.collection);
        if !collection_still_used {
            self.selected_facet_values.remove(&removed.collection);
        }
    }

    pub fn specification_mut(&mut self, id: Uuid) -> Option<&mut QuerySpecification> {
        self.specifications.iter_mut().find(|spec| spec.id == id)
    }

    pub fn result_for(&self, id: Uuid) -> Option<&PerCollectionResult> {
        self.results.get(&id)
    }

    /// Adds the value to the selection set for `(collection, field)`, or
    /// removes it if already present. Toggling a value absent from the
    /// current result's facet list is fine: the user may deselect while a
    /// new result set is in flight. The caller re-dispatches afterwards.
    pub fn toggle_facet_value(&mut self, collection: &str, field: &str, value: &str) {
        let fields = self
            .selected_facet_values
            .entry(collection.to_string())
            .or_default();
        let values = fields.entry(field.to_string()).or_default();
        if !values.remove(value) {
            values.insert(value.to_string());
        }
        if values.is_empty() {
            fields.remove(field);
        }
        if fields.is_empty() {
            self.selected_facet_values.remove(collection);
        }
    }

    pub fn clear_facet_field(&mut self, collection: &str, field: &str) {
        if let Some(fields) = self.selected_facet_values.get_mut(collection) {
            fields.remove(field);
            if fields.is_empty() {
                self.selected_facet_values.remove(collection);
            }
        }
    }

    pub fn clear_all_facets(&mut self, collection: &str) {
        self.selected_facet_values.remove(collection);
    }

    pub fn selected_values(&self, collection: &str, field: &str) -> BTreeSet<String> {
        self.selected_facet_values
            .get(collection)
            .and_then(|fields| fields.get(field))
            .cloned()
            .unwrap_or_default()
    }

    pub fn selections_for(&self, collection: &str) -> FieldSelections {
        self.selected_facet_values
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn latest_token(&self) -> DispatchToken {
        self.latest_token
    }

    /// Issues a new request-sequence token and marks the state as loading.
    /// Any dispatch still in flight for an older token becomes stale.
    pub fn begin_dispatch(&mut self) -> DispatchToken {
        self.latest_token += 1;
        self.loading = true;
        self.latest_token
    }

    /// Applies a finished dispatch if `token` is still the latest; returns
    /// whether the outcome was applied. On a whole-batch failure the
    /// previous results are kept so a transient blip never flashes an
    /// empty result set.
    pub fn apply_dispatch(
        &mut self,
        token: DispatchToken,
        outcome: Result<DispatchOutcome, DispatchError>,
    ) -> bool {
        if token != self.latest_token {
            debug!(token, latest = self.latest_token, "discarding stale dispatch result");
            return false;
        }
        self.loading = false;
        match outcome {
            Ok(outcome) => {
                self.last_dispatch_error = None;
                self.performance_metrics.total_time_ms = outcome.total_time_ms;
                for result in outcome.results {
                    self.performance_metrics
                        .per_collection_ms
                        .insert(result.specification_id, result.search_time_ms);
                    self.results.insert(result.specification_id, result);
                }
                let live_ids: BTreeSet<Uuid> =
                    self.specifications.iter().map(|spec| spec.id).collect();
                self.results.retain(|id, _| live_ids.contains(id));
                self.performance_metrics
                    .per_collection_ms
                    .retain(|id, _| live_ids.contains(id));
            }
            Err(e) => {
                warn!("multi-search dispatch failed: {e}");
                self.last_dispatch_error = Some(e.to_string());
            }
        }
        true
    }

    /// One full dispatch-and-normalize cycle. Holding `&mut self` across
    /// the await keeps a second concurrent cycle from starting on the same
    /// state instance; UIs driving dispatches concurrently use
    /// [`begin_dispatch`](Self::begin_dispatch) /
    /// [`apply_dispatch`](Self::apply_dispatch) directly.
    pub async fn run_search(&mut self, transport: &dyn SearchTransport) -> bool {
        let specs = self.specifications.clone();
        let selections = self.selected_facet_values.clone();
        let token = self.begin_dispatch();
        let outcome = dispatch(transport, &specs, &selections).await;
        self.apply_dispatch(token, outcome)
    }
}
