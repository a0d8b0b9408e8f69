//! Named, persisted snapshots of query specifications.
//!
//! Only the data shape lives here; the key-value storage behind it is
//! owned by the enclosing application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search_query::{FacetSelections, QuerySpecification, SortOption};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPreset {
    pub id: Uuid,
    pub name: String,
    pub queries: Vec<QuerySpecification>,
    pub facet_filters: Option<FacetSelections>,
    pub sort_options: Option<Vec<SortOption>>,
    pub exported_at: DateTime<Utc>,
}

impl SearchPreset {
    pub fn new(
        name: impl Into<String>,
        queries: Vec<QuerySpecification>,
        facet_filters: Option<FacetSelections>,
    ) -> Self {
        SearchPreset {
            id: Uuid::new_v4(),
            name: name.into(),
            queries,
            facet_filters,
            sort_options: None,
            exported_at: Utc::now(),
        }
    }
}
