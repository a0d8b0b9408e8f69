//! Shared search query models and helpers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::filter_expression::{self, FilterCondition};
use crate::search_const;

/// Per-collection facet selections: field name -> selected values.
pub type FieldSelections = BTreeMap<String, BTreeSet<String>>;

/// All facet selections, keyed by collection name then field name.
/// Identically named fields in two collections stay independent.
pub type FacetSelections = BTreeMap<String, FieldSelections>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortOption {
    pub field: String,
    pub order: SortOrder,
}

/// One validation failure, scoped to the specification field it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// One per-collection search request, as composed by a search panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpecification {
    pub id: Uuid,
    pub collection: String,
    pub query: String,
    pub query_by_fields: Vec<String>,
    pub filter_conditions: Vec<FilterCondition>,
    pub sort_options: Vec<SortOption>,
    pub facet_by_fields: BTreeSet<String>,
    pub max_facet_values: u32,
    pub page: u32,
    pub per_page: u32,
    pub enabled: bool,
}

impl Default for QuerySpecification {
    fn default() -> Self {
        QuerySpecification {
            id: Uuid::new_v4(),
            collection: String::new(),
            query: "*".to_string(),
            query_by_fields: Vec::new(),
            filter_conditions: Vec::new(),
            sort_options: Vec::new(),
            facet_by_fields: BTreeSet::new(),
            max_facet_values: search_const::DEFAULT_MAX_FACET_VALUES,
            page: 1,
            per_page: search_const::DEFAULT_PER_PAGE,
            enabled: true,
        }
    }
}

impl QuerySpecification {
    pub fn new(collection: impl Into<String>) -> Self {
        QuerySpecification {
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.query.trim() == "*"
    }

    /// Checks the specification against the rules the engine will enforce.
    /// Invalid specifications are skipped at dispatch time; siblings still go out.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.collection.trim().is_empty() {
            errors.push(FieldError::new("collection", "collection name must not be empty"));
        }
        if !self.is_wildcard() && self.query_by_fields.is_empty() {
            errors.push(FieldError::new(
                "query_by_fields",
                "a non-wildcard query needs at least one query_by field",
            ));
        }
        if self.per_page < 1 || self.per_page > search_const::MAX_PER_PAGE {
            errors.push(FieldError::new(
                "per_page",
                format!("per_page must be between 1 and {}", search_const::MAX_PER_PAGE),
            ));
        }
        if self.max_facet_values == 0 {
            errors.push(FieldError::new("max_facet_values", "max_facet_values must be positive"));
        }
        for condition in &self.filter_conditions {
            if let Err(e) = filter_expression::serialize(condition) {
                errors.push(FieldError::new("filter_conditions", e.to_string()));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn query_by_string(&self) -> String {
        self.query_by_fields.join(",")
    }

    pub fn facet_by_string(&self) -> String {
        self.facet_by_fields.iter().cloned().collect::<Vec<_>>().join(",")
    }

    pub fn sort_by_string(&self) -> String {
        self.sort_options
            .iter()
            .map(|sort| {
                let order = match sort.order {
                    SortOrder::Asc => "asc",
                    SortOrder::Desc => "desc",
                };
                format!("{}:{}", sort.field, order)
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The full filter string for dispatch: the specification's own conditions
    /// plus the current facet selections for its collection.
    pub fn filter_by_string(
        &self,
        selections: &FieldSelections,
    ) -> Result<String, filter_expression::FilterError> {
        let combined =
            filter_expression::combine_with_facet_selections(&self.filter_conditions, selections);
        filter_expression::serialize_all(&combined)
    }
}
