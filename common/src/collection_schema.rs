//! Collection schema shapes, as supplied by the schema source.
//!
//! Used to populate query-builder choices only; specifications are never
//! validated against a live schema, just against the filter grammar rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionFieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int32[]")]
    Int32Array,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "int64[]")]
    Int64Array,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "float[]")]
    FloatArray,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "bool[]")]
    BoolArray,
    #[serde(rename = "geopoint")]
    Geopoint,
    #[serde(rename = "object")]
    Object,
    #[serde(rename = "object[]")]
    ObjectArray,
    #[serde(rename = "auto")]
    Auto,
}

impl CollectionFieldType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            CollectionFieldType::Int32
                | CollectionFieldType::Int32Array
                | CollectionFieldType::Int64
                | CollectionFieldType::Int64Array
                | CollectionFieldType::Float
                | CollectionFieldType::FloatArray
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: CollectionFieldType,
    #[serde(default)]
    pub facet: bool,
    #[serde(default)]
    pub sort: bool,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<CollectionField>,
    #[serde(default)]
    pub default_sorting_field: Option<String>,
}

impl CollectionSchema {
    pub fn facetable_field_names(&self) -> Vec<&str> {
        self.fields.iter().filter(|f| f.facet).map(|f| f.name.as_str()).collect()
    }

    pub fn sortable_field_names(&self) -> Vec<&str> {
        self.fields.iter().filter(|f| f.sort).map(|f| f.name.as_str()).collect()
    }
}
