//! Shared search model exports used by the backend and any embedding UI.

extern crate serde;


pub mod filter_expression;
pub mod search_query;
pub mod search_result;
pub mod text_highlight;
pub mod search_const;
pub mod search_preset;
pub mod collection_schema;
