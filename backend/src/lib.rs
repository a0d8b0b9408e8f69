//! Multi-search backend: engine transport, batched dispatch, result
//! normalization, and the mutable search state behind the UI.

pub mod api;
pub mod engine_utils;
pub mod search_state;
