//! Search dispatch and normalization module exports.

mod multi_search;
pub use multi_search::{DispatchError, DispatchOutcome, build_search_params, dispatch};

mod normalize_results;
pub use normalize_results::normalize_result;
