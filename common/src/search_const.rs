//! Shared constants for search composition.

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 250;
pub const DEFAULT_MAX_FACET_VALUES: u32 = 10;

/// Upper bound on the number of specifications in one batched request.
/// The engine enforces its own limit; we reject before the network call.
pub const MAX_MULTI_SEARCH_BATCH: usize = 50;

/// Tags we ask the engine to wrap matches in.
pub const HIGHLIGHT_START_TAG: &str = "<mark>";
pub const HIGHLIGHT_END_TAG: &str = "</mark>";

/// Older engine versions emit these instead; the decomposer accepts both.
pub const HIGHLIGHT_ALT_START_TAG: &str = "<em>";
pub const HIGHLIGHT_ALT_END_TAG: &str = "</em>";
