//! Core functionality for the audience agent.
//!
//! This module contains:
//! - Behavior event types and reserved keys
//! - The pending event buffer with session bookkeeping
//! - Path segment escaping and URL construction

pub mod buffer;
pub mod encoding;
pub mod events;
pub mod request;

// Re-export commonly used types
pub use buffer::{DrainedBatch, EventTracker};
pub use encoding::url_path_encode;
pub use events::{
    BehaviorEvent, KEY_BEHAVIOR, KEY_COUNT_PLACEMENTS, KEY_OPPORTUNITY, KEY_PAGE_VIEW, KEY_RAND,
    MARKER_YES, RAND_MAX,
};
pub use request::{build, RequestBuilder, API_VERSION, SDK_VERSION};
