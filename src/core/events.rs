//! Behavior event types and the reserved keys the collection endpoint understands.

use serde::{Deserialize, Serialize};

/// Cache-busting random value, always first in a batch.
pub const KEY_RAND: &str = "rand";
/// Page-view marker, injected once per session.
pub const KEY_PAGE_VIEW: &str = "pv";
/// Count-placements marker, injected after the first opportunity.
pub const KEY_COUNT_PLACEMENTS: &str = "dp";
/// Opportunity id.
pub const KEY_OPPORTUNITY: &str = "p";
/// Behavior id.
pub const KEY_BEHAVIOR: &str = "b";

/// Value used by the `pv` and `dp` markers.
pub const MARKER_YES: &str = "y";

/// Upper bound (inclusive) of the `rand` cache-buster.
pub const RAND_MAX: u32 = 999_999_999;

/// A single key/value tag queued for transmission.
///
/// Keys are not unique within a batch; duplicates are sent as separate
/// path segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub key: String,
    pub value: Option<String>,
}

impl BehaviorEvent {
    /// Create an event with a value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Create a value-less marker event.
    pub fn marker(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// The value, if present and non-empty.
    pub fn non_empty_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    pub(crate) fn page_view() -> Self {
        Self::new(KEY_PAGE_VIEW, MARKER_YES)
    }

    pub(crate) fn count_placements() -> Self {
        Self::new(KEY_COUNT_PLACEMENTS, MARKER_YES)
    }

    pub(crate) fn cache_buster(value: u32) -> Self {
        Self::new(KEY_RAND, value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_value() {
        assert_eq!(BehaviorEvent::new("a", "1").non_empty_value(), Some("1"));
        assert_eq!(BehaviorEvent::new("a", "").non_empty_value(), None);
        assert_eq!(BehaviorEvent::marker("a").non_empty_value(), None);
    }

    #[test]
    fn test_marker_events() {
        let pv = BehaviorEvent::page_view();
        assert_eq!(pv.key, "pv");
        assert_eq!(pv.value.as_deref(), Some("y"));

        let dp = BehaviorEvent::count_placements();
        assert_eq!(dp.key, "dp");
    }
}
