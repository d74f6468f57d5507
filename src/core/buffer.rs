//! Pending event buffer and session bookkeeping.
//!
//! Events accumulate in insertion order until a flush drains them. Draining
//! decorates the batch with the reserved markers the collection endpoint
//! expects and leaves the buffer empty, whether or not the batch is ever
//! delivered.

use crate::core::events::{BehaviorEvent, KEY_OPPORTUNITY};

/// A batch taken out of the buffer, ready for request building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainedBatch {
    /// Decorated events, `rand` first.
    pub events: Vec<BehaviorEvent>,
    /// Whether this batch opened a new session (carries the `pv` marker).
    pub was_new_session: bool,
}

/// Ordered event buffer plus the new-session flag.
///
/// This type is not synchronized on its own; the dispatch worker owns the
/// only instance and serializes every access.
#[derive(Debug)]
pub struct EventTracker {
    events: Vec<BehaviorEvent>,
    is_new_session: bool,
}

impl EventTracker {
    /// Create an empty tracker at the start of a session.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            is_new_session: true,
        }
    }

    /// Append an event.
    ///
    /// Events with an empty key are dropped and `false` is returned. Empty or
    /// absent values are kept; they become value-less path segments.
    pub fn append(&mut self, event: BehaviorEvent) -> bool {
        if event.key.is_empty() {
            return false;
        }
        self.events.push(event);
        true
    }

    /// Start a new session; the next drain carries a page-view marker.
    pub fn reset_session(&mut self) {
        self.is_new_session = true;
    }

    pub fn is_new_session(&self) -> bool {
        self.is_new_session
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pending events in insertion order.
    pub fn events(&self) -> &[BehaviorEvent] {
        &self.events
    }

    /// Drop every pending event without building a batch. Returns how many
    /// were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.events.len();
        self.events.clear();
        dropped
    }

    /// Take all pending events as a decorated batch and reset to empty.
    ///
    /// 1. `rand=<cache_buster>` goes to index 0
    /// 2. on a new session `pv=y` goes to index 1 and the flag clears
    /// 3. `dp=y` follows the first opportunity event, if any
    pub fn drain_for_send(&mut self, cache_buster: u32) -> DrainedBatch {
        let mut events = std::mem::take(&mut self.events);

        events.insert(0, BehaviorEvent::cache_buster(cache_buster));

        let was_new_session = self.is_new_session;
        if was_new_session {
            events.insert(1, BehaviorEvent::page_view());
            self.is_new_session = false;
        }

        if let Some(pos) = events.iter().position(|e| e.key == KEY_OPPORTUNITY) {
            events.insert(pos + 1, BehaviorEvent::count_placements());
        }

        DrainedBatch {
            events,
            was_new_session,
        }
    }
}

impl Default for EventTracker {
    fn default() -> Self {
        Self::new()
    }
}
