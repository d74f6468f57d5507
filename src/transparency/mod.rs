//! Transparency module for the audience agent.
//!
//! Exposes counts of what the agent collected and sent, supporting user
//! trust and consent audits.

pub mod log;

// Re-export commonly used types
pub use log::{DispatchStats, SharedStats, StatsSnapshot};
