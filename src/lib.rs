//! Audience Agent - client-side behavior tracking and audience profiles.
//!
//! The agent buffers behavior events (key/value tags), flushes them to a
//! collection endpoint as URL path segments, and fetches the audience
//! profile the device belongs to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Audience Agent                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  producers ──append──▶ ┌────────────────┐                    │
//! │                        │ Dispatch worker│  buffer + session  │
//! │  flush ─────drain────▶ │  (one thread)  │  + client config   │
//! │                        └───────┬────────┘                    │
//! │                                ▼                             │
//! │                        ┌────────────────┐   ┌────────────┐   │
//! │                        │ RequestBuilder │──▶│ Transport  │   │
//! │                        └────────────────┘   │  (tokio)   │   │
//! │                                             └─────┬──────┘   │
//! │                                                   ▼          │
//! │                                             Completion       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use audience_agent::{Agent, HostIdentity, ReqwestTransport};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new(std::time::Duration::from_secs(60))?;
//! let identity = HostIdentity::new(true);
//! let agent = Agent::new(
//!     Arc::new(transport),
//!     Arc::new(identity),
//!     tokio::runtime::Handle::current(),
//! )?;
//!
//! agent.initialize("25")?;
//! agent.add_behavior_id(1234);
//! agent.add_opportunity_id(99);
//! let receipt = agent.send_behavior_data().await?;
//! println!("sent {}", receipt.url);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod profile;
pub mod transparency;
pub mod transport;

// Re-export key types at crate root for convenience
pub use agent::{Agent, Completion, FlushHandle, SendReceipt};
pub use config::{AgentSettings, ClientConfig, ConfigError, DEFAULT_DOMAIN, DEFAULT_PROTOCOL};
pub use core::{url_path_encode, BehaviorEvent, EventTracker, RequestBuilder, SDK_VERSION};
pub use dispatch::{DispatchQueue, TrackerStatus};
pub use error::AgentError;
pub use identity::{HostIdentity, IdentityProvider, StaticIdentity};
pub use profile::{Audience, AudienceProfile};
pub use transparency::{DispatchStats, SharedStats, StatsSnapshot};
pub use transport::{Transport, TransportError, TransportResponse};

#[cfg(feature = "http")]
pub use transport::ReqwestTransport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tracking notice that can be displayed to users.
pub const TRACKING_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║               AUDIENCE AGENT - TRACKING NOTICE                   ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent reports behavior tags to an audience platform.       ║
║                                                                  ║
║  ✓ WHAT IS SENT:                                                 ║
║    • Behavior and opportunity ids recorded by the application    ║
║    • A device advertising identifier                             ║
║    • Session start markers                                       ║
║                                                                  ║
║  ✗ WHEN TRACKING IS DISABLED:                                    ║
║    • No events are recorded                                      ║
║    • Pending events are discarded, never sent                    ║
║    • No identifier leaves the device                             ║
║                                                                  ║
║  Buffered events are kept in memory only and are lost on exit.   ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_notice_contents() {
        assert!(TRACKING_NOTICE.contains("TRACKING NOTICE"));
        assert!(TRACKING_NOTICE.contains("TRACKING IS DISABLED"));
        assert!(TRACKING_NOTICE.contains("No identifier leaves the device"));
    }
}
