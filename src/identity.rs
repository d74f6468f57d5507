//! Advertising identifier and tracking consent.

use std::sync::atomic::{AtomicBool, Ordering};

/// Source of the device identifier and the user's tracking consent.
pub trait IdentityProvider: Send + Sync {
    /// Raw device identifier, if the platform exposes one.
    fn raw_identifier(&self) -> Option<String>;

    /// Whether the user allows tracking.
    fn is_tracking_enabled(&self) -> bool;

    /// The identifier to send, absent whenever tracking is disabled.
    fn advertising_identifier(&self) -> Option<String> {
        if self.is_tracking_enabled() {
            self.raw_identifier().filter(|id| !id.is_empty())
        } else {
            None
        }
    }
}

/// Identity derived from the host name, stable for the life of the process.
///
/// Consent can be toggled at runtime with [`HostIdentity::set_tracking_enabled`].
#[derive(Debug)]
pub struct HostIdentity {
    device_id: String,
    tracking_enabled: AtomicBool,
}

impl HostIdentity {
    pub fn new(tracking_enabled: bool) -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let device_id = format!(
            "agent-{}-{}",
            hostname,
            &uuid::Uuid::new_v4().to_string()[..8]
        );

        Self {
            device_id,
            tracking_enabled: AtomicBool::new(tracking_enabled),
        }
    }

    pub fn set_tracking_enabled(&self, enabled: bool) {
        self.tracking_enabled.store(enabled, Ordering::SeqCst);
    }
}

impl IdentityProvider for HostIdentity {
    fn raw_identifier(&self) -> Option<String> {
        Some(self.device_id.clone())
    }

    fn is_tracking_enabled(&self) -> bool {
        self.tracking_enabled.load(Ordering::SeqCst)
    }
}

/// Identity with an explicitly supplied identifier.
#[derive(Debug)]
pub struct StaticIdentity {
    identifier: Option<String>,
    tracking_enabled: AtomicBool,
}

impl StaticIdentity {
    pub fn new(identifier: Option<String>, tracking_enabled: bool) -> Self {
        Self {
            identifier,
            tracking_enabled: AtomicBool::new(tracking_enabled),
        }
    }

    pub fn set_tracking_enabled(&self, enabled: bool) {
        self.tracking_enabled.store(enabled, Ordering::SeqCst);
    }
}

impl IdentityProvider for StaticIdentity {
    fn raw_identifier(&self) -> Option<String> {
        self.identifier.clone()
    }

    fn is_tracking_enabled(&self) -> bool {
        self.tracking_enabled.load(Ordering::SeqCst)
    }
}
