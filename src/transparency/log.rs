//! Dispatch statistics.
//!
//! Counts what the agent recorded, dropped and sent, without keeping any
//! event content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters for one agent.
#[derive(Debug)]
pub struct DispatchStats {
    /// Events accepted into the buffer
    events_recorded: AtomicU64,
    /// Events refused (empty key or no consent)
    events_dropped: AtomicU64,
    /// Events discarded by a drain that could not be sent
    events_discarded: AtomicU64,
    /// Batches delivered with a 200 response
    batches_sent: AtomicU64,
    /// Batches that failed in transport or got an unexpected response
    batches_failed: AtomicU64,
    /// Successful profile fetches
    profile_fetches: AtomicU64,
    /// When counting started
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self {
            events_recorded: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_discarded: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            profile_fetches: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that are persisted at `path`, continuing any saved counts.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::debug!("Could not load previous dispatch stats: {e}");
        }

        stats
    }

    pub fn record_event(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_event(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded_events(&self, count: u64) {
        self.events_discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_batch_sent(&self) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_profile_fetch(&self) {
        self.profile_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            profile_fetches: self.profile_fetches.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Dispatch Statistics:\n\
             - Events recorded: {}\n\
             - Events dropped: {}\n\
             - Events discarded unsent: {}\n\
             - Batches sent: {}\n\
             - Batches failed: {}\n\
             - Profile fetches: {}\n\
             - Uptime: {} seconds",
            stats.events_recorded,
            stats.events_dropped,
            stats.events_discarded,
            stats.batches_sent,
            stats.batches_failed,
            stats.profile_fetches,
            stats.uptime_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                events_recorded: stats.events_recorded,
                events_dropped: stats.events_dropped,
                events_discarded: stats.events_discarded,
                batches_sent: stats.batches_sent,
                batches_failed: stats.batches_failed,
                profile_fetches: stats.profile_fetches,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.events_recorded
                    .store(persisted.events_recorded, Ordering::Relaxed);
                self.events_dropped
                    .store(persisted.events_dropped, Ordering::Relaxed);
                self.events_discarded
                    .store(persisted.events_discarded, Ordering::Relaxed);
                self.batches_sent
                    .store(persisted.batches_sent, Ordering::Relaxed);
                self.batches_failed
                    .store(persisted.batches_failed, Ordering::Relaxed);
                self.profile_fetches
                    .store(persisted.profile_fetches, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub events_recorded: u64,
    pub events_dropped: u64,
    pub events_discarded: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub profile_fetches: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    events_recorded: u64,
    events_dropped: u64,
    #[serde(default)]
    events_discarded: u64,
    batches_sent: u64,
    batches_failed: u64,
    profile_fetches: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared stats.
pub type SharedStats = Arc<DispatchStats>;
