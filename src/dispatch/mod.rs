//! Serialized access to the event buffer and session state.
//!
//! [`DispatchQueue`] is a cheap, cloneable handle onto the dispatch worker
//! thread. Fire-and-forget commands (append, configure) return as soon as
//! they are queued; drains and status reads wait for the worker's reply,
//! which arrives after every command queued before them has run.

mod worker;

pub use worker::{PreparedSend, TrackerStatus};

use crate::config::ClientConfig;
use crate::core::{BehaviorEvent, RequestBuilder};
use crate::error::AgentError;
use crate::identity::IdentityProvider;
use crate::transparency::SharedStats;
use crossbeam_channel::{bounded, unbounded, Sender};
use std::sync::Arc;
use worker::{Command, Worker};

/// Handle onto the dispatch worker.
#[derive(Clone)]
pub struct DispatchQueue {
    sender: Sender<Command>,
}

impl DispatchQueue {
    /// Start the worker thread.
    ///
    /// The worker exits once the last handle is dropped.
    pub fn spawn(
        identity: Arc<dyn IdentityProvider>,
        stats: SharedStats,
    ) -> Result<Self, AgentError> {
        let (sender, receiver) = unbounded();
        let worker = Worker::new(identity, stats);

        std::thread::Builder::new()
            .name("audience-dispatch".to_string())
            .spawn(move || worker.run(receiver))
            .map_err(|_| AgentError::Stopped)?;

        Ok(Self { sender })
    }

    /// Replace the client config and start a new session.
    pub fn configure(&self, client: ClientConfig) -> Result<(), AgentError> {
        self.submit(Command::Configure(client))
    }

    /// Queue an event. Empty keys and events recorded without consent are
    /// dropped by the worker.
    pub fn append(&self, event: BehaviorEvent) -> Result<(), AgentError> {
        self.submit(Command::Append(event))
    }

    /// Drain the buffer into a decorated batch and build its URL.
    pub fn drain_for_send(&self) -> Result<PreparedSend, AgentError> {
        self.request(Command::Drain)?
    }

    /// Check initialization and consent, and capture the profile endpoint.
    pub fn prepare_profile(&self) -> Result<RequestBuilder, AgentError> {
        self.request(Command::PrepareProfile)?
    }

    /// Current worker state.
    pub fn status(&self) -> Result<TrackerStatus, AgentError> {
        self.request(Command::Status)
    }

    fn submit(&self, command: Command) -> Result<(), AgentError> {
        self.sender.send(command).map_err(|_| AgentError::Stopped)
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> Command) -> Result<T, AgentError> {
        let (reply, response) = bounded(1);
        self.submit(command(reply))?;
        response.recv().map_err(|_| AgentError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KEY_BEHAVIOR, KEY_PAGE_VIEW, KEY_RAND};
    use crate::identity::StaticIdentity;
    use crate::transparency::DispatchStats;
    use std::collections::HashSet;

    fn queue_with(identity: Arc<StaticIdentity>) -> DispatchQueue {
        DispatchQueue::spawn(identity, Arc::new(DispatchStats::new())).unwrap()
    }

    fn consenting() -> Arc<StaticIdentity> {
        Arc::new(StaticIdentity::new(Some("IDFA-1".to_string()), true))
    }

    #[test]
    fn test_drain_before_initialize_leaves_buffer() {
        let queue = queue_with(consenting());
        queue.append(BehaviorEvent::new("b", "1")).unwrap();
        queue.append(BehaviorEvent::new("b", "2")).unwrap();

        let err = queue.drain_for_send().unwrap_err();
        assert_eq!(err, AgentError::NotInitialized);
        assert_eq!(queue.status().unwrap().pending_events, 2);
    }

    #[test]
    fn test_drain_builds_url_from_captured_config() {
        let queue = queue_with(consenting());
        queue.configure(ClientConfig::new("25")).unwrap();
        queue.append(BehaviorEvent::new("b", "7")).unwrap();

        let prepared = queue.drain_for_send().unwrap();
        let rand = &prepared.batch.events[0];
        assert_eq!(rand.key, KEY_RAND);
        let expected = format!(
            "https://bcp.crwdcntrl.net/5/c=25/mid=IDFA-1/e=app/dt=IDFA/sdk=3.0/rand={}/pv=y/b=7/",
            rand.value.as_deref().unwrap()
        );
        assert_eq!(prepared.url, expected);
        assert_eq!(queue.status().unwrap().pending_events, 0);
    }

    #[test]
    fn test_cache_buster_in_range() {
        let queue = queue_with(consenting());
        queue.configure(ClientConfig::new("25")).unwrap();

        for _ in 0..20 {
            let prepared = queue.drain_for_send().unwrap();
            let value: u64 = prepared.batch.events[0]
                .value
                .as_deref()
                .unwrap()
                .parse()
                .unwrap();
            assert!(value <= 999_999_999);
        }
    }

    #[test]
    fn test_reconfigure_starts_new_session() {
        let queue = queue_with(consenting());
        queue.configure(ClientConfig::new("25")).unwrap();
        assert!(queue.drain_for_send().unwrap().batch.was_new_session);
        assert!(!queue.drain_for_send().unwrap().batch.was_new_session);

        let client = ClientConfig::with_endpoint("example.test", "http", "25").unwrap();
        queue.configure(client).unwrap();
        let prepared = queue.drain_for_send().unwrap();
        assert_eq!(prepared.batch.events[1].key, KEY_PAGE_VIEW);
        assert!(prepared.url.starts_with("http://bcp.example.test/5/c=25/"));
    }

    #[test]
    fn test_tracking_disabled_drops_and_clears() {
        let identity = consenting();
        let queue = queue_with(identity.clone());
        queue.configure(ClientConfig::new("25")).unwrap();
        queue.append(BehaviorEvent::new("b", "1")).unwrap();

        identity.set_tracking_enabled(false);
        queue.append(BehaviorEvent::new("b", "2")).unwrap();
        assert_eq!(queue.status().unwrap().pending_events, 1);

        assert_eq!(
            queue.drain_for_send().unwrap_err(),
            AgentError::TrackingDisabled
        );
        assert_eq!(queue.status().unwrap().pending_events, 0);
    }

    #[test]
    fn test_prepare_profile_checks() {
        let identity = consenting();
        let queue = queue_with(identity.clone());
        assert_eq!(
            queue.prepare_profile().unwrap_err(),
            AgentError::NotInitialized
        );

        queue.configure(ClientConfig::new("25")).unwrap();
        assert_eq!(
            queue.prepare_profile().unwrap().profile_url(),
            "https://ad.crwdcntrl.net/5/pe=y/c=25/mid=IDFA-1/"
        );

        identity.set_tracking_enabled(false);
        assert_eq!(
            queue.prepare_profile().unwrap_err(),
            AgentError::TrackingDisabled
        );
    }

    #[test]
    fn test_concurrent_appends_are_never_lost_or_duplicated() {
        let queue = queue_with(consenting());
        queue.configure(ClientConfig::new("25")).unwrap();

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        queue
                            .append(BehaviorEvent::new(KEY_BEHAVIOR, format!("{p}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();

        let first = queue.drain_for_send().unwrap();
        for producer in producers {
            producer.join().unwrap();
        }
        let remaining = queue.status().unwrap().pending_events;
        let second = queue.drain_for_send().unwrap();

        let behavior_values = |prepared: &PreparedSend| -> Vec<String> {
            prepared
                .batch
                .events
                .iter()
                .filter(|e| e.key == KEY_BEHAVIOR)
                .filter_map(|e| e.value.clone())
                .collect()
        };

        let in_first = behavior_values(&first);
        let in_second = behavior_values(&second);
        assert_eq!(in_second.len(), remaining);

        let all: HashSet<_> = in_first.iter().chain(in_second.iter()).collect();
        assert_eq!(in_first.len() + in_second.len(), 1000);
        assert_eq!(all.len(), 1000);
    }
}
