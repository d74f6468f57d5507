//! The serialized dispatch worker.
//!
//! One thread owns the event buffer, session flag and client config. Every
//! read or write arrives as a [`Command`] on a single channel and runs to
//! completion before the next one starts, so an append can never interleave
//! with a drain.

use crate::config::ClientConfig;
use crate::core::{BehaviorEvent, DrainedBatch, EventTracker, RequestBuilder, RAND_MAX};
use crate::error::AgentError;
use crate::identity::IdentityProvider;
use crate::transparency::SharedStats;
use crossbeam_channel::{Receiver, Sender};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// A drained batch with its collection URL, built in the same turn.
#[derive(Debug, Clone)]
pub struct PreparedSend {
    pub url: String,
    pub batch: DrainedBatch,
}

/// Worker state as seen in one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerStatus {
    pub client: ClientConfig,
    pub is_initialized: bool,
    pub is_new_session: bool,
    pub pending_events: usize,
}

pub(crate) enum Command {
    Configure(ClientConfig),
    Append(BehaviorEvent),
    Drain(Sender<Result<PreparedSend, AgentError>>),
    PrepareProfile(Sender<Result<RequestBuilder, AgentError>>),
    Status(Sender<TrackerStatus>),
}

pub(crate) struct Worker {
    tracker: EventTracker,
    client: ClientConfig,
    identity: Arc<dyn IdentityProvider>,
    stats: SharedStats,
}

impl Worker {
    pub(crate) fn new(identity: Arc<dyn IdentityProvider>, stats: SharedStats) -> Self {
        Self {
            tracker: EventTracker::new(),
            client: ClientConfig::default(),
            identity,
            stats,
        }
    }

    /// Process commands until every sender is dropped.
    pub(crate) fn run(mut self, receiver: Receiver<Command>) {
        while let Ok(command) = receiver.recv() {
            self.handle(command);
        }
        debug!(
            pending = self.tracker.len(),
            "dispatch worker exiting, pending events discarded"
        );
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Configure(client) => self.configure(client),
            Command::Append(event) => self.append(event),
            Command::Drain(reply) => {
                let _ = reply.send(self.drain());
            }
            Command::PrepareProfile(reply) => {
                let _ = reply.send(self.prepare_profile());
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn configure(&mut self, client: ClientConfig) {
        debug!(
            client_id = %client.client_id,
            domain = %client.domain,
            protocol = %client.protocol,
            "client configured, starting new session"
        );
        self.client = client;
        self.tracker.reset_session();
    }

    fn append(&mut self, event: BehaviorEvent) {
        if !self.identity.is_tracking_enabled() {
            debug!(key = %event.key, "tracking disabled, event dropped");
            self.stats.record_dropped_event();
            return;
        }
        if self.tracker.append(event) {
            self.stats.record_event();
        } else {
            debug!("event with empty key dropped");
            self.stats.record_dropped_event();
        }
    }

    fn drain(&mut self) -> Result<PreparedSend, AgentError> {
        if !self.client.is_initialized() {
            return Err(AgentError::NotInitialized);
        }

        let Some(advertising_id) = self.identity.advertising_identifier() else {
            let discarded = self.tracker.clear();
            debug!(discarded, "tracking disabled, buffer cleared without sending");
            self.stats.record_discarded_events(discarded as u64);
            return Err(AgentError::TrackingDisabled);
        };

        let cache_buster = rand::thread_rng().gen_range(0..=RAND_MAX);
        let batch = self.tracker.drain_for_send(cache_buster);
        let url = RequestBuilder::new(self.client.clone(), advertising_id).send_url(&batch.events);

        Ok(PreparedSend { url, batch })
    }

    fn prepare_profile(&self) -> Result<RequestBuilder, AgentError> {
        if !self.client.is_initialized() {
            return Err(AgentError::NotInitialized);
        }
        let advertising_id = self
            .identity
            .advertising_identifier()
            .ok_or(AgentError::TrackingDisabled)?;
        Ok(RequestBuilder::new(self.client.clone(), advertising_id))
    }

    fn status(&self) -> TrackerStatus {
        TrackerStatus {
            client: self.client.clone(),
            is_initialized: self.client.is_initialized(),
            is_new_session: self.tracker.is_new_session(),
            pending_events: self.tracker.len(),
        }
    }
}
