//! Public entry points of the audience agent.
//!
//! An [`Agent`] is built once by the application's composition root and
//! cloned wherever events are produced. Buffer and session state live on the
//! dispatch worker; network calls run on the tokio runtime handed to
//! [`Agent::new`] and report back through a [`Completion`].

use crate::config::{ClientConfig, DEFAULT_DOMAIN, DEFAULT_PROTOCOL};
use crate::core::{BehaviorEvent, KEY_BEHAVIOR, KEY_OPPORTUNITY};
use crate::dispatch::{DispatchQueue, PreparedSend, TrackerStatus};
use crate::error::AgentError;
use crate::identity::IdentityProvider;
use crate::profile::AudienceProfile;
use crate::transparency::{DispatchStats, SharedStats};
use crate::transport::Transport;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The single outcome of an asynchronous agent operation.
///
/// Await it on any executor, block on it with [`Completion::wait`], or hand
/// it a callback with [`Completion::on_complete`].
#[must_use = "a completion does nothing unless awaited, waited on, or given a callback"]
#[derive(Debug)]
pub struct Completion<T> {
    receiver: oneshot::Receiver<Result<T, AgentError>>,
}

impl<T> Completion<T> {
    fn channel() -> (oneshot::Sender<Result<T, AgentError>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    fn ready(result: Result<T, AgentError>) -> Self {
        let (sender, completion) = Self::channel();
        let _ = sender.send(result);
        completion
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// Must not be called from inside an async context.
    pub fn wait(self) -> Result<T, AgentError> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(AgentError::Stopped))
    }
}

impl<T: Send + 'static> Completion<T> {
    /// Run `callback` with the outcome on the given runtime.
    pub fn on_complete<F>(self, runtime: &Handle, callback: F)
    where
        F: FnOnce(Result<T, AgentError>) + Send + 'static,
    {
        runtime.spawn(async move { callback(self.await) });
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, AgentError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(AgentError::Stopped)))
    }
}

/// What a successful flush delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// The URL that was requested
    pub url: String,
    /// Number of path parameters sent, markers included
    pub events_sent: usize,
    /// Whether the batch carried the page-view marker
    pub was_new_session: bool,
}

/// Aborts the periodic flush task when dropped.
#[derive(Debug)]
pub struct FlushHandle {
    task: JoinHandle<()>,
}

impl FlushHandle {
    /// Stop flushing.
    pub fn stop(self) {}
}

impl Drop for FlushHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Behavior tracking and audience lookup for one device.
#[derive(Clone)]
pub struct Agent {
    queue: DispatchQueue,
    transport: Arc<dyn Transport>,
    stats: SharedStats,
    runtime: Handle,
}

impl Agent {
    /// Create an agent with fresh statistics.
    pub fn new(
        transport: Arc<dyn Transport>,
        identity: Arc<dyn IdentityProvider>,
        runtime: Handle,
    ) -> Result<Self, AgentError> {
        Self::with_stats(transport, identity, runtime, Arc::new(DispatchStats::new()))
    }

    /// Create an agent that reports into existing statistics.
    pub fn with_stats(
        transport: Arc<dyn Transport>,
        identity: Arc<dyn IdentityProvider>,
        runtime: Handle,
        stats: SharedStats,
    ) -> Result<Self, AgentError> {
        let queue = DispatchQueue::spawn(identity, stats.clone())?;
        Ok(Self {
            queue,
            transport,
            stats,
            runtime,
        })
    }

    /// Set the client id with the default domain and protocol, and start a
    /// new session.
    pub fn initialize(&self, client_id: impl Into<String>) -> Result<(), AgentError> {
        self.configure(DEFAULT_DOMAIN, DEFAULT_PROTOCOL, client_id)
    }

    /// Validate and apply a full client config, then start a new session.
    pub fn configure(
        &self,
        domain: impl Into<String>,
        protocol: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<(), AgentError> {
        let client = ClientConfig::with_endpoint(domain, protocol, client_id)?;
        info!(client_id = %client.client_id, domain = %client.domain, "agent configured");
        self.queue.configure(client)
    }

    /// Record `value` under the given type key.
    ///
    /// Silently ignored when the type is empty or tracking is disabled.
    pub fn add_behavior_data(&self, value: impl Into<String>, behavior_type: impl Into<String>) {
        self.append(BehaviorEvent::new(behavior_type, value));
    }

    /// Record a behavior id.
    pub fn add_behavior_id(&self, behavior_id: i64) {
        self.append(BehaviorEvent::new(KEY_BEHAVIOR, behavior_id.to_string()));
    }

    /// Record an opportunity id. The next flush also reports that
    /// placements were counted.
    pub fn add_opportunity_id(&self, opportunity_id: i64) {
        self.append(BehaviorEvent::new(KEY_OPPORTUNITY, opportunity_id.to_string()));
    }

    fn append(&self, event: BehaviorEvent) {
        if self.queue.append(event).is_err() {
            warn!("dispatch worker stopped, event dropped");
        }
    }

    /// Drain the buffer and send it to the collection endpoint.
    ///
    /// The buffer is emptied before the request goes out; a failed send does
    /// not re-queue its events.
    pub fn send_behavior_data(&self) -> Completion<SendReceipt> {
        let prepared = match self.queue.drain_for_send() {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(error = %e, "behavior data not sent");
                return Completion::ready(Err(e));
            }
        };

        let (sender, completion) = Completion::channel();
        let transport = self.transport.clone();
        let stats = self.stats.clone();

        self.runtime.spawn(async move {
            let result = deliver(transport.as_ref(), prepared).await;
            match &result {
                Ok(receipt) => {
                    debug!(events = receipt.events_sent, "behavior data sent");
                    stats.record_batch_sent();
                }
                Err(e) => {
                    warn!(error = %e, "behavior data send failed");
                    stats.record_batch_failed();
                }
            }
            let _ = sender.send(result);
        });

        completion
    }

    /// Send and ignore the outcome.
    pub fn send_behavior_data_detached(&self) {
        drop(self.send_behavior_data());
    }

    /// Fetch the audience profile for this device.
    ///
    /// Fails immediately, without network I/O, when the agent is not
    /// initialized or tracking is disabled.
    pub fn get_audience_data(&self) -> Completion<AudienceProfile> {
        let request = match self.queue.prepare_profile() {
            Ok(request) => request,
            Err(e) => return Completion::ready(Err(e)),
        };

        let (sender, completion) = Completion::channel();
        let transport = self.transport.clone();
        let stats = self.stats.clone();
        let url = request.profile_url();

        self.runtime.spawn(async move {
            let result = fetch_profile(transport.as_ref(), &url).await;
            match &result {
                Ok(_) => stats.record_profile_fetch(),
                Err(e) => warn!(error = %e, "audience profile fetch failed"),
            }
            let _ = sender.send(result);
        });

        completion
    }

    /// Current buffer and session state.
    pub fn status(&self) -> Result<TrackerStatus, AgentError> {
        self.queue.status()
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// Flush every `interval` while events are pending.
    ///
    /// The task runs on the agent's runtime until the handle is dropped.
    pub fn start_periodic_flush(&self, interval: Duration) -> FlushHandle {
        let agent = self.clone();
        let period = interval.max(Duration::from_millis(1));

        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match agent.status() {
                    Ok(status) if status.pending_events > 0 => {}
                    Ok(_) => continue,
                    Err(_) => break,
                }
                if let Err(e) = agent.send_behavior_data().await {
                    debug!(error = %e, "periodic flush failed");
                }
            }
        });

        FlushHandle { task }
    }
}

async fn deliver(transport: &dyn Transport, prepared: PreparedSend) -> Result<SendReceipt, AgentError> {
    let response = transport.get(&prepared.url).await?;
    if !response.is_ok() {
        return Err(AgentError::UnexpectedResponse {
            status: response.status,
            reason: "collection endpoint did not return 200".to_string(),
        });
    }

    Ok(SendReceipt {
        url: prepared.url,
        events_sent: prepared.batch.events.len(),
        was_new_session: prepared.batch.was_new_session,
    })
}

async fn fetch_profile(transport: &dyn Transport, url: &str) -> Result<AudienceProfile, AgentError> {
    let response = transport.get(url).await?;
    if !response.is_ok() {
        return Err(AgentError::UnexpectedResponse {
            status: response.status,
            reason: "profile endpoint did not return 200".to_string(),
        });
    }
    if response.body.is_empty() {
        return Err(AgentError::UnexpectedResponse {
            status: response.status,
            reason: "empty profile body".to_string(),
        });
    }

    Ok(AudienceProfile::from_json_bytes(&response.body)?)
}

#[cfg(feature = "http")]
impl Agent {
    /// Build an agent from persisted settings, using the `reqwest` transport
    /// and the host identity, with statistics stored under `data_path`.
    pub fn from_settings(
        settings: &crate::config::AgentSettings,
        runtime: Handle,
    ) -> Result<Self, AgentError> {
        let transport = crate::transport::ReqwestTransport::new(settings.request_timeout)?;
        let identity = crate::identity::HostIdentity::new(settings.tracking_enabled);
        let stats = Arc::new(DispatchStats::with_persistence(
            settings.data_path.join("stats.json"),
        ));

        let agent = Self::with_stats(Arc::new(transport), Arc::new(identity), runtime, stats)?;
        if let Some(client_id) = settings.client_id.as_deref() {
            agent.configure(&settings.domain, &settings.protocol, client_id)?;
        }
        Ok(agent)
    }
}
