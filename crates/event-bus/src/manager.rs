//! Namespace-keyed push connections
//!
//! [`ChannelManager`] keeps at most one live [`Connection`] per namespace.
//! Each connection runs a task that opens a transport session, decodes its
//! frames into the namespace's event union and hands them to a
//! [`ChannelHandler`], reconnecting with exponential backoff when the
//! session ends.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::StreamExt;
use monitor_core::MonitorError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{decode_frame, PushEvent};
use crate::namespace::Namespace;
use crate::transport::PushTransport;

/// Receives lifecycle signals and decoded events for one connection
pub trait ChannelHandler<E>: Send + 'static {
    fn on_connect(&mut self) {}

    fn on_disconnect(&mut self) {}

    fn on_error(&mut self, _error: &MonitorError) {}

    fn on_event(&mut self, event: E);

    /// A closed handler stops the connection task
    fn is_closed(&self) -> bool {
        false
    }
}

/// Everything a connection reports, as a single message type
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal<E> {
    Connected,
    Disconnected,
    Error(String),
    Event(E),
}

impl<E: Send + 'static> ChannelHandler<E> for mpsc::UnboundedSender<ChannelSignal<E>> {
    fn on_connect(&mut self) {
        let _ = self.send(ChannelSignal::Connected);
    }

    fn on_disconnect(&mut self) {
        let _ = self.send(ChannelSignal::Disconnected);
    }

    fn on_error(&mut self, error: &MonitorError) {
        let _ = self.send(ChannelSignal::Error(error.to_string()));
    }

    fn on_event(&mut self, event: E) {
        let _ = self.send(ChannelSignal::Event(event));
    }

    fn is_closed(&self) -> bool {
        mpsc::UnboundedSender::is_closed(self)
    }
}

/// Reconnection schedule: `min(base * factor^min(attempt, 8), max)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    /// Give up after this many consecutive failed attempts; `None` retries forever
    pub max_attempts: Option<u32>,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: None,
            base_delay_ms: 400,
            max_delay_ms: 10_000,
            factor: 1.6,
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before reconnect attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let millis = (self.base_delay_ms as f64 * self.factor.powi(attempt.min(8) as i32))
            .min(self.max_delay_ms as f64);
        Duration::from_millis(millis.max(0.0) as u64)
    }

    fn allows(&self, attempt: u32) -> bool {
        self.enabled && self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

/// A cached push connection
#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    namespace: Namespace,
    opened_at: DateTime<Utc>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Stop the connection task; the handler receives a final disconnect
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// False once closed or once the task has given up reconnecting
    pub fn is_active(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.task
            .lock()
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    /// Wait for the connection task to finish
    pub async fn closed(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// One connection per namespace, shared by every caller
pub struct ChannelManager {
    transport: Arc<dyn PushTransport>,
    policy: ReconnectPolicy,
    connections: DashMap<Namespace, Arc<Connection>>,
}

impl std::fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("policy", &self.policy)
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

impl ChannelManager {
    pub fn new(transport: Arc<dyn PushTransport>, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            connections: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Connect `E::NAMESPACE`, or return the cached connection.
    ///
    /// On a cache hit the supplied handler is dropped and the existing
    /// connection keeps its original handler. Must be called inside a tokio
    /// runtime.
    pub fn connect<E, H>(&self, handler: H) -> Arc<Connection>
    where
        E: PushEvent,
        H: ChannelHandler<E>,
    {
        let namespace = E::NAMESPACE;
        match self.connections.entry(namespace) {
            Entry::Occupied(entry) => {
                debug!(namespace = %namespace, "reusing cached push connection");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let cancel = CancellationToken::new();
                let task = tokio::spawn(run_connection::<E, H>(
                    self.transport.clone(),
                    self.policy.clone(),
                    handler,
                    cancel.clone(),
                ));
                let connection = Arc::new(Connection {
                    id: Uuid::new_v4(),
                    namespace,
                    opened_at: Utc::now(),
                    cancel,
                    task: Mutex::new(Some(task)),
                });
                info!(namespace = %namespace, id = %connection.id, "📡 push connection created");
                entry.insert(connection).clone()
            }
        }
    }

    /// Close and evict; returns whether a connection existed
    pub fn disconnect(&self, namespace: Namespace) -> bool {
        match self.connections.remove(&namespace) {
            Some((_, connection)) => {
                connection.close();
                info!(namespace = %namespace, "push connection closed");
                true
            }
            None => false,
        }
    }

    pub fn disconnect_all(&self) {
        let namespaces: Vec<Namespace> = self.connections.iter().map(|entry| *entry.key()).collect();
        for namespace in namespaces {
            self.disconnect(namespace);
        }
    }

    pub fn get_connection(&self, namespace: Namespace) -> Option<Arc<Connection>> {
        self.connections.get(&namespace).map(|entry| entry.value().clone())
    }

    pub fn connected_namespaces(&self) -> Vec<Namespace> {
        let mut namespaces: Vec<Namespace> = self.connections.iter().map(|entry| *entry.key()).collect();
        namespaces.sort();
        namespaces
    }
}

async fn run_connection<E, H>(
    transport: Arc<dyn PushTransport>,
    policy: ReconnectPolicy,
    mut handler: H,
    cancel: CancellationToken,
) where
    E: PushEvent,
    H: ChannelHandler<E>,
{
    let namespace = E::NAMESPACE;
    let mut attempt: u32 = 0;

    loop {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            opened = transport.open(namespace) => opened,
        };

        match opened {
            Ok(mut frames) => {
                attempt = 0;
                handler.on_connect();

                loop {
                    let next = tokio::select! {
                        _ = cancel.cancelled() => {
                            handler.on_disconnect();
                            return;
                        }
                        next = frames.next() => next,
                    };

                    match next {
                        Some(Ok(text)) => match decode_frame::<E>(&text) {
                            Ok(Some(event)) => {
                                debug!(namespace = %namespace, event = event.name(), "push event");
                                handler.on_event(event);
                            }
                            Ok(None) => {}
                            Err(err) => warn!(namespace = %namespace, %err, "dropping malformed push frame"),
                        },
                        Some(Err(err)) => {
                            warn!(namespace = %namespace, %err, "push session error");
                            handler.on_error(&err);
                            break;
                        }
                        None => break,
                    }

                    if handler.is_closed() {
                        debug!(namespace = %namespace, "push handler dropped; stopping connection");
                        return;
                    }
                }

                handler.on_disconnect();
            }
            Err(err) => {
                warn!(namespace = %namespace, %err, "push connection failed");
                handler.on_error(&err);
            }
        }

        if handler.is_closed() {
            return;
        }

        attempt = attempt.saturating_add(1);
        if !policy.allows(attempt) {
            warn!(namespace = %namespace, attempt, "giving up on push connection");
            return;
        }

        let delay = policy.delay(attempt);
        warn!(namespace = %namespace, ?delay, attempt, "reconnecting push connection");
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
