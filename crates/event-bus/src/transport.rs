//! Frame transports
//!
//! A transport opens one session per namespace and yields its text frames
//! until the peer closes. [`WebSocketTransport`] talks to the backend;
//! [`MemoryTransport`] is an in-process publisher for tests and demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use monitor_core::{MonitorError, MonitorResult};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info};
use url::Url;

use crate::events::Frame;
use crate::namespace::Namespace;

/// Text frames of one session; the stream ends when the session does
pub type FrameStream = BoxStream<'static, MonitorResult<String>>;

#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    async fn open(&self, namespace: Namespace) -> MonitorResult<FrameStream>;
}

/// WebSocket sessions at `<base_url><namespace path>`
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    base_url: Url,
}

impl WebSocketTransport {
    pub fn new(base_url: &str) -> MonitorResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| MonitorError::config(format!("invalid push base url {base_url}: {err}")))?;
        match base_url.scheme() {
            "ws" | "wss" => Ok(Self { base_url }),
            other => Err(MonitorError::config(format!(
                "push base url must use ws or wss, got {other}"
            ))),
        }
    }

    pub fn url_for(&self, namespace: Namespace) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), namespace.path())
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn open(&self, namespace: Namespace) -> MonitorResult<FrameStream> {
        let url = self.url_for(namespace);
        debug!(url = %url, "connecting push websocket");

        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|err| MonitorError::push(format!("{namespace}: connect failed: {err}")))?;
        info!(namespace = %namespace, "push websocket connected");

        // Pings are answered by tungstenite while reading.
        let frames = stream::unfold(Some(socket), move |state| async move {
            let mut socket = state?;
            loop {
                match socket.next().await? {
                    Ok(Message::Text(text)) => return Some((Ok(text), Some(socket))),
                    Ok(Message::Binary(bin)) => match String::from_utf8(bin) {
                        Ok(text) => return Some((Ok(text), Some(socket))),
                        Err(_) => debug!(namespace = %namespace, "dropping non-utf8 binary frame"),
                    },
                    Ok(Message::Close(_)) => {
                        info!(namespace = %namespace, "push websocket closed by peer");
                        return None;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let err = MonitorError::push(format!("{namespace}: {err}"));
                        return Some((Err(err), None));
                    }
                }
            }
        });

        Ok(frames.boxed())
    }
}

#[derive(Debug, Clone)]
enum MemoryFrame {
    Text(String),
    Close,
}

/// In-process transport driven by [`MemoryTransport::publish`]
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    channels: Mutex<HashMap<Namespace, broadcast::Sender<MemoryFrame>>>,
    opens: AtomicUsize,
    failures_left: AtomicUsize,
}

impl MemoryTransport {
    const CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, namespace: Namespace) -> broadcast::Sender<MemoryFrame> {
        self.inner
            .channels
            .lock()
            .entry(namespace)
            .or_insert_with(|| broadcast::channel(Self::CAPACITY).0)
            .clone()
    }

    /// Send `{event, data}` to every open session on `namespace`.
    /// Returns how many sessions received it.
    pub fn publish(&self, namespace: Namespace, event: &str, data: Value) -> usize {
        self.publish_raw(namespace, Frame::new(event, data).to_text())
    }

    pub fn publish_raw(&self, namespace: Namespace, text: impl Into<String>) -> usize {
        self.sender(namespace)
            .send(MemoryFrame::Text(text.into()))
            .unwrap_or(0)
    }

    /// End every open session on `namespace`, as a server-side close would
    pub fn close(&self, namespace: Namespace) -> usize {
        self.sender(namespace).send(MemoryFrame::Close).unwrap_or(0)
    }

    /// Make the next `count` opens fail
    pub fn fail_next_opens(&self, count: usize) {
        self.inner.failures_left.store(count, Ordering::SeqCst);
    }

    /// Total successful opens so far
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, namespace: Namespace) -> usize {
        self.sender(namespace).receiver_count()
    }

    /// Wait until `namespace` has at least `count` open sessions
    pub async fn wait_for_subscribers(&self, namespace: Namespace, count: usize) -> bool {
        for _ in 0..500 {
            if self.subscriber_count(namespace) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl PushTransport for MemoryTransport {
    async fn open(&self, namespace: Namespace) -> MonitorResult<FrameStream> {
        let failing = self
            .inner
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MonitorError::push(format!("{namespace}: connection refused")));
        }

        let receiver = self.sender(namespace).subscribe();
        self.inner.opens.fetch_add(1, Ordering::SeqCst);

        let frames = stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(MemoryFrame::Text(text)) => return Some((Ok(text), receiver)),
                    Ok(MemoryFrame::Close) => return None,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(frames.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_websocket_url_per_namespace() {
        let transport = WebSocketTransport::new("ws://localhost:5000/ws/").unwrap();
        assert_eq!(transport.url_for(Namespace::Logs), "ws://localhost:5000/ws/logs");
        assert!(WebSocketTransport::new("http://localhost:5000").is_err());
    }

    #[tokio::test]
    async fn test_memory_transport_delivers_and_closes() {
        let transport = MemoryTransport::new();
        let mut frames = transport.open(Namespace::Logs).await.unwrap();

        assert_eq!(transport.publish(Namespace::Logs, "new_log", json!({})), 1);
        assert_eq!(transport.publish(Namespace::Monitor, "system_metrics", json!({})), 0);
        transport.close(Namespace::Logs);

        let first = frames.next().await.unwrap().unwrap();
        assert!(first.contains("\"new_log\""));
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_memory_transport_injected_failures() {
        let transport = MemoryTransport::new();
        transport.fail_next_opens(1);
        assert!(transport.open(Namespace::Dashboard).await.is_err());
        assert!(transport.open(Namespace::Dashboard).await.is_ok());
        assert_eq!(transport.open_count(), 1);
    }
}
