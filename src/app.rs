//! Service container handed to every page
//!
//! Built once by the binary (or by a test) and cloned into each page; all
//! members are cheap handles to shared state.

use std::sync::Arc;

use anyhow::Result;
use api_client::{ApiClient, ApiClientConfig};
use event_bus::{ChannelManager, PushTransport, WebSocketTransport};
use ui_kit::{ChartRegistry, NotificationCenter, Overlay, Surface};

use crate::config::MonitorConfig;

#[derive(Clone)]
pub struct Services {
    pub api: ApiClient,
    pub channels: Arc<ChannelManager>,
    pub charts: ChartRegistry,
    pub notifications: NotificationCenter,
    pub overlay: Overlay,
    pub surface: Arc<dyn Surface>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("api", &self.api.base_url())
            .field("channels", &self.channels)
            .field("charts", &self.charts)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Wire services against an explicit transport and surface
    pub fn new(
        config: &MonitorConfig,
        transport: Arc<dyn PushTransport>,
        surface: Arc<dyn Surface>,
    ) -> Result<Self> {
        let api = ApiClient::new(ApiClientConfig {
            base_url: config.api_base_url.clone(),
            timeout: config.request_timeout(),
        })?;

        Ok(Self {
            api,
            channels: Arc::new(ChannelManager::new(transport, config.reconnect.clone())),
            charts: ChartRegistry::new(surface.clone()),
            notifications: NotificationCenter::new(surface.clone(), config.buffers.notifications),
            overlay: Overlay::new(surface.clone(), config.auto_confirm),
            surface,
        })
    }

    /// Production wiring: WebSocket push transport
    pub fn connect(config: &MonitorConfig, surface: Arc<dyn Surface>) -> Result<Self> {
        let transport = WebSocketTransport::new(&config.push_base_url)?;
        Self::new(config, Arc::new(transport), surface)
    }
}
