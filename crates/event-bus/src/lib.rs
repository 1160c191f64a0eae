//! Push channels for the monitor pages
//!
//! The backend pushes state changes over one persistent session per
//! [`Namespace`]. This crate decodes those frames into closed, per-namespace
//! event unions and caches one connection per namespace.

pub mod events;
pub mod manager;
pub mod namespace;
pub mod transport;

pub use events::{decode_frame, DashboardEvent, Frame, LogsEvent, MonitorEvent, PushEvent, StrategyEvent};
pub use manager::{ChannelHandler, ChannelManager, ChannelSignal, Connection, ReconnectPolicy};
pub use namespace::Namespace;
pub use transport::{FrameStream, MemoryTransport, PushTransport, WebSocketTransport};
