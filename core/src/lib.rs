//! Core model for the strategy monitor
//!
//! Wire types, display formatting, bounded buffers and the page-independent
//! state (log store, strategy matrix) shared by every crate in the workspace.

pub mod buffer;
pub mod error;
pub mod format;
pub mod logs;
pub mod matrix;
pub mod time;
pub mod types;

pub use buffer::{RingBuffer, SeriesSnapshot, SeriesWindow};
pub use error::{MonitorError, MonitorResult};
pub use logs::{export_logs, highlight_keyword, ExportedFile, LogFilter, LogStore};
pub use matrix::{MatrixStats, StrategyMatrix};
pub use time::Timestamp;
pub use types::*;
