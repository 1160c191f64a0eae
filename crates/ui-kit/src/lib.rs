//! Presentation services shared by the monitor pages
//!
//! Everything here writes through a [`Surface`], so the same code drives a
//! headless in-memory document in tests and in the `run` command.

pub mod charts;
pub mod notify;
pub mod overlay;
pub mod surface;
pub mod timing;

pub use charts::{
    default_options, merge_options, ChartColor, ChartConfig, ChartData, ChartKind, ChartRegistry,
    Dataset, Paint, UpdateMode,
};
pub use notify::{Notification, NotificationCenter, NotifyLevel};
pub use overlay::{ConfirmOptions, Overlay, ProgressBar};
pub use surface::{MemorySurface, Surface, BODY};
pub use timing::{Debouncer, Throttle};
