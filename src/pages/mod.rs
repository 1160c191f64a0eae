//! Page controllers and the runtime that drives them
//!
//! Every page is a single tokio task draining one inbox. Push events, timer
//! ticks, finished pulls and user commands all arrive as [`PageMessage`]s,
//! so page state is only ever touched by one handler at a time.

pub mod dashboard;
pub mod logs;
pub mod monitoring;
pub mod strategy;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use event_bus::{ChannelHandler, PushEvent};
use monitor_core::MonitorError;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::Services;

pub use dashboard::DashboardPage;
pub use logs::LogsPage;
pub use monitoring::MonitoringPage;
pub use strategy::StrategyPage;

/// A page controller
pub trait Page: Send + Sized + 'static {
    /// Event union of the page's push namespace
    type Event: PushEvent;
    type Timer: Copy + Send + fmt::Debug + 'static;
    type Pull: Send + 'static;
    type Command: Send + fmt::Debug + 'static;

    const NAME: &'static str;
    const TITLE: &'static str;

    /// Connection indicator element
    const STATUS_ANCHOR: &'static str;

    /// Elements the page template provides
    const ANCHORS: &'static [&'static str];

    /// Chart anchors owned by the page; destroyed on teardown
    const CHARTS: &'static [&'static str];

    fn timers(&self) -> Vec<(Self::Timer, Duration)>;

    /// Create charts and issue the initial pulls
    fn start(&mut self, ctx: &PageContext<Self>);

    fn on_push(&mut self, ctx: &PageContext<Self>, event: Self::Event);

    fn on_tick(&mut self, ctx: &PageContext<Self>, timer: Self::Timer);

    fn on_pull(&mut self, ctx: &PageContext<Self>, pulled: Self::Pull);

    fn on_command(&mut self, ctx: &PageContext<Self>, command: Self::Command);

    fn on_connection(&mut self, _ctx: &PageContext<Self>, _status: ConnectionStatus) {}

    fn teardown(&mut self, _ctx: &PageContext<Self>) {}
}

/// Everything that can arrive in a page inbox
pub enum PageMessage<P: Page> {
    Push(P::Event),
    Connection(ConnectionStatus),
    Tick(P::Timer),
    Pulled(P::Pull),
    Command(P::Command),
}

impl<P: Page> fmt::Debug for PageMessage<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageMessage::Push(event) => f.debug_tuple("Push").field(&event.name()).finish(),
            PageMessage::Connection(status) => f.debug_tuple("Connection").field(status).finish(),
            PageMessage::Tick(timer) => f.debug_tuple("Tick").field(timer).finish(),
            PageMessage::Pulled(_) => f.write_str("Pulled"),
            PageMessage::Command(command) => f.debug_tuple("Command").field(command).finish(),
        }
    }
}

/// Push link state shown in the page header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Handed to every page callback
pub struct PageContext<P: Page> {
    pub services: Services,
    inbox: mpsc::UnboundedSender<PageMessage<P>>,
}

impl<P: Page> PageContext<P> {
    /// Run `fut` concurrently and deliver its output as a `Pulled` message.
    ///
    /// The task is not aborted on teardown; a late result is dropped with
    /// the closed inbox.
    pub fn spawn_pull<F>(&self, fut: F)
    where
        F: Future<Output = P::Pull> + Send + 'static,
    {
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let pulled = fut.await;
            if inbox.send(PageMessage::Pulled(pulled)).is_err() {
                debug!(page = P::NAME, "pull finished after teardown, result dropped");
            }
        });
    }

    /// Queue a command for a later turn of the loop
    pub fn send(&self, command: P::Command) -> bool {
        self.inbox.send(PageMessage::Command(command)).is_ok()
    }

    pub fn sender(&self) -> PageSender<P> {
        PageSender {
            inbox: self.inbox.clone(),
        }
    }

    /// Trace a failed pull or action and raise a danger notification
    pub fn report(&self, context: &str, error: &MonitorError) {
        error.log_error(context);
        self.services.notifications.danger(error.user_message(context));
    }
}

/// Cloneable command sender detached from a context
pub struct PageSender<P: Page> {
    inbox: mpsc::UnboundedSender<PageMessage<P>>,
}

impl<P: Page> Clone for PageSender<P> {
    fn clone(&self) -> Self {
        Self {
            inbox: self.inbox.clone(),
        }
    }
}

impl<P: Page> PageSender<P> {
    pub fn send(&self, command: P::Command) -> bool {
        self.inbox.send(PageMessage::Command(command)).is_ok()
    }
}

/// Forwards push lifecycle and events into the page inbox
struct InboxForwarder<P: Page> {
    inbox: mpsc::UnboundedSender<PageMessage<P>>,
}

impl<P: Page> ChannelHandler<P::Event> for InboxForwarder<P> {
    fn on_connect(&mut self) {
        let _ = self
            .inbox
            .send(PageMessage::Connection(ConnectionStatus::Connected));
    }

    fn on_disconnect(&mut self) {
        let _ = self
            .inbox
            .send(PageMessage::Connection(ConnectionStatus::Disconnected));
    }

    fn on_error(&mut self, error: &MonitorError) {
        debug!(page = P::NAME, error = %error, "push channel error");
        let _ = self
            .inbox
            .send(PageMessage::Connection(ConnectionStatus::Disconnected));
    }

    fn on_event(&mut self, event: P::Event) {
        let _ = self.inbox.send(PageMessage::Push(event));
    }

    fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }
}

/// Write the connection indicator
pub fn render_connection(services: &Services, anchor: &str, status: ConnectionStatus) {
    let surface = &services.surface;
    surface.set_class(anchor, "status-indicator", true);
    surface.set_class(anchor, "status-online", status.is_connected());
    surface.set_class(anchor, "status-offline", !status.is_connected());
    surface.set_text(anchor, status.label());
}

/// Running page
pub struct PageHandle<P: Page> {
    inbox: mpsc::UnboundedSender<PageMessage<P>>,
    cancel: CancellationToken,
    task: JoinHandle<P>,
}

impl<P: Page> PageHandle<P> {
    pub fn send(&self, command: P::Command) -> bool {
        self.inbox.send(PageMessage::Command(command)).is_ok()
    }

    pub fn sender(&self) -> PageSender<P> {
        PageSender {
            inbox: self.inbox.clone(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Tear the page down and hand back its final state
    pub async fn shutdown(self) -> Result<P, JoinError> {
        self.cancel.cancel();
        self.task.await
    }
}

/// Mount a page: connect its namespace, start timers and run its inbox
pub fn launch<P: Page>(page: P, services: Services) -> PageHandle<P> {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let ctx = PageContext {
        services,
        inbox: tx.clone(),
    };

    let task = tokio::spawn(run_page(page, ctx, rx, cancel.clone()));

    PageHandle {
        inbox: tx,
        cancel,
        task,
    }
}

async fn run_page<P: Page>(
    mut page: P,
    ctx: PageContext<P>,
    mut rx: mpsc::UnboundedReceiver<PageMessage<P>>,
    cancel: CancellationToken,
) -> P {
    info!(page = P::NAME, "🖥️ Mounting {} page", P::TITLE);

    render_connection(&ctx.services, P::STATUS_ANCHOR, ConnectionStatus::Disconnected);
    ctx.services
        .channels
        .connect::<P::Event, _>(InboxForwarder::<P> {
            inbox: ctx.inbox.clone(),
        });

    page.start(&ctx);

    for (timer, period) in page.timers() {
        spawn_timer(timer, period, ctx.inbox.clone(), cancel.child_token());
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            message = rx.recv() => {
                let Some(message) = message else { break };
                dispatch(&mut page, &ctx, message);
            }
        }
    }

    page.teardown(&ctx);
    ctx.services.channels.disconnect(<P::Event as PushEvent>::NAMESPACE);
    for chart in P::CHARTS {
        ctx.services.charts.destroy_chart(chart);
    }
    info!(page = P::NAME, "🛑 {} page torn down", P::TITLE);

    page
}

fn dispatch<P: Page>(page: &mut P, ctx: &PageContext<P>, message: PageMessage<P>) {
    match message {
        PageMessage::Push(event) => {
            debug!(page = P::NAME, event = event.name(), "push event");
            page.on_push(ctx, event);
        }
        PageMessage::Connection(status) => {
            if status.is_connected() {
                info!(page = P::NAME, "✅ push channel connected");
            } else {
                warn!(page = P::NAME, "push channel disconnected");
            }
            render_connection(&ctx.services, P::STATUS_ANCHOR, status);
            page.on_connection(ctx, status);
        }
        PageMessage::Tick(timer) => page.on_tick(ctx, timer),
        PageMessage::Pulled(pulled) => page.on_pull(ctx, pulled),
        PageMessage::Command(command) => {
            debug!(page = P::NAME, ?command, "command");
            page.on_command(ctx, command);
        }
    }
}

/// Post `Tick(timer)` every `period`, first one after a full period
fn spawn_timer<P: Page>(
    timer: P::Timer,
    period: Duration,
    inbox: mpsc::UnboundedSender<PageMessage<P>>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if inbox.send(PageMessage::Tick(timer)).is_err() {
                        break;
                    }
                }
            }
        }
    });
}
