//! Rate limiting for UI callbacks

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Trailing-edge debounce: only the last call within `delay` runs
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Schedule `f`, replacing whatever was pending. Needs a tokio runtime.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.abort();
        }
    }
}

/// Leading-edge throttle: at most one pass per `interval`
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// True when the caller may proceed now
    pub fn ready(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_debounce_runs_last_call_only() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let hits = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let hits = hits.clone();
            debouncer.call(move || hits.lock().push(i));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(*hits.lock(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_cancel() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        debouncer.call(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_leading_edge() {
        let throttle = Throttle::new(Duration::from_secs(1));
        assert!(throttle.ready());
        assert!(!throttle.ready());
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(throttle.ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_reset_reopens_window() {
        let throttle = Throttle::new(Duration::from_secs(5));
        assert!(throttle.ready());
        assert!(!throttle.ready());
        throttle.reset();
        assert!(throttle.ready());
        assert!(!throttle.ready());
    }
}
