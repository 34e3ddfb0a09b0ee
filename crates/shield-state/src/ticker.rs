//! Cancellable periodic tasks.
//!
//! Every recurring job in the pipeline (clock tick, stats refresh,
//! staleness sweep) runs as a [`Ticker`]: a background task that delivers a
//! message into the reactor's channel at a fixed period and stops cleanly
//! when closed or dropped. Timers are tied to the lifecycle of whatever
//! started them; nothing keeps ticking after its owner goes away.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A repeating background task feeding a channel.
///
/// The first message fires one full period after [`spawn`](Self::spawn),
/// not immediately. The task exits when cancelled or when the receiving
/// side of the channel is gone.
pub struct Ticker {
    handle: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl Ticker {
    /// Spawn a ticker sending `message` every `period`.
    pub fn spawn<T>(period: Duration, message: T, tx: mpsc::Sender<T>) -> Self
    where
        T: Clone + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("ticker cancelled, stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        if tx.send(message.clone()).await.is_err() {
                            debug!("ticker receiver dropped, stopping");
                            break;
                        }
                    }
                }
            }
        });

        Self { handle, cancel }
    }

    /// Stop the ticker gracefully.
    pub fn close(self) {
        self.cancel.cancel();
    }

    /// Whether the background task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// A token that can cancel this ticker externally.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        // No ticker outlives its owner.
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let _ticker = Ticker::spawn(Duration::from_secs(5), "tick", tx);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(rx.recv().await, Some("tick"));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(rx.recv().await, Some("tick"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_immediate_tick() {
        let (tx, mut rx) = mpsc::channel(8);
        let _ticker = Ticker::spawn(Duration::from_secs(30), "sweep", tx);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_task() {
        let (tx, mut rx) = mpsc::channel::<&str>(8);
        let ticker = Ticker::spawn(Duration::from_secs(1), "tick", tx);
        let token = ticker.cancellation_token();

        ticker.close();
        assert!(token.is_cancelled());

        // Let the task observe cancellation; no further ticks arrive.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (tx, _rx) = mpsc::channel::<&str>(8);
        let ticker = Ticker::spawn(Duration::from_secs(1), "tick", tx);
        let token = ticker.cancellation_token();
        drop(ticker);
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel::<&str>(1);
        let ticker = Ticker::spawn(Duration::from_secs(1), "tick", tx);
        drop(rx);

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(!ticker.is_active());
    }
}
