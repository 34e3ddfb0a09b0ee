//! Transport session: one push-channel connection, translated into typed
//! session events.
//!
//! The session owns a [`PushChannel`], drives it from a background task and
//! emits [`SessionEvent`]s on an mpsc feed: connection-status transitions
//! and normalized push payloads. It never interprets payload semantics
//! beyond normalization, and it implements no retry policy of its own:
//! reconnects belong to the channel, re-seeding belongs to the reactor.
//!
//! Shutdown is graceful via a cancellation token, the same way the reading
//! streams it replaces shut down.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shield_types::ConnectionStatus;

use crate::channel::{ChannelEvent, PushChannel};
use crate::events::{PushEvent, parse_event};

/// Options for a transport session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Buffer size for the session event channel.
    pub buffer_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { buffer_size: 64 }
    }
}

/// What the session reports to the reactor.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Connection-status transition with a display message.
    Status {
        /// New status.
        status: ConnectionStatus,
        /// Human-readable message for the indicator.
        message: String,
    },
    /// A normalized push event.
    Push(PushEvent),
}

/// A running transport session.
pub struct TransportSession {
    handle: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl TransportSession {
    /// Start a session over the given channel.
    ///
    /// Returns the session handle and the event feed. The feed ends when the
    /// session stops.
    pub fn start<C>(channel: C, options: SessionOptions) -> (Self, mpsc::Receiver<SessionEvent>)
    where
        C: PushChannel + 'static,
    {
        let (tx, rx) = mpsc::channel(options.buffer_size);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(run(channel, tx, token));

        (Self { handle, cancel }, rx)
    }

    /// Stop the session gracefully.
    pub fn close(self) {
        self.cancel.cancel();
    }

    /// Whether the background task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// A token that can cancel this session externally.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<C: PushChannel>(
    mut channel: C,
    tx: mpsc::Sender<SessionEvent>,
    token: CancellationToken,
) {
    if !send_status(
        &tx,
        ConnectionStatus::Connecting,
        ConnectionStatus::Connecting.default_message().to_string(),
    )
    .await
    {
        return;
    }

    if let Err(e) = channel.connect().await {
        warn!(error = %e, "push channel connect failed");
        // The channel's own retry policy may still bring the link up; keep
        // consuming its events.
        if !send_status(&tx, ConnectionStatus::Error, e.to_string()).await {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("session cancelled, disconnecting");
                channel.disconnect().await;
                let _ = send_status(
                    &tx,
                    ConnectionStatus::Disconnected,
                    "Session closed".to_string(),
                )
                .await;
                break;
            }
            event = channel.next_event() => {
                let Some(event) = event else {
                    info!("push channel closed");
                    let _ = send_status(
                        &tx,
                        ConnectionStatus::Disconnected,
                        ConnectionStatus::Disconnected.default_message().to_string(),
                    )
                    .await;
                    break;
                };
                if !handle_channel_event(event, &tx).await {
                    break;
                }
            }
        }
    }
}

async fn send_status(
    tx: &mpsc::Sender<SessionEvent>,
    status: ConnectionStatus,
    message: String,
) -> bool {
    tx.send(SessionEvent::Status { status, message }).await.is_ok()
}

/// Translate one channel event; returns `false` when the receiver is gone.
async fn handle_channel_event(event: ChannelEvent, tx: &mpsc::Sender<SessionEvent>) -> bool {
    let session_event = match event {
        ChannelEvent::Opened => {
            info!("push channel connected");
            SessionEvent::Status {
                status: ConnectionStatus::Connected,
                message: ConnectionStatus::Connected.default_message().to_string(),
            }
        }
        ChannelEvent::Closed { reason } => {
            info!(reason = %reason, "push channel disconnected");
            SessionEvent::Status {
                status: ConnectionStatus::Disconnected,
                message: reason,
            }
        }
        ChannelEvent::Error { message } => {
            warn!(error = %message, "push channel error");
            SessionEvent::Status {
                status: ConnectionStatus::Error,
                message,
            }
        }
        ChannelEvent::Message { name, payload } => match parse_event(&name, &payload) {
            Ok(push) => SessionEvent::Push(push),
            Err(e) => {
                warn!(event = %name, error = %e, "dropping unparseable push event");
                return true;
            }
        },
    };

    tx.send(session_event).await.is_ok()
}
