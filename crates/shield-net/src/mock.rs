//! Mock push channel for testing and simulation.
//!
//! [`MockChannel`] implements [`PushChannel`] over an in-process queue; the
//! paired [`MockChannelHandle`] scripts the sequence of channel events a
//! test (or the traffic simulator) wants the session to observe.
//!
//! # Example
//!
//! ```
//! use shield_net::mock::MockChannel;
//! use serde_json::json;
//!
//! let (channel, handle) = MockChannel::new();
//! handle.open();
//! handle.message("sensor_update", json!({"sensor_id": "S1", "value": 1.0}));
//! handle.close("test over");
//! # let _ = channel;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::channel::{ChannelEvent, PushChannel};
use crate::error::{Error, Result};

/// A scriptable in-process push channel.
pub struct MockChannel {
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
    connected: AtomicBool,
    fail_connect: Arc<AtomicBool>,
}

/// Producer side of a [`MockChannel`].
#[derive(Clone)]
pub struct MockChannelHandle {
    tx: mpsc::UnboundedSender<ChannelEvent>,
    fail_connect: Arc<AtomicBool>,
}

impl MockChannel {
    /// Create a channel plus its scripting handle.
    pub fn new() -> (Self, MockChannelHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fail_connect = Arc::new(AtomicBool::new(false));
        (
            Self {
                rx,
                connected: AtomicBool::new(false),
                fail_connect: Arc::clone(&fail_connect),
            },
            MockChannelHandle { tx, fail_connect },
        )
    }

    /// Whether `connect` has been called (and `disconnect` has not).
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl MockChannelHandle {
    /// Make the next `connect` call fail.
    pub fn fail_next_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Script a connection-up event.
    pub fn open(&self) {
        let _ = self.tx.send(ChannelEvent::Opened);
    }

    /// Script a connection-down event.
    pub fn close(&self, reason: &str) {
        let _ = self.tx.send(ChannelEvent::Closed {
            reason: reason.to_string(),
        });
    }

    /// Script a transport error.
    pub fn error(&self, message: &str) {
        let _ = self.tx.send(ChannelEvent::Error {
            message: message.to_string(),
        });
    }

    /// Script a raw push message.
    pub fn message(&self, name: &str, payload: Value) {
        let _ = self.tx.send(ChannelEvent::Message {
            name: name.to_string(),
            payload,
        });
    }

    /// Script an arbitrary event.
    pub fn emit(&self, event: ChannelEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl PushChannel for MockChannel {
    async fn connect(&mut self) -> Result<()> {
        if self.fail_connect.swap(false, Ordering::SeqCst) {
            return Err(Error::Channel("mock connect failure".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.rx.close();
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }
}
