//! The push-channel boundary.
//!
//! The transport connection library (with its own retry/backoff policy)
//! lives behind [`PushChannel`]; this crate only consumes its lifecycle
//! events and raw messages. Anything that can produce [`ChannelEvent`]s can
//! drive the pipeline: a websocket client in production, a
//! [`MockChannel`](crate::mock::MockChannel) in tests and simulation.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One occurrence on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The connection came up (initial connect or a library-level
    /// reconnect).
    Opened,
    /// The connection went down.
    Closed {
        /// Why, as reported by the transport library.
        reason: String,
    },
    /// The transport library reported a failure it will retry itself.
    Error {
        /// Failure description.
        message: String,
    },
    /// A raw push message, uninterpreted.
    Message {
        /// Event name (e.g. `"sensor_update"`).
        name: String,
        /// Raw JSON payload.
        payload: Value,
    },
}

/// A bidirectional push channel to the backend.
///
/// Implementations own reconnection and backoff; consumers only observe
/// [`ChannelEvent`]s.
#[async_trait]
pub trait PushChannel: Send {
    /// Start the connection. A returned error is a failure to even begin
    /// connecting; transient connect failures surface as
    /// [`ChannelEvent::Error`] from [`next_event`](Self::next_event).
    async fn connect(&mut self) -> Result<()>;

    /// Tear the connection down.
    async fn disconnect(&mut self);

    /// The next channel event, or `None` once the channel is permanently
    /// closed.
    async fn next_event(&mut self) -> Option<ChannelEvent>;
}
