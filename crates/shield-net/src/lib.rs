//! Backend boundary for the SHIELD dashboard.
//!
//! Two ways in and out of the backend:
//!
//! - [`ApiClient`]: stateless request/response calls against the query
//!   endpoints (snapshot, history, alarms, acknowledge, stats, health)
//! - [`TransportSession`]: one push-channel connection behind the
//!   [`PushChannel`] trait, normalized into typed [`SessionEvent`]s
//!
//! The transport library's retry/backoff policy stays behind the trait;
//! this crate only reacts to its lifecycle events. [`mock::MockChannel`]
//! drives the same machinery in tests and in simulation mode.
//!
//! # Quick start
//!
//! ```no_run
//! use shield_net::{ApiClient, SessionOptions, TransportSession, mock::MockChannel};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new("http://localhost:5000")?;
//! let sensors = client.sensors().await?;
//!
//! let (channel, _handle) = MockChannel::new();
//! let (session, mut events) = TransportSession::start(channel, SessionOptions::default());
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod client;
pub mod error;
pub mod events;
pub mod mock;
pub mod session;

pub use channel::{ChannelEvent, PushChannel};
pub use client::{AckResponse, ApiClient, HealthResponse};
pub use error::{Error, Result};
pub use events::{PushEvent, parse_event};
pub use session::{SessionEvent, SessionOptions, TransportSession};
