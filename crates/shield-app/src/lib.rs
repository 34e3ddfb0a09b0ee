//! SHIELD dashboard composition root.
//!
//! This crate wires the pipeline together: configuration, the reactor loop
//! owning the store and chart feeders, the periodic tickers, and a traffic
//! simulator for running the whole thing without a backend.
//!
//! The binary (`shield-app`) has two modes:
//!
//! - **poll mode** (default): seeds from the backend's REST endpoints and
//!   keeps stats fresh on a timer; the push channel is whatever transport
//!   adapter is wired in at deployment.
//! - **`--simulate`**: a mock channel plus generated traffic; no backend
//!   required.

pub mod config;
pub mod reactor;
pub mod sim;

pub use config::{Config, ConfigError};
pub use reactor::{LogSink, Reactor, ReactorOptions, Tick};
pub use sim::{SimOptions, SimSensor, Simulator};
