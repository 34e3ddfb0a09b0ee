//! Platform-agnostic types for the SHIELD structural-health dashboard.
//!
//! This crate provides the shared data model used by the state pipeline
//! (shield-state) and the backend boundary (shield-net).
//!
//! # Features
//!
//! - Sensor, alarm and connection enums with severity ordering
//! - Time-tagged reading points
//! - Raw-value sanitization (numeric strings, non-finite rejection)
//! - Wire DTOs for the snapshot and push-event payloads
//! - Tolerant timestamp parsing (RFC 3339 and offset-less ISO 8601)
//!
//! # Example
//!
//! ```
//! use shield_types::{HealthStatus, RawReading, SensorType};
//!
//! let value = RawReading::Text("42.5".into()).sanitize();
//! assert_eq!(value, Some(42.5));
//! assert!(HealthStatus::Critical > HealthStatus::Warning);
//! assert_eq!(SensorType::parse("vibration").unit(), "Hz");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    Alarm, AlarmLevel, ConnectionStatus, HealthStatus, Point, RawReading, SensorMeta, SensorPatch,
    SensorType, SystemStats, parse_timestamp, timestamp_from_unix_ms,
};
