//! State synchronization pipeline for the SHIELD dashboard.
//!
//! This crate turns an unordered, unbounded stream of sensor and alarm
//! events into consistent, boundedly-sized in-memory state and into
//! incrementally-updated chart instructions.
//!
//! # Components
//!
//! - [`EntityStore`]: the authoritative sensors/alarms/stats/connection
//!   state with a typed publish/subscribe hub
//! - [`StatusRules`]: pure health derivation from value, type and staleness
//! - [`SeriesBuffer`]: capped, time-tagged ring buffers
//! - [`ChartFeeder`]: per-chart dataset reconciliation with per-series
//!   update throttling behind the [`ChartSink`] rendering seam
//! - [`AlarmTimeline`]: per-day alarm counts for the timeline chart
//! - [`Ticker`]: cancellable periodic tasks driving sweeps and refreshes
//!
//! # Example
//!
//! ```
//! use shield_state::{EntityStore, StatusRules, Topic};
//! use shield_types::{RawReading, SensorMeta, SensorType};
//! use time::OffsetDateTime;
//!
//! let mut store = EntityStore::new(StatusRules::default());
//! store.subscribe(Topic::SensorData, |event| {
//!     // react to readings
//!     let _ = event;
//! });
//!
//! store.replace_sensors(vec![SensorMeta::new("H1", SensorType::Humidity)]);
//! let now = OffsetDateTime::now_utc();
//! store.apply_reading("H1", RawReading::Number(42.0), now, now);
//! assert_eq!(store.sensor("H1").unwrap().last_value, Some(42.0));
//! ```

pub mod feed;
pub mod series;
pub mod status;
pub mod store;
pub mod ticker;
pub mod timeline;

pub use feed::{ChartFeeder, ChartSink, DateRange, FeederOptions};
pub use series::SeriesBuffer;
pub use status::{Band, BoundaryRule, StatusRules, TypeBands};
pub use store::{
    ALARM_CAP, EntityStore, SENSOR_BUFFER_CAP, Sensor, StoreEvent, SubscriberId, Topic,
};
pub use ticker::Ticker;
pub use timeline::{AlarmTimeline, LevelCounts};
