//! Core types for SHIELD sensor and alarm data.

use core::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::{Iso8601, Rfc3339};

use crate::error::ParseError;

/// Kind of structural-health sensor.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new sensor kinds
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SensorType {
    /// Relative humidity sensor (percent).
    Humidity,
    /// Vibration sensor (Hz).
    Vibration,
    /// Mechanical stress sensor (MPa).
    Stress,
    /// Any sensor kind this pipeline does not classify.
    Other,
}

// Deserialization goes through `parse` so unrecognized wire names land on
// `Other` instead of failing the whole payload.
impl<'de> Deserialize<'de> for SensorType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SensorType::parse(&raw))
    }
}

impl SensorType {
    /// Parse a sensor type from its wire name.
    ///
    /// Unrecognized names map to [`SensorType::Other`] rather than failing;
    /// a fleet may contain sensor kinds this dashboard does not chart.
    ///
    /// # Examples
    ///
    /// ```
    /// use shield_types::SensorType;
    ///
    /// assert_eq!(SensorType::parse("humidity"), SensorType::Humidity);
    /// assert_eq!(SensorType::parse("VIBRATION"), SensorType::Vibration);
    /// assert_eq!(SensorType::parse("tilt"), SensorType::Other);
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "humidity" => SensorType::Humidity,
            "vibration" => SensorType::Vibration,
            "stress" => SensorType::Stress,
            _ => SensorType::Other,
        }
    }

    /// Unit label for chart axes and card values.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            SensorType::Humidity => "%",
            SensorType::Vibration => "Hz",
            SensorType::Stress => "MPa",
            SensorType::Other => "",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorType::Humidity => write!(f, "humidity"),
            SensorType::Vibration => write!(f, "vibration"),
            SensorType::Stress => write!(f, "stress"),
            SensorType::Other => write!(f, "other"),
        }
    }
}

/// Derived health classification for a sensor.
///
/// # Ordering
///
/// Values are ordered by severity: `Normal < Warning < Critical < Offline`.
/// This allows threshold comparisons like
/// `if status >= HealthStatus::Warning { ... }`. A silent sensor ranks above
/// a loudly-critical one because it cannot be trusted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum HealthStatus {
    /// Latest value inside all configured bands.
    Normal = 0,
    /// Latest value inside a warning band.
    Warning = 1,
    /// Latest value inside a critical band.
    Critical = 2,
    /// No usable value, or no reading within the staleness window.
    Offline = 3,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Normal => write!(f, "normal"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
            HealthStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Severity of an alarm, ordered `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AlarmLevel {
    /// Informational notice.
    Info = 0,
    /// Threshold warning.
    Warning = 1,
    /// Critical threshold breach.
    Critical = 2,
}

impl AlarmLevel {
    /// Parse an alarm level from its wire name, defaulting to `Info` for
    /// anything unrecognized (the original producers default the same way).
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "critical" => AlarmLevel::Critical,
            "warning" => AlarmLevel::Warning,
            _ => AlarmLevel::Info,
        }
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmLevel::Info => write!(f, "info"),
            AlarmLevel::Warning => write!(f, "warning"),
            AlarmLevel::Critical => write!(f, "critical"),
        }
    }
}

/// State of the push-channel connection to the backend.
///
/// A single process-wide value; only the transport session produces
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection and none being attempted.
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Push channel is up.
    Connected,
    /// The channel reported a failure; its own retry policy applies.
    Error,
}

impl ConnectionStatus {
    /// Human-readable default message for the status indicator.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected from server",
            ConnectionStatus::Connecting => "Connecting to server...",
            ConnectionStatus::Connected => "Connected to server",
            ConnectionStatus::Error => "Connection error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

/// Serde helper for wire timestamps.
///
/// Serializes as RFC 3339; deserializes RFC 3339, the backend's offset-less
/// ISO 8601 strings, and integer Unix milliseconds.
pub mod flexible_timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    /// Serialize as RFC 3339.
    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::serialize(ts, serializer)
    }

    /// Deserialize from a string or millisecond timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => super::timestamp_from_unix_ms(ms).map_err(serde::de::Error::custom),
            Raw::Text(s) => super::parse_timestamp(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// One time-tagged reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Sanitized numeric value.
    pub value: f64,
    /// When the reading was produced.
    #[serde(with = "flexible_timestamp")]
    pub timestamp: OffsetDateTime,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub fn new(value: f64, timestamp: OffsetDateTime) -> Self {
        Self { value, timestamp }
    }
}

/// A raw reading value as it arrives off the wire, before sanitization.
///
/// Producers are inconsistent: some send numbers, some send numeric strings,
/// some omit the value entirely. Sanitization happens exactly once, at the
/// point the value enters the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReading {
    /// A numeric value (possibly non-finite).
    Number(f64),
    /// A string that may or may not parse as a number.
    Text(String),
    /// No value present in the payload.
    Missing,
}

impl RawReading {
    /// Sanitize the raw value.
    ///
    /// Numeric strings are parsed; non-finite or unparsable values become
    /// `None` ("no data"). NaN is never allowed to escape this function.
    ///
    /// # Examples
    ///
    /// ```
    /// use shield_types::RawReading;
    ///
    /// assert_eq!(RawReading::Number(42.5).sanitize(), Some(42.5));
    /// assert_eq!(RawReading::Text("17.25".into()).sanitize(), Some(17.25));
    /// assert_eq!(RawReading::Text("n/a".into()).sanitize(), None);
    /// assert_eq!(RawReading::Number(f64::NAN).sanitize(), None);
    /// assert_eq!(RawReading::Missing.sanitize(), None);
    /// ```
    #[must_use]
    pub fn sanitize(&self) -> Option<f64> {
        let value = match self {
            RawReading::Number(n) => *n,
            RawReading::Text(s) => s.trim().parse::<f64>().ok()?,
            RawReading::Missing => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawReading {
    fn from(value: f64) -> Self {
        RawReading::Number(value)
    }
}

impl From<&str> for RawReading {
    fn from(value: &str) -> Self {
        RawReading::Text(value.to_string())
    }
}

/// Sensor metadata as delivered by the snapshot endpoint and the
/// `sensor_connected` push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorMeta {
    /// Stable unique identifier.
    pub sensor_id: String,
    /// Sensor kind; absent, null or unrecognized kinds become `Other`.
    #[serde(default = "default_sensor_type", deserialize_with = "de_sensor_type")]
    pub sensor_type: SensorType,
    /// Free-text placement description.
    #[serde(default)]
    pub location: Option<String>,
    /// Status hint from the backend (e.g. `"active"`); advisory only, the
    /// derived health always wins once a reading arrives.
    #[serde(default)]
    pub status: Option<String>,
}

fn default_sensor_type() -> SensorType {
    SensorType::Other
}

// Snapshot records may carry `"sensor_type": null`.
fn de_sensor_type<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<SensorType, D::Error> {
    Ok(Option::<SensorType>::deserialize(deserializer)?.unwrap_or(SensorType::Other))
}

fn default_alarm_level() -> AlarmLevel {
    AlarmLevel::Info
}

// Producers occasionally invent levels; an unknown level must not fail a
// whole alarm fetch.
fn de_alarm_level<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<AlarmLevel, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(AlarmLevel::parse(&raw))
}

impl SensorMeta {
    /// Create metadata with just an id and type.
    #[must_use]
    pub fn new(sensor_id: impl Into<String>, sensor_type: SensorType) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            sensor_type,
            location: None,
            status: None,
        }
    }

    /// Set the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// A partial sensor update: only the present fields are merged.
///
/// Produced from metadata-bearing push events; never carries reading data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorPatch {
    /// Target sensor id.
    pub id: String,
    /// New sensor kind, if known.
    pub sensor_type: Option<SensorType>,
    /// New location, if known.
    pub location: Option<String>,
    /// Backend status hint, if present.
    pub status_hint: Option<String>,
}

impl From<SensorMeta> for SensorPatch {
    fn from(meta: SensorMeta) -> Self {
        Self {
            id: meta.sensor_id,
            sensor_type: Some(meta.sensor_type),
            location: meta.location,
            status_hint: meta.status,
        }
    }
}

/// A threshold alarm raised by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    /// Backend-assigned identifier.
    pub id: u64,
    /// Sensor the alarm refers to.
    pub sensor_id: String,
    /// Producer-side alarm category (e.g. `"threshold"`).
    #[serde(default, rename = "alarm_type")]
    pub kind: Option<String>,
    /// Severity.
    #[serde(default = "default_alarm_level", deserialize_with = "de_alarm_level")]
    pub level: AlarmLevel,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
    /// When the alarm was produced.
    #[serde(with = "flexible_timestamp")]
    pub timestamp: OffsetDateTime,
    /// Whether an operator has acknowledged the alarm. Local until a backend
    /// round-trip confirms it.
    #[serde(default)]
    pub acknowledged: bool,
}

/// Dashboard-wide aggregate counters, replaced wholesale on each fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    /// Sensors the backend considers active.
    pub active_sensors: u64,
    /// Alarms no operator has acknowledged yet.
    pub unacknowledged_alarms: u64,
    /// Readings received since local midnight.
    pub today_readings: u64,
}

/// Parse a wire timestamp string.
///
/// Accepts RFC 3339 (`2026-08-08T12:00:00Z`) as well as the offset-less
/// ISO 8601 form the backend emits (`2026-08-08T12:00:00.123456`), which is
/// assumed to be UTC.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, ParseError> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    time::PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
        .map(time::PrimitiveDateTime::assume_utc)
        .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))
}

/// Convert Unix milliseconds into a timestamp.
///
/// Returns an error for values outside the representable range.
pub fn timestamp_from_unix_ms(ms: i64) -> Result<OffsetDateTime, ParseError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .map_err(|_| ParseError::InvalidTimestamp(ms.to_string()))
}
