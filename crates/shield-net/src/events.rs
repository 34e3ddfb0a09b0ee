//! Typed push events and defensive payload normalization.
//!
//! Producers are not consistent: `sensor_update` may carry its value nested
//! under `data.value` or as a bare `value`; `alarm_update` may nest the
//! alarm object or flatten its fields; timestamps arrive as RFC 3339
//! strings, offset-less ISO 8601 strings, or Unix milliseconds. Everything
//! is normalized here, exactly once, at the ingestion boundary; downstream
//! code only ever sees [`PushEvent`].

use serde_json::Value;
use time::OffsetDateTime;

use shield_types::{
    Alarm, AlarmLevel, ParseError, ParseResult, RawReading, SensorMeta, SensorType,
    parse_timestamp, timestamp_from_unix_ms,
};

/// A normalized backend-initiated message.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// One sensor produced a reading.
    SensorUpdate {
        /// Target sensor.
        sensor_id: String,
        /// Raw value, sanitized by the store.
        value: RawReading,
        /// Production timestamp; `None` when the payload carried none, in
        /// which case the reactor substitutes arrival time.
        timestamp: Option<OffsetDateTime>,
        /// Embedded metadata, when the producer includes type/location with
        /// its data (used to auto-register sensors seen before any
        /// snapshot).
        meta: Option<SensorMeta>,
    },
    /// The backend raised an alarm.
    AlarmUpdate {
        /// The normalized alarm record.
        alarm: Alarm,
    },
    /// A sensor was observed for the first time.
    SensorConnected {
        /// The new sensor's metadata.
        meta: SensorMeta,
    },
}

/// Parse one push event by name and payload.
///
/// Unknown names and malformed envelopes return errors for the session to
/// log and drop; they never propagate as faults.
pub fn parse_event(name: &str, payload: &Value) -> ParseResult<PushEvent> {
    match name {
        "sensor_update" => parse_sensor_update(payload),
        "alarm_update" => parse_alarm_update(payload),
        "sensor_connected" => parse_sensor_connected(payload),
        other => Err(ParseError::UnknownEvent(other.to_string())),
    }
}

fn parse_sensor_update(payload: &Value) -> ParseResult<PushEvent> {
    let sensor_id = required_str(payload, "sensor_id")?;
    let data = payload.get("data").filter(|d| d.is_object());

    // `data.value` from the backend relay, bare `value` from direct
    // producers.
    let value = raw_reading(
        data.and_then(|d| d.get("value"))
            .or_else(|| payload.get("value")),
    );

    // Envelope timestamp first, then the inner data timestamp.
    let timestamp = payload
        .get("timestamp")
        .or_else(|| data.and_then(|d| d.get("timestamp")))
        .and_then(timestamp_value);

    let meta = data.and_then(|d| embedded_meta(&sensor_id, d));

    Ok(PushEvent::SensorUpdate {
        sensor_id,
        value,
        timestamp,
        meta,
    })
}

fn parse_alarm_update(payload: &Value) -> ParseResult<PushEvent> {
    // Nested shape: {sensor_id, alarm: {...}, timestamp}. Flat shape:
    // {sensor_id, level, message, timestamp}.
    let body = payload.get("alarm").filter(|a| a.is_object()).unwrap_or(payload);

    let sensor_id = required_str(body, "sensor_id")
        .or_else(|_| required_str(payload, "sensor_id"))?;

    let timestamp = body
        .get("timestamp")
        .or_else(|| payload.get("timestamp"))
        .and_then(timestamp_value)
        .ok_or_else(|| ParseError::MalformedEvent("alarm_update without timestamp".to_string()))?;

    let level = body
        .get("level")
        .and_then(Value::as_str)
        .map(AlarmLevel::parse)
        .unwrap_or(AlarmLevel::Info);

    let alarm = Alarm {
        id: body.get("id").and_then(Value::as_u64).unwrap_or(0),
        sensor_id,
        kind: body
            .get("alarm_type")
            .and_then(Value::as_str)
            .map(String::from),
        level,
        message: body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        timestamp,
        acknowledged: body
            .get("acknowledged")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };

    Ok(PushEvent::AlarmUpdate { alarm })
}

fn parse_sensor_connected(payload: &Value) -> ParseResult<PushEvent> {
    let sensor_id = required_str(payload, "sensor_id")?;
    let meta = SensorMeta {
        sensor_id,
        sensor_type: payload
            .get("sensor_type")
            .and_then(Value::as_str)
            .map(SensorType::parse)
            .unwrap_or(SensorType::Other),
        location: payload
            .get("location")
            .and_then(Value::as_str)
            .map(String::from),
        status: payload
            .get("status")
            .and_then(Value::as_str)
            .map(String::from),
    };
    Ok(PushEvent::SensorConnected { meta })
}

/// Metadata embedded in a `sensor_update`'s data object, if any.
fn embedded_meta(sensor_id: &str, data: &Value) -> Option<SensorMeta> {
    let sensor_type = data.get("type").and_then(Value::as_str);
    let location = data.get("location").and_then(Value::as_str);
    if sensor_type.is_none() && location.is_none() {
        return None;
    }
    Some(SensorMeta {
        sensor_id: sensor_id.to_string(),
        sensor_type: sensor_type.map(SensorType::parse).unwrap_or(SensorType::Other),
        location: location.map(String::from),
        status: None,
    })
}

fn required_str(payload: &Value, field: &str) -> ParseResult<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| ParseError::MalformedEvent(format!("missing field: {field}")))
}

/// Interpret a JSON value as a raw reading.
fn raw_reading(value: Option<&Value>) -> RawReading {
    match value {
        Some(Value::Number(n)) => RawReading::Number(n.as_f64().unwrap_or(f64::NAN)),
        Some(Value::String(s)) => RawReading::Text(s.clone()),
        _ => RawReading::Missing,
    }
}

/// Interpret a JSON value as a timestamp (string or Unix milliseconds).
fn timestamp_value(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(s) => parse_timestamp(s).ok(),
        Value::Number(n) => n.as_i64().and_then(|ms| timestamp_from_unix_ms(ms).ok()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensor_update_nested_value() {
        let payload = json!({
            "sensor_id": "HUMID_001",
            "data": {"type": "humidity", "value": 64.2, "location": "Building A - Floor 1"},
            "timestamp": "2026-08-08T10:00:00Z",
        });
        let event = parse_event("sensor_update", &payload).unwrap();
        let PushEvent::SensorUpdate {
            sensor_id,
            value,
            timestamp,
            meta,
        } = event
        else {
            panic!("wrong variant");
        };
        assert_eq!(sensor_id, "HUMID_001");
        assert_eq!(value.sanitize(), Some(64.2));
        assert!(timestamp.is_some());
        let meta = meta.unwrap();
        assert_eq!(meta.sensor_type, SensorType::Humidity);
        assert_eq!(meta.location.as_deref(), Some("Building A - Floor 1"));
    }

    #[test]
    fn test_sensor_update_bare_value() {
        let payload = json!({"sensor_id": "S1", "value": "17.5", "timestamp": 1786536000000i64});
        let event = parse_event("sensor_update", &payload).unwrap();
        let PushEvent::SensorUpdate {
            value, timestamp, meta, ..
        } = event
        else {
            panic!("wrong variant");
        };
        assert_eq!(value.sanitize(), Some(17.5));
        assert_eq!(timestamp.unwrap().unix_timestamp(), 1_786_536_000);
        assert!(meta.is_none());
    }

    #[test]
    fn test_sensor_update_missing_value_is_no_data() {
        let payload = json!({"sensor_id": "S1", "data": {}, "timestamp": "2026-08-08T10:00:00Z"});
        let event = parse_event("sensor_update", &payload).unwrap();
        let PushEvent::SensorUpdate { value, .. } = event else {
            panic!("wrong variant");
        };
        assert_eq!(value.sanitize(), None);
    }

    #[test]
    fn test_sensor_update_without_timestamp() {
        let payload = json!({"sensor_id": "S1", "value": 1.0});
        let event = parse_event("sensor_update", &payload).unwrap();
        let PushEvent::SensorUpdate { timestamp, .. } = event else {
            panic!("wrong variant");
        };
        assert!(timestamp.is_none());
    }

    #[test]
    fn test_sensor_update_requires_sensor_id() {
        let payload = json!({"value": 1.0});
        assert!(matches!(
            parse_event("sensor_update", &payload),
            Err(ParseError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_alarm_update_nested_shape() {
        let payload = json!({
            "sensor_id": "VIBR_001",
            "alarm": {
                "id": 12,
                "sensor_id": "VIBR_001",
                "alarm_type": "threshold",
                "level": "critical",
                "message": "Vibration exceeds 50 Hz",
                "timestamp": "2026-08-08T10:15:00.123456",
                "acknowledged": false,
            },
            "timestamp": "2026-08-08T10:15:01Z",
        });
        let event = parse_event("alarm_update", &payload).unwrap();
        let PushEvent::AlarmUpdate { alarm } = event else {
            panic!("wrong variant");
        };
        assert_eq!(alarm.id, 12);
        assert_eq!(alarm.level, AlarmLevel::Critical);
        assert_eq!(alarm.kind.as_deref(), Some("threshold"));
        // The alarm's own timestamp wins over the envelope's.
        assert_eq!(alarm.timestamp.unix_timestamp() % 60, 0);
    }

    #[test]
    fn test_alarm_update_flat_shape() {
        let payload = json!({
            "sensor_id": "STRESS_001",
            "level": "warning",
            "message": "Stress elevated",
            "timestamp": "2026-08-08T11:00:00Z",
        });
        let event = parse_event("alarm_update", &payload).unwrap();
        let PushEvent::AlarmUpdate { alarm } = event else {
            panic!("wrong variant");
        };
        assert_eq!(alarm.id, 0);
        assert_eq!(alarm.sensor_id, "STRESS_001");
        assert_eq!(alarm.level, AlarmLevel::Warning);
    }

    #[test]
    fn test_alarm_update_unknown_level_defaults_to_info() {
        let payload = json!({
            "sensor_id": "S1",
            "level": "purple",
            "timestamp": "2026-08-08T11:00:00Z",
        });
        let PushEvent::AlarmUpdate { alarm } = parse_event("alarm_update", &payload).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(alarm.level, AlarmLevel::Info);
    }

    #[test]
    fn test_alarm_update_requires_timestamp() {
        let payload = json!({"sensor_id": "S1", "level": "info"});
        assert!(parse_event("alarm_update", &payload).is_err());
    }

    #[test]
    fn test_sensor_connected() {
        let payload = json!({
            "sensor_id": "STRESS_002",
            "sensor_type": "stress",
            "location": "Building C - Pillar 2",
            "status": "active",
            "first_seen": "2026-08-08T09:00:00Z",
        });
        let event = parse_event("sensor_connected", &payload).unwrap();
        let PushEvent::SensorConnected { meta } = event else {
            panic!("wrong variant");
        };
        assert_eq!(meta.sensor_id, "STRESS_002");
        assert_eq!(meta.sensor_type, SensorType::Stress);
        assert_eq!(meta.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_unknown_event_name() {
        assert!(matches!(
            parse_event("mystery", &json!({})),
            Err(ParseError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_non_numeric_value_shapes_become_missing() {
        let payload = json!({"sensor_id": "S1", "value": [1, 2, 3]});
        let PushEvent::SensorUpdate { value, .. } =
            parse_event("sensor_update", &payload).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(value, RawReading::Missing);
    }
}
