//! End-to-end pipeline tests: store notifications driving chart feeders and
//! the alarm timeline, the way the reactor wires them at runtime.

use std::sync::{Arc, Mutex};

use shield_state::{
    AlarmTimeline, ChartFeeder, ChartSink, EntityStore, FeederOptions, StatusRules, StoreEvent,
    Topic,
};
use shield_types::{
    Alarm, AlarmLevel, HealthStatus, Point, RawReading, SensorMeta, SensorType,
};
use time::OffsetDateTime;

fn ts_ms(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_000_000_000 + ms as i128 * 1_000_000)
        .unwrap()
}

#[derive(Clone, Default)]
struct RecordingSink {
    redraws: Arc<Mutex<Vec<(String, Vec<f64>)>>>,
}

impl ChartSink for RecordingSink {
    fn redraw(&mut self, series: &str, points: &[Point], _animate: bool) {
        self.redraws
            .lock()
            .unwrap()
            .push((series.to_string(), points.iter().map(|p| p.value).collect()));
    }

    fn clear(&mut self) {}
}

/// Store events forwarded through a subscription, then drained into the
/// feeder, the single-timeline shape the reactor uses.
fn drain_into_feeder(
    events: &Arc<Mutex<Vec<StoreEvent>>>,
    feeder: &mut ChartFeeder<RecordingSink>,
    now: OffsetDateTime,
) {
    for event in events.lock().unwrap().drain(..) {
        if let StoreEvent::SensorData {
            sensor,
            point: Some(point),
        } = event
        {
            feeder.handle_reading(&sensor.id, sensor.sensor_type, point, now);
        }
    }
}

#[test]
fn store_feeds_chart_with_throttling() {
    let mut store = EntityStore::new(StatusRules::default());
    store.replace_sensors(vec![SensorMeta::new("S2", SensorType::Humidity)]);

    let events: Arc<Mutex<Vec<StoreEvent>>> = Arc::default();
    let forward = Arc::clone(&events);
    store.subscribe(Topic::SensorData, move |event| {
        forward.lock().unwrap().push(event.clone());
    });

    let sink = RecordingSink::default();
    let mut feeder =
        ChartFeeder::new(SensorType::Humidity, sink.clone(), FeederOptions::default());

    // Three pushes within 500 ms with a 1000 ms throttle: only the first is
    // reflected in the chart dataset, but the store reflects every one.
    for (i, (value, ms)) in [(10.0, 0), (20.0, 250), (30.0, 500)].iter().enumerate() {
        store.apply_reading("S2", RawReading::Number(*value), ts_ms(*ms), ts_ms(*ms));
        drain_into_feeder(&events, &mut feeder, ts_ms(*ms));
        assert_eq!(events.lock().unwrap().len(), 0, "event {i} not drained");
    }

    assert_eq!(
        feeder.dataset("S2").unwrap().iter().map(|p| p.value).collect::<Vec<_>>(),
        vec![10.0]
    );
    assert_eq!(store.sensor("S2").unwrap().last_value, Some(30.0));
    assert_eq!(store.sensor("S2").unwrap().readings.len(), 3);

    // After the window elapses the chart catches up with the next reading.
    store.apply_reading("S2", RawReading::Number(40.0), ts_ms(1200), ts_ms(1200));
    drain_into_feeder(&events, &mut feeder, ts_ms(1200));
    assert_eq!(
        feeder.dataset("S2").unwrap().iter().map(|p| p.value).collect::<Vec<_>>(),
        vec![10.0, 40.0]
    );
    assert_eq!(sink.redraws.lock().unwrap().len(), 2);
}

#[test]
fn status_lifecycle_critical_normal_offline() {
    let mut store = EntityStore::new(StatusRules::default());
    store.replace_sensors(vec![
        SensorMeta::new("S1", SensorType::Humidity).with_location("A"),
    ]);

    store.apply_reading("S1", RawReading::Number(85.0), ts_ms(0), ts_ms(0));
    assert_eq!(store.sensor("S1").unwrap().status, HealthStatus::Critical);

    store.apply_reading("S1", RawReading::Number(50.0), ts_ms(1_000), ts_ms(1_000));
    assert_eq!(store.sensor("S1").unwrap().status, HealthStatus::Normal);

    // 301 s later, the staleness sweep alone flips it offline.
    store.sweep_stale(ts_ms(1_000 + 301_000));
    assert_eq!(store.sensor("S1").unwrap().status, HealthStatus::Offline);
}

#[test]
fn alarms_notification_rebuilds_timeline() {
    let mut store = EntityStore::new(StatusRules::default());
    let timeline = Arc::new(Mutex::new(AlarmTimeline::new()));

    let shared = Arc::clone(&timeline);
    store.subscribe(Topic::Alarms, move |event| {
        if let StoreEvent::Alarms(alarms) = event {
            shared.lock().unwrap().rebuild(alarms);
        }
    });

    for (id, level) in [(1, AlarmLevel::Critical), (2, AlarmLevel::Warning)] {
        store.add_alarm(Alarm {
            id,
            sensor_id: "S1".to_string(),
            kind: Some("threshold".to_string()),
            level,
            message: String::new(),
            timestamp: ts_ms(id as i64 * 1000),
            acknowledged: false,
        });
    }

    let timeline = timeline.lock().unwrap();
    let day = timeline.day(ts_ms(0).date());
    assert_eq!(day.critical, 1);
    assert_eq!(day.warning, 1);

    drop(timeline);
    // Acknowledging rebuilds again without changing counts.
    store.acknowledge_local(1);
}
