//! Traffic simulator: realistic sensor readings and threshold alarms
//! through a mock channel, so the full pipeline runs without a backend.
//!
//! Value envelopes and alarm triggering mirror the fleet's real behavior:
//! humidity hovers in the comfortable band with occasional excursions,
//! vibration is mostly calm with spikes, stress drifts across the lower
//! half of its range.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use shield_net::mock::MockChannelHandle;
use shield_types::{AlarmLevel, SensorType};

/// One simulated sensor.
#[derive(Debug, Clone)]
pub struct SimSensor {
    /// Sensor id, e.g. `HUMID_001`.
    pub id: String,
    /// Sensor kind.
    pub sensor_type: SensorType,
    /// Placement label.
    pub location: String,
}

impl SimSensor {
    fn new(id: &str, sensor_type: SensorType, location: &str) -> Self {
        Self {
            id: id.to_string(),
            sensor_type,
            location: location.to_string(),
        }
    }
}

/// Simulator tuning.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Gap between rounds of readings (one reading per sensor per round).
    pub interval: Duration,
    /// The simulated fleet.
    pub sensors: Vec<SimSensor>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            sensors: vec![
                SimSensor::new("HUMID_001", SensorType::Humidity, "Building A - Floor 1"),
                SimSensor::new("HUMID_002", SensorType::Humidity, "Building A - Floor 2"),
                SimSensor::new("VIBR_001", SensorType::Vibration, "Building B - Foundation"),
                SimSensor::new("VIBR_002", SensorType::Vibration, "Building B - Bridge"),
                SimSensor::new("STRESS_001", SensorType::Stress, "Building C - Pillar 1"),
                SimSensor::new("STRESS_002", SensorType::Stress, "Building C - Pillar 2"),
            ],
        }
    }
}

/// A running traffic simulator.
pub struct Simulator {
    handle: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl Simulator {
    /// Start generating traffic into the given channel handle.
    ///
    /// Opens the channel first, so the session reports `Connected` before
    /// the first reading arrives.
    pub fn start(channel: MockChannelHandle, options: SimOptions) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            info!(sensors = options.sensors.len(), "simulator started");
            channel.open();

            let mut rng = StdRng::from_os_rng();
            let mut alarm_id: u64 = 1;
            let mut interval = interval_at(Instant::now() + options.interval, options.interval);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("simulator cancelled");
                        channel.close("simulation over");
                        break;
                    }
                    _ = interval.tick() => {
                        for sensor in &options.sensors {
                            emit_round(&channel, sensor, &mut rng, &mut alarm_id);
                        }
                    }
                }
            }
        });

        Self { handle, cancel }
    }

    /// Stop the simulator.
    pub fn close(self) {
        self.cancel.cancel();
    }

    /// Whether the generator task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn emit_round(channel: &MockChannelHandle, sensor: &SimSensor, rng: &mut StdRng, alarm_id: &mut u64) {
    let value = generate_value(sensor.sensor_type, rng);
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    channel.message(
        "sensor_update",
        json!({
            "sensor_id": sensor.id,
            "data": {
                "type": sensor.sensor_type.to_string(),
                "value": (value * 100.0).round() / 100.0,
                "location": sensor.location,
            },
            "timestamp": timestamp,
        }),
    );

    if let Some(level) = alarm_level(sensor.sensor_type, value) {
        let id = *alarm_id;
        *alarm_id += 1;
        channel.message(
            "alarm_update",
            json!({
                "sensor_id": sensor.id,
                "alarm": {
                    "id": id,
                    "sensor_id": sensor.id,
                    "alarm_type": "threshold",
                    "level": level.to_string(),
                    "message": format!(
                        "{} {} reading {:.1}{} at {}",
                        level, sensor.sensor_type, value,
                        sensor.sensor_type.unit(), sensor.location
                    ),
                    "timestamp": timestamp,
                    "acknowledged": false,
                },
                "timestamp": timestamp,
            }),
        );
    }
}

/// Per-type value envelope: a comfortable base plus noise, clamped to the
/// physical range.
fn generate_value(sensor_type: SensorType, rng: &mut StdRng) -> f64 {
    match sensor_type {
        SensorType::Humidity => {
            let base: f64 = rng.random_range(35.0..65.0);
            let noise: f64 = rng.random_range(-5.0..5.0);
            (base + noise).clamp(0.0, 100.0)
        }
        SensorType::Vibration => {
            let base: f64 = rng.random_range(0.0..15.0);
            let noise: f64 = rng.random_range(-2.0..8.0);
            (base + noise).max(0.0)
        }
        SensorType::Stress => {
            let base: f64 = rng.random_range(10.0..45.0);
            let noise: f64 = rng.random_range(-5.0..10.0);
            (base + noise).max(0.0)
        }
        SensorType::Other => rng.random_range(0.0..100.0),
        _ => rng.random_range(0.0..100.0),
    }
}

/// Alarm trigger bands, matching the backend's producers.
fn alarm_level(sensor_type: SensorType, value: f64) -> Option<AlarmLevel> {
    let (warning, critical) = match sensor_type {
        SensorType::Humidity => ((70.0, 80.0), (80.0, 100.0)),
        SensorType::Vibration => ((20.0, 50.0), (50.0, 100.0)),
        SensorType::Stress => ((60.0, 80.0), (80.0, 100.0)),
        SensorType::Other => return None,
        _ => return None,
    };

    if value >= critical.0 && value <= critical.1 {
        Some(AlarmLevel::Critical)
    } else if value >= warning.0 && value < warning.1 {
        Some(AlarmLevel::Warning)
    } else {
        None
    }
}
