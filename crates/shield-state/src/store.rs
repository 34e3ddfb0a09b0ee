//! The authoritative in-process state: sensors, alarms, system stats and
//! connection status, with a typed publish/subscribe hub.
//!
//! All mutations run on a single timeline (the store is owned by one reactor
//! task and mutated through `&mut self`), so no locking is involved.
//! Subscribers receive owned event payloads and can never re-enter the store
//! mid-mutation.
//!
//! # Reconciliation policy
//!
//! Push events are not ordered relative to each other or to in-flight
//! snapshot fetches. Two rules keep the state consistent:
//!
//! - **Highest timestamp wins** for a sensor's headline value: a reading
//!   whose timestamp is older than the current `last_update` still lands in
//!   the series buffer (the chart layer re-sorts), but cannot regress
//!   `last_value`, `last_update` or the derived status.
//! - **Snapshots merge, they don't clobber**: [`EntityStore::merge_sensors`]
//!   refreshes metadata while preserving live readings for sensors that
//!   survive the re-seed, so a slow snapshot response cannot erase the
//!   effect of a newer push event. [`EntityStore::replace_sensors`] keeps
//!   its destructive contract for first load.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use time::OffsetDateTime;
use tracing::{debug, warn};

use shield_types::{
    Alarm, ConnectionStatus, HealthStatus, Point, RawReading, SensorMeta, SensorPatch, SensorType,
    SystemStats,
};

use crate::series::SeriesBuffer;
use crate::status::StatusRules;

/// Points kept per live sensor buffer.
pub const SENSOR_BUFFER_CAP: usize = 100;

/// Maximum retained alarms, newest first.
pub const ALARM_CAP: usize = 1000;

/// One sensor's live record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    /// Stable unique identifier.
    pub id: String,
    /// Sensor kind.
    pub sensor_type: SensorType,
    /// Free-text placement description.
    pub location: String,
    /// Derived health; recomputed on every reading and staleness sweep.
    pub status: HealthStatus,
    /// Latest sanitized value, if any reading carried one.
    pub last_value: Option<f64>,
    /// Timestamp of the newest applied reading.
    pub last_update: Option<OffsetDateTime>,
    /// Recent readings, oldest first (up to [`SENSOR_BUFFER_CAP`]).
    pub readings: SeriesBuffer,
}

impl Sensor {
    fn from_meta(meta: &SensorMeta) -> Self {
        Self {
            id: meta.sensor_id.clone(),
            sensor_type: meta.sensor_type,
            location: meta.location.clone().unwrap_or_default(),
            // The backend's "active" hint; real health arrives with the
            // first reading.
            status: HealthStatus::Normal,
            last_value: None,
            last_update: None,
            readings: SeriesBuffer::new(SENSOR_BUFFER_CAP),
        }
    }
}

/// State category a subscriber can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// The sensor collection changed in any way.
    Sensors,
    /// One sensor's metadata was upserted.
    SensorUpdated,
    /// One sensor received a reading.
    SensorData,
    /// The alarm collection changed in any way.
    Alarms,
    /// One alarm arrived via push.
    NewAlarm,
    /// The stats aggregate was replaced.
    SystemStats,
    /// The push-channel status changed.
    ConnectionStatus,
}

/// Owned payload delivered to subscribers.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Full sensor collection, ordered by id.
    Sensors(Vec<Sensor>),
    /// The upserted sensor record.
    SensorUpdated(Sensor),
    /// A sensor received a reading.
    SensorData {
        /// Full record after the reading was applied.
        sensor: Sensor,
        /// The point appended to the series buffer, or `None` when the
        /// value sanitized to no-data.
        point: Option<Point>,
    },
    /// Full alarm collection, newest first.
    Alarms(Vec<Alarm>),
    /// The alarm that just arrived.
    NewAlarm(Alarm),
    /// The replacement aggregate.
    SystemStats(SystemStats),
    /// New connection status with a human-readable message.
    Connection {
        /// The status value.
        status: ConnectionStatus,
        /// Display message for the indicator.
        message: String,
    },
}

impl StoreEvent {
    /// The topic this event belongs to.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            StoreEvent::Sensors(_) => Topic::Sensors,
            StoreEvent::SensorUpdated(_) => Topic::SensorUpdated,
            StoreEvent::SensorData { .. } => Topic::SensorData,
            StoreEvent::Alarms(_) => Topic::Alarms,
            StoreEvent::NewAlarm(_) => Topic::NewAlarm,
            StoreEvent::SystemStats(_) => Topic::SystemStats,
            StoreEvent::Connection { .. } => Topic::ConnectionStatus,
        }
    }
}

/// Handle returned by [`EntityStore::subscribe`]; pass to
/// [`EntityStore::unsubscribe`] to detach the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Box<dyn FnMut(&StoreEvent) + Send>;

/// Per-topic subscriber registry with insertion-order delivery.
#[derive(Default)]
struct Hub {
    subscribers: BTreeMap<Topic, Vec<(SubscriberId, Callback)>>,
    next_id: u64,
}

impl Hub {
    fn subscribe(&mut self, topic: Topic, callback: Callback) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.entry(topic).or_default().push((id, callback));
        id
    }

    fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        for list in self.subscribers.values_mut() {
            if let Some(pos) = list.iter().position(|(sid, _)| *sid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every subscriber of its topic, in insertion order.
    ///
    /// Each invocation is isolated: a panicking callback is logged and
    /// skipped without disturbing later callbacks or the registry.
    fn emit(&mut self, event: &StoreEvent) {
        let Some(list) = self.subscribers.get_mut(&event.topic()) else {
            return;
        };
        for (id, callback) in list.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(subscriber = id.0, topic = ?event.topic(), "store subscriber panicked");
            }
        }
    }
}

/// The authoritative dashboard state and its notification hub.
pub struct EntityStore {
    sensors: BTreeMap<String, Sensor>,
    alarms: Vec<Alarm>,
    stats: SystemStats,
    connection: (ConnectionStatus, String),
    rules: StatusRules,
    hub: Hub,
}

impl EntityStore {
    /// Create an empty store with the given status rules.
    #[must_use]
    pub fn new(rules: StatusRules) -> Self {
        Self {
            sensors: BTreeMap::new(),
            alarms: Vec::new(),
            stats: SystemStats::default(),
            connection: (
                ConnectionStatus::Disconnected,
                ConnectionStatus::Disconnected.default_message().to_string(),
            ),
            rules,
            hub: Hub::default(),
        }
    }

    /// The status rules in effect.
    #[must_use]
    pub fn rules(&self) -> &StatusRules {
        &self.rules
    }

    // ======================================================================
    // Subscriptions
    // ======================================================================

    /// Register a callback for one topic. Returns a handle for
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(
        &mut self,
        topic: Topic,
        callback: impl FnMut(&StoreEvent) + Send + 'static,
    ) -> SubscriberId {
        self.hub.subscribe(topic, Box::new(callback))
    }

    /// Detach a callback. Returns `false` if the handle was already gone.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    // ======================================================================
    // Sensor operations
    // ======================================================================

    /// Clear the sensor set and install one entry per input, with empty
    /// buffers and default status.
    pub fn replace_sensors(&mut self, metas: Vec<SensorMeta>) {
        self.sensors = metas
            .iter()
            .map(|m| (m.sensor_id.clone(), Sensor::from_meta(m)))
            .collect();
        self.notify_sensors();
    }

    /// Re-seed from a snapshot without clobbering live state.
    ///
    /// Metadata (type, location) is refreshed for every listed sensor, new
    /// sensors are installed, and sensors absent from the snapshot are
    /// removed, but readings, last values and status of surviving sensors
    /// are preserved, so a snapshot that raced a newer push event cannot
    /// undo it.
    pub fn merge_sensors(&mut self, metas: Vec<SensorMeta>) {
        let mut merged = BTreeMap::new();
        for meta in &metas {
            let sensor = match self.sensors.remove(&meta.sensor_id) {
                Some(mut existing) => {
                    existing.sensor_type = meta.sensor_type;
                    if let Some(location) = &meta.location {
                        existing.location = location.clone();
                    }
                    existing
                }
                None => Sensor::from_meta(meta),
            };
            merged.insert(meta.sensor_id.clone(), sensor);
        }
        self.sensors = merged;
        self.notify_sensors();
    }

    /// Create or partially update a sensor's metadata.
    ///
    /// Only the fields present in the patch are merged; readings and the
    /// latest value are never touched here.
    pub fn upsert_sensor(&mut self, patch: SensorPatch) {
        let sensor = self.sensors.entry(patch.id.clone()).or_insert_with(|| {
            Sensor::from_meta(&SensorMeta::new(patch.id.clone(), SensorType::Other))
        });
        if let Some(sensor_type) = patch.sensor_type {
            sensor.sensor_type = sensor_type;
        }
        if let Some(location) = patch.location {
            sensor.location = location;
        }
        if let Some(hint) = &patch.status_hint {
            // Advisory only; derived health takes over at the first reading.
            if hint != "active" {
                debug!(sensor = %patch.id, hint = %hint, "ignoring unrecognized status hint");
            }
        }

        let updated = sensor.clone();
        self.hub.emit(&StoreEvent::SensorUpdated(updated));
        self.notify_sensors();
    }

    /// Apply one reading to a sensor.
    ///
    /// Readings for unregistered ids are dropped (logged, not queued). The
    /// value is sanitized; if the reading is the newest seen for the sensor
    /// it becomes the headline value and the status is re-derived. Sanitized
    /// values are appended to the series buffer regardless of arrival order.
    pub fn apply_reading(
        &mut self,
        sensor_id: &str,
        raw: RawReading,
        timestamp: OffsetDateTime,
        now: OffsetDateTime,
    ) {
        let Some(sensor) = self.sensors.get_mut(sensor_id) else {
            debug!(sensor = %sensor_id, "dropping reading for unknown sensor");
            return;
        };

        let value = raw.sanitize();
        if value.is_none() {
            debug!(sensor = %sensor_id, ?raw, "reading value sanitized to no-data");
        }

        let newest = sensor.last_update.is_none_or(|lu| timestamp >= lu);
        if newest {
            sensor.last_value = value;
            sensor.last_update = Some(timestamp);
        }
        let point = value.map(|v| Point::new(v, timestamp));
        if let Some(point) = point {
            sensor.readings.push(point);
        }
        sensor.status =
            self.rules
                .derive(sensor.sensor_type, sensor.last_value, sensor.last_update, now);

        let sensor = sensor.clone();
        self.hub.emit(&StoreEvent::SensorData { sensor, point });
        self.notify_sensors();
    }

    /// Re-derive every sensor's status against the clock.
    ///
    /// Sensors silent past the offline window flip to offline with no new
    /// event required. Notifies `Sensors` only when something changed.
    pub fn sweep_stale(&mut self, now: OffsetDateTime) {
        let mut changed = false;
        for sensor in self.sensors.values_mut() {
            let status = self.rules.derive(
                sensor.sensor_type,
                sensor.last_value,
                sensor.last_update,
                now,
            );
            if status != sensor.status {
                debug!(sensor = %sensor.id, from = %sensor.status, to = %status, "status swept");
                sensor.status = status;
                changed = true;
            }
        }
        if changed {
            self.notify_sensors();
        }
    }

    // ======================================================================
    // Alarm operations
    // ======================================================================

    /// Install a full alarm collection, sorted newest-first by timestamp.
    pub fn replace_alarms(&mut self, mut alarms: Vec<Alarm>) {
        alarms.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alarms.truncate(ALARM_CAP);
        self.alarms = alarms;
        self.notify_alarms();
    }

    /// Prepend a pushed alarm, keeping arrival order and the cap.
    ///
    /// Arrival order deliberately differs from timestamp order: retransmitted
    /// events may carry older production timestamps.
    pub fn add_alarm(&mut self, alarm: Alarm) {
        self.alarms.insert(0, alarm.clone());
        self.alarms.truncate(ALARM_CAP);
        self.hub.emit(&StoreEvent::NewAlarm(alarm));
        self.notify_alarms();
    }

    /// Set the local acknowledged flag for an alarm, if present.
    ///
    /// Idempotent: acknowledging twice is a no-op on the second call, and
    /// no notification fires for a no-op. Returns whether the alarm exists.
    pub fn acknowledge_local(&mut self, alarm_id: u64) -> bool {
        let Some(alarm) = self.alarms.iter_mut().find(|a| a.id == alarm_id) else {
            debug!(alarm = alarm_id, "acknowledge for unknown alarm");
            return false;
        };
        if !alarm.acknowledged {
            alarm.acknowledged = true;
            self.notify_alarms();
        }
        true
    }

    // ======================================================================
    // Stats and connection status
    // ======================================================================

    /// Replace the stats aggregate wholesale.
    pub fn replace_stats(&mut self, stats: SystemStats) {
        self.stats = stats;
        self.hub.emit(&StoreEvent::SystemStats(stats));
    }

    /// Record a connection-status transition from the transport session.
    ///
    /// Repeated transitions to an identical status/message pair are
    /// suppressed.
    pub fn set_connection_status(&mut self, status: ConnectionStatus, message: impl Into<String>) {
        let message = message.into();
        if self.connection.0 == status && self.connection.1 == message {
            return;
        }
        self.connection = (status, message.clone());
        self.hub.emit(&StoreEvent::Connection { status, message });
    }

    // ======================================================================
    // Read access
    // ======================================================================

    /// Look up one sensor.
    #[must_use]
    pub fn sensor(&self, id: &str) -> Option<&Sensor> {
        self.sensors.get(id)
    }

    /// Iterate sensors in id order.
    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.values()
    }

    /// Number of registered sensors.
    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Alarms, newest first.
    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    /// Current stats aggregate.
    #[must_use]
    pub fn stats(&self) -> SystemStats {
        self.stats
    }

    /// Current connection status and message.
    #[must_use]
    pub fn connection(&self) -> (ConnectionStatus, &str) {
        (self.connection.0, &self.connection.1)
    }

    fn notify_sensors(&mut self) {
        let snapshot = self.sensors.values().cloned().collect();
        self.hub.emit(&StoreEvent::Sensors(snapshot));
    }

    fn notify_alarms(&mut self) {
        self.hub.emit(&StoreEvent::Alarms(self.alarms.clone()));
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("sensors", &self.sensors.len())
            .field("alarms", &self.alarms.len())
            .field("stats", &self.stats)
            .field("connection", &self.connection)
            .finish()
    }
}
