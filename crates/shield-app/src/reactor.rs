//! The composition root's reactor: one task owning the store and the
//! feeders, reacting to session events and periodic ticks.
//!
//! Every store mutation, notification and chart update happens on this
//! single timeline: push events, completed requests and timer ticks are
//! all just messages into the same loop, so mutations are never concurrent
//! and no locking exists anywhere in the pipeline.

use futures::future::join_all;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use shield_net::{ApiClient, PushEvent, SessionEvent};
use shield_state::{
    AlarmTimeline, ChartFeeder, ChartSink, DateRange, EntityStore, FeederOptions, StatusRules,
    StoreEvent, Topic,
};
use shield_types::{ConnectionStatus, Point, SensorType};

/// Messages from the periodic tickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Status-line heartbeat.
    Clock,
    /// Refetch the stats aggregate.
    StatsRefresh,
    /// Re-derive sensor health against the clock.
    StalenessSweep,
}

/// Headless chart sink: render instructions become log lines.
///
/// The real charting widget is outside this process; the sink records what
/// it would be told to draw.
#[derive(Debug, Clone)]
pub struct LogSink {
    chart: SensorType,
}

impl LogSink {
    /// Sink for one chart.
    #[must_use]
    pub fn new(chart: SensorType) -> Self {
        Self { chart }
    }
}

impl ChartSink for LogSink {
    fn redraw(&mut self, series: &str, points: &[Point], animate: bool) {
        debug!(
            chart = %self.chart,
            series = %series,
            points = points.len(),
            animate,
            "chart redraw"
        );
    }

    fn clear(&mut self) {
        debug!(chart = %self.chart, "chart cleared");
    }
}

/// Reactor tuning.
#[derive(Debug, Clone)]
pub struct ReactorOptions {
    /// Alarms fetched per snapshot.
    pub alarm_limit: usize,
    /// Feeder options shared by the per-type charts.
    pub feeder: FeederOptions,
    /// Whether a `Connected` transition triggers a snapshot re-seed.
    /// Disabled in simulation mode, where there is no backend to query.
    pub seed_on_connect: bool,
}

impl Default for ReactorOptions {
    fn default() -> Self {
        Self {
            alarm_limit: 50,
            feeder: FeederOptions::default(),
            seed_on_connect: true,
        }
    }
}

/// The single-threaded heart of the dashboard.
pub struct Reactor {
    store: EntityStore,
    client: ApiClient,
    feeders: Vec<ChartFeeder<LogSink>>,
    timeline: AlarmTimeline,
    options: ReactorOptions,
    store_events: mpsc::UnboundedReceiver<StoreEvent>,
}

impl Reactor {
    /// Build a reactor: store, subscriptions and one feeder per charted
    /// sensor type.
    #[must_use]
    pub fn new(client: ApiClient, rules: StatusRules, options: ReactorOptions) -> Self {
        let mut store = EntityStore::new(rules);

        // Store notifications fan out through the hub into the reactor's own
        // queue; the reactor drains it after every mutation, still on the
        // same timeline.
        let (tx, store_events) = mpsc::unbounded_channel();
        for topic in [
            Topic::SensorData,
            Topic::Alarms,
            Topic::NewAlarm,
            Topic::ConnectionStatus,
        ] {
            let tx = tx.clone();
            store.subscribe(topic, move |event| {
                let _ = tx.send(event.clone());
            });
        }

        let feeders = [SensorType::Humidity, SensorType::Vibration, SensorType::Stress]
            .into_iter()
            .map(|chart| ChartFeeder::new(chart, LogSink::new(chart), options.feeder.clone()))
            .collect();

        Self {
            store,
            client,
            feeders,
            timeline: AlarmTimeline::new(),
            options,
            store_events,
        }
    }

    /// The store (read access for the status line and tests).
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The alarm timeline buckets.
    #[must_use]
    pub fn timeline(&self) -> &AlarmTimeline {
        &self.timeline
    }

    /// The feeder for one sensor type's chart.
    #[must_use]
    pub fn feeder(&self, chart: SensorType) -> Option<&ChartFeeder<LogSink>> {
        self.feeders.iter().find(|f| f.chart() == chart)
    }

    /// Run until the session feed ends.
    pub async fn run(
        mut self,
        mut session: mpsc::Receiver<SessionEvent>,
        mut ticks: mpsc::Receiver<Tick>,
    ) {
        loop {
            tokio::select! {
                event = session.recv() => {
                    let Some(event) = event else {
                        info!("session feed ended, stopping reactor");
                        break;
                    };
                    self.on_session_event(event).await;
                }
                tick = ticks.recv() => {
                    let Some(tick) = tick else { break };
                    self.on_tick(tick).await;
                }
            }
        }
    }

    /// React to one session event.
    pub async fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Status { status, message } => {
                self.store.set_connection_status(status, message);
                if status == ConnectionStatus::Connected && self.options.seed_on_connect {
                    self.reseed().await;
                    self.reload_charts(self.options.feeder.range).await;
                }
            }
            SessionEvent::Push(push) => self.on_push(push),
        }
        self.pump();
    }

    /// React to one periodic tick.
    pub async fn on_tick(&mut self, tick: Tick) {
        match tick {
            Tick::Clock => {
                let (status, _) = self.store.connection();
                debug!(
                    sensors = self.store.sensor_count(),
                    alarms = self.store.alarms().len(),
                    connection = %status,
                    "clock tick"
                );
            }
            Tick::StatsRefresh => self.refresh_stats().await,
            Tick::StalenessSweep => self.store.sweep_stale(OffsetDateTime::now_utc()),
        }
        self.pump();
    }

    fn on_push(&mut self, push: PushEvent) {
        let now = OffsetDateTime::now_utc();
        match push {
            PushEvent::SensorUpdate {
                sensor_id,
                value,
                timestamp,
                meta,
            } => {
                // A reading can reach us before any snapshot listed its
                // sensor; register it from embedded metadata when possible.
                if self.store.sensor(&sensor_id).is_none()
                    && let Some(meta) = meta
                {
                    self.store.upsert_sensor(meta.into());
                }
                self.store
                    .apply_reading(&sensor_id, value, timestamp.unwrap_or(now), now);
            }
            PushEvent::AlarmUpdate { alarm } => self.store.add_alarm(alarm),
            PushEvent::SensorConnected { meta } => self.store.upsert_sensor(meta.into()),
        }
    }

    /// Acknowledge an alarm: backend round-trip first, local flag only on
    /// success.
    ///
    /// Returns whether the alarm is now acknowledged locally.
    pub async fn acknowledge_alarm(&mut self, alarm_id: u64) -> bool {
        let acknowledged = match self.client.acknowledge_alarm(alarm_id).await {
            Ok(ack) if ack.status == "success" => self.store.acknowledge_local(alarm_id),
            Ok(ack) => {
                warn!(alarm = alarm_id, message = %ack.message, "backend refused acknowledge");
                false
            }
            Err(e) => {
                warn!(alarm = alarm_id, error = %e, "acknowledge round-trip failed");
                false
            }
        };
        self.pump();
        acknowledged
    }

    /// View switched to or away from one chart.
    pub fn set_chart_active(&mut self, chart: SensorType, active: bool) {
        if let Some(feeder) = self.feeders.iter_mut().find(|f| f.chart() == chart) {
            feeder.set_active(active);
        }
    }

    /// Operator picked a new date range: discard and repopulate every chart.
    pub async fn change_range(&mut self, range: DateRange) {
        self.options.feeder.range = range;
        self.reload_charts(range).await;
    }

    /// Restrict one chart to a set of sensor ids (or `None` for all), then
    /// repopulate from fresh history.
    pub async fn filter_chart(
        &mut self,
        chart: SensorType,
        filter: Option<std::collections::HashSet<String>>,
    ) {
        if let Some(feeder) = self.feeders.iter_mut().find(|f| f.chart() == chart) {
            feeder.set_filter(filter);
        }
        let range = self.options.feeder.range;
        self.reload_charts(range).await;
    }

    /// Refetch the stats aggregate; failures leave the previous value.
    pub async fn refresh_stats(&mut self) {
        match self.client.dashboard_stats().await {
            Ok(stats) => self.store.replace_stats(stats),
            Err(e) => warn!(error = %e, "stats refresh failed, keeping previous stats"),
        }
        self.pump();
    }

    /// Re-seed the store from backend snapshots.
    ///
    /// Each fetch merges independently; a failed fetch leaves its category
    /// untouched.
    pub async fn reseed(&mut self) {
        match self.client.sensors().await {
            Ok(metas) => self.store.merge_sensors(metas),
            Err(e) => warn!(error = %e, "sensor snapshot failed, keeping current sensors"),
        }
        match self.client.alarms(self.options.alarm_limit, None).await {
            Ok(alarms) => self.store.replace_alarms(alarms),
            Err(e) => warn!(error = %e, "alarm fetch failed, keeping current alarms"),
        }
        match self.client.dashboard_stats().await {
            Ok(stats) => self.store.replace_stats(stats),
            Err(e) => warn!(error = %e, "stats fetch failed, keeping current stats"),
        }
        self.pump();
    }

    /// Discard and repopulate every chart from fresh history fetches.
    pub async fn reload_charts(&mut self, range: DateRange) {
        let ids_per_feeder: Vec<Vec<String>> = self
            .feeders
            .iter()
            .map(|feeder| {
                self.store
                    .sensors()
                    .filter(|s| s.sensor_type == feeder.chart())
                    .map(|s| s.id.clone())
                    .collect()
            })
            .collect();

        for (i, ids) in ids_per_feeder.into_iter().enumerate() {
            self.feeders[i].begin_reload(range);

            let client = &self.client;
            let fetches = ids.into_iter().map(|id| async move {
                let result = client.sensor_data(&id, range.fetch_limit()).await;
                (id, result)
            });
            for (id, result) in join_all(fetches).await {
                match result {
                    Ok(points) => self.feeders[i].seed_series(&id, points),
                    Err(e) => warn!(sensor = %id, error = %e, "history fetch failed"),
                }
            }
        }
    }

    /// Drain queued store notifications into the feeders and the timeline.
    pub fn pump(&mut self) {
        let now = OffsetDateTime::now_utc();
        while let Ok(event) = self.store_events.try_recv() {
            match event {
                StoreEvent::SensorData {
                    sensor,
                    point: Some(point),
                } => {
                    for feeder in &mut self.feeders {
                        feeder.handle_reading(&sensor.id, sensor.sensor_type, point, now);
                    }
                }
                StoreEvent::SensorData { .. } => {}
                StoreEvent::Alarms(alarms) => self.timeline.rebuild(&alarms),
                StoreEvent::NewAlarm(alarm) => info!(
                    alarm = alarm.id,
                    level = %alarm.level,
                    sensor = %alarm.sensor_id,
                    message = %alarm.message,
                    "alarm raised"
                ),
                StoreEvent::Connection { status, message } => {
                    info!(status = %status, message = %message, "connection status");
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_types::{Alarm, AlarmLevel, RawReading, SensorMeta};

    fn reactor(seed_on_connect: bool) -> Reactor {
        // Port 9 (discard) is never listened on; request paths exercise the
        // failure branches.
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        Reactor::new(
            client,
            StatusRules::default(),
            ReactorOptions {
                seed_on_connect,
                ..Default::default()
            },
        )
    }

    fn sensor_update(id: &str, value: f64) -> SessionEvent {
        SessionEvent::Push(PushEvent::SensorUpdate {
            sensor_id: id.to_string(),
            value: RawReading::Number(value),
            timestamp: Some(OffsetDateTime::now_utc()),
            meta: Some(SensorMeta::new(id, SensorType::Humidity).with_location("Floor 1")),
        })
    }

    #[tokio::test]
    async fn test_push_auto_registers_and_feeds_chart() {
        let mut r = reactor(false);
        r.on_session_event(sensor_update("H1", 42.0)).await;

        let sensor = r.store().sensor("H1").unwrap();
        assert_eq!(sensor.last_value, Some(42.0));
        assert_eq!(sensor.location, "Floor 1");

        let feeder = r.feeder(SensorType::Humidity).unwrap();
        assert_eq!(feeder.dataset("H1").unwrap().len(), 1);
        // The other charts ignored it.
        assert_eq!(r.feeder(SensorType::Vibration).unwrap().dataset_count(), 0);
    }

    #[tokio::test]
    async fn test_alarm_push_rebuilds_timeline() {
        let mut r = reactor(false);
        let now = OffsetDateTime::now_utc();
        r.on_session_event(SessionEvent::Push(PushEvent::AlarmUpdate {
            alarm: Alarm {
                id: 1,
                sensor_id: "H1".to_string(),
                kind: None,
                level: AlarmLevel::Critical,
                message: "test".to_string(),
                timestamp: now,
                acknowledged: false,
            },
        }))
        .await;

        assert_eq!(r.store().alarms().len(), 1);
        assert_eq!(r.timeline().day(now.date()).critical, 1);
    }

    #[tokio::test]
    async fn test_status_transition_reaches_store() {
        let mut r = reactor(false);
        r.on_session_event(SessionEvent::Status {
            status: ConnectionStatus::Connected,
            message: "Connected to server".to_string(),
        })
        .await;
        assert_eq!(r.store().connection().0, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_failed_reseed_leaves_state_untouched() {
        let mut r = reactor(true);
        r.on_session_event(sensor_update("H1", 42.0)).await;

        // Connected triggers a reseed against an unreachable backend; every
        // category must survive.
        r.on_session_event(SessionEvent::Status {
            status: ConnectionStatus::Connected,
            message: "Connected to server".to_string(),
        })
        .await;

        assert_eq!(r.store().sensor("H1").unwrap().last_value, Some(42.0));
    }

    #[tokio::test]
    async fn test_acknowledge_requires_backend_success() {
        let mut r = reactor(false);
        r.on_session_event(sensor_update("H1", 42.0)).await;
        r.on_session_event(SessionEvent::Push(PushEvent::AlarmUpdate {
            alarm: Alarm {
                id: 7,
                sensor_id: "H1".to_string(),
                kind: None,
                level: AlarmLevel::Warning,
                message: "test".to_string(),
                timestamp: OffsetDateTime::now_utc(),
                acknowledged: false,
            },
        }))
        .await;

        // The backend is unreachable, so the local flag must stay clear.
        assert!(!r.acknowledge_alarm(7).await);
        assert!(!r.store().alarms()[0].acknowledged);
    }

    #[tokio::test]
    async fn test_inactive_chart_ignores_readings() {
        let mut r = reactor(false);
        r.set_chart_active(SensorType::Humidity, false);
        r.on_session_event(sensor_update("H1", 42.0)).await;

        // State store updated, chart untouched.
        assert_eq!(r.store().sensor("H1").unwrap().last_value, Some(42.0));
        assert_eq!(r.feeder(SensorType::Humidity).unwrap().dataset_count(), 0);
    }

    #[tokio::test]
    async fn test_staleness_tick_sweeps() {
        let mut r = reactor(false);
        r.on_session_event(SessionEvent::Push(PushEvent::SensorUpdate {
            sensor_id: "H1".to_string(),
            value: RawReading::Number(42.0),
            timestamp: Some(OffsetDateTime::now_utc() - time::Duration::seconds(400)),
            meta: Some(SensorMeta::new("H1", SensorType::Humidity)),
        }))
        .await;

        r.on_tick(Tick::StalenessSweep).await;
        assert_eq!(
            r.store().sensor("H1").unwrap().status,
            shield_types::HealthStatus::Offline
        );
    }
}
