//! Chart-feed reconciliation.
//!
//! One [`ChartFeeder`] drives one chart (one chart per sensor type). It
//! maintains a dataset per sensor id, created lazily on the first qualifying
//! reading, and decouples event arrival rate from rendering cost with a
//! per-series throttle: the store always gets every reading, the chart only
//! redraws at most once per throttle window per series.
//!
//! Rendering itself is someone else's job: the feeder pushes instructions
//! through the [`ChartSink`] trait and never touches pixels.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use shield_types::{Point, SensorType};

use crate::series::SeriesBuffer;

/// Requested history window for a chart, with its point budget.
///
/// The caps approximate fixed-interval sampling over the window (5-minute
/// points for a day, and so on).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    /// Last 24 hours.
    #[default]
    Day,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
    /// Caller-defined window.
    Custom,
}

impl DateRange {
    /// Maximum points kept per dataset for this range.
    #[must_use]
    pub fn point_cap(&self) -> usize {
        match self {
            DateRange::Day => 288,
            DateRange::Week => 2016,
            DateRange::Month => 8640,
            DateRange::Custom => 10_000,
        }
    }

    /// History-fetch limit for repopulating a dataset in this range.
    #[must_use]
    pub fn fetch_limit(&self) -> usize {
        self.point_cap()
    }
}

/// Rendering boundary: the charting widget as this pipeline sees it.
///
/// `animate` is `false` for incremental live updates (redraw storms must
/// stay cheap) and `true` for full reloads.
pub trait ChartSink {
    /// Replace the rendered points for one series.
    fn redraw(&mut self, series: &str, points: &[Point], animate: bool);

    /// Remove every series from the chart.
    fn clear(&mut self);
}

/// Tuning for a chart feeder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeederOptions {
    /// Minimum gap between applied chart updates per series.
    pub throttle: Duration,
    /// Active history window.
    pub range: DateRange,
}

impl Default for FeederOptions {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(1000),
            range: DateRange::Day,
        }
    }
}

/// Feeds one chart from store notifications.
pub struct ChartFeeder<S: ChartSink> {
    chart: SensorType,
    sink: S,
    options: FeederOptions,
    active: bool,
    /// Device-selector filter; `None` means all sensors of the chart's type.
    filter: Option<HashSet<String>>,
    datasets: HashMap<String, SeriesBuffer>,
    last_applied: HashMap<String, OffsetDateTime>,
}

impl<S: ChartSink> ChartFeeder<S> {
    /// Create a feeder for one sensor type's chart.
    pub fn new(chart: SensorType, sink: S, options: FeederOptions) -> Self {
        Self {
            chart,
            sink,
            options,
            active: true,
            filter: None,
            datasets: HashMap::new(),
            last_applied: HashMap::new(),
        }
    }

    /// The sensor type this feeder charts.
    #[must_use]
    pub fn chart(&self) -> SensorType {
        self.chart
    }

    /// The active date range.
    #[must_use]
    pub fn range(&self) -> DateRange {
        self.options.range
    }

    /// Whether the chart's view is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activate or deactivate the feeder (view switched to/away).
    ///
    /// An inactive feeder applies nothing; the store keeps accumulating
    /// state and the next reload repopulates the chart.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Borrow the sink (test hook and render-loop access).
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Apply one reading to the chart, subject to filtering and throttling.
    ///
    /// Returns `true` when a redraw was issued.
    pub fn handle_reading(
        &mut self,
        sensor_id: &str,
        sensor_type: SensorType,
        point: Point,
        now: OffsetDateTime,
    ) -> bool {
        if !self.active || sensor_type != self.chart || self.excluded(sensor_id) {
            return false;
        }

        if let Some(last) = self.last_applied.get(sensor_id) {
            let gap_ms = (now - *last).whole_milliseconds();
            if gap_ms < self.options.throttle.as_millis() as i128 {
                return false;
            }
        }
        self.last_applied.insert(sensor_id.to_string(), now);

        let cap = self.options.range.point_cap();
        let dataset = self
            .datasets
            .entry(sensor_id.to_string())
            .or_insert_with(|| SeriesBuffer::new(cap));
        dataset.push(point);
        dataset.resort();

        self.sink.redraw(sensor_id, &dataset.to_vec(), false);
        true
    }

    /// Restrict the chart to a set of sensor ids, or `None` for all.
    ///
    /// Datasets for newly-excluded sensors are discarded; the caller follows
    /// up with a reload to repopulate the survivors.
    pub fn set_filter(&mut self, filter: Option<HashSet<String>>) {
        self.filter = filter;
        let filter = self.filter.as_ref();
        self.datasets.retain(|id, _| !Self::excluded_by(filter, id));
        self.last_applied.retain(|id, _| !Self::excluded_by(filter, id));
    }

    /// Discard every dataset and switch to a new range, ahead of a
    /// history-fetch repopulation.
    pub fn begin_reload(&mut self, range: DateRange) {
        debug!(chart = %self.chart, ?range, "chart reload");
        self.options.range = range;
        self.datasets.clear();
        self.last_applied.clear();
        self.sink.clear();
    }

    /// Install a freshly fetched history for one series.
    ///
    /// `points` arrive newest-first from the history endpoint; they are
    /// reversed, sorted and truncated to the range cap, then rendered with
    /// animation (full reloads are rare and user-initiated).
    pub fn seed_series(&mut self, sensor_id: &str, points: Vec<Point>) {
        if self.excluded(sensor_id) {
            return;
        }
        let mut dataset = SeriesBuffer::new(self.options.range.point_cap());
        for point in points.into_iter().rev() {
            dataset.push(point);
        }
        dataset.resort();

        self.sink.redraw(sensor_id, &dataset.to_vec(), true);
        self.datasets.insert(sensor_id.to_string(), dataset);
    }

    /// Points currently charted for one series (test hook).
    #[must_use]
    pub fn dataset(&self, sensor_id: &str) -> Option<Vec<Point>> {
        self.datasets.get(sensor_id).map(SeriesBuffer::to_vec)
    }

    /// Number of live datasets.
    #[must_use]
    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    fn excluded(&self, sensor_id: &str) -> bool {
        Self::excluded_by(self.filter.as_ref(), sensor_id)
    }

    fn excluded_by(filter: Option<&HashSet<String>>, sensor_id: &str) -> bool {
        filter.is_some_and(|f| !f.contains(sensor_id))
    }
}
