//! Alarm timeline bucketing.
//!
//! The timeline chart shows alarm counts per calendar day, split by level.
//! Buckets are rebuilt wholesale from the current alarm collection on every
//! alarms notification; with the collection capped at 1000 entries a full
//! rebuild is cheaper than getting incremental maintenance right.

use std::collections::BTreeMap;

use time::Date;

use shield_types::{Alarm, AlarmLevel};

/// Alarm counts for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelCounts {
    /// Critical alarms that day.
    pub critical: u32,
    /// Warning alarms that day.
    pub warning: u32,
    /// Informational alarms that day.
    pub info: u32,
}

impl LevelCounts {
    fn bump(&mut self, level: AlarmLevel) {
        match level {
            AlarmLevel::Critical => self.critical += 1,
            AlarmLevel::Warning => self.warning += 1,
            AlarmLevel::Info => self.info += 1,
        }
    }

    /// Total alarms that day across all levels.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.critical + self.warning + self.info
    }
}

/// Per-day, per-level alarm counts for the timeline chart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmTimeline {
    buckets: BTreeMap<Date, LevelCounts>,
}

impl AlarmTimeline {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the full bucket map from the current alarm collection.
    pub fn rebuild(&mut self, alarms: &[Alarm]) {
        self.buckets.clear();
        for alarm in alarms {
            self.buckets
                .entry(alarm.timestamp.date())
                .or_default()
                .bump(alarm.level);
        }
    }

    /// Buckets in ascending day order.
    #[must_use]
    pub fn buckets(&self) -> &BTreeMap<Date, LevelCounts> {
        &self.buckets
    }

    /// Counts for one day, zero if no alarms.
    #[must_use]
    pub fn day(&self, date: Date) -> LevelCounts {
        self.buckets.get(&date).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn day_of(year: i32, month: u8, day: u8) -> Date {
        Date::from_calendar_date(year, time::Month::try_from(month).unwrap(), day).unwrap()
    }

    fn alarm(id: u64, level: AlarmLevel, ts: &str) -> Alarm {
        Alarm {
            id,
            sensor_id: "S1".to_string(),
            kind: None,
            level,
            message: String::new(),
            timestamp: OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339)
                .unwrap(),
            acknowledged: false,
        }
    }

    #[test]
    fn test_buckets_by_day_and_level() {
        let mut timeline = AlarmTimeline::new();
        timeline.rebuild(&[
            alarm(1, AlarmLevel::Critical, "2026-08-07T10:00:00Z"),
            alarm(2, AlarmLevel::Warning, "2026-08-07T23:59:59Z"),
            alarm(3, AlarmLevel::Warning, "2026-08-08T00:00:00Z"),
            alarm(4, AlarmLevel::Info, "2026-08-08T12:00:00Z"),
        ]);

        assert_eq!(timeline.buckets().len(), 2);
        let day1 = timeline.day(day_of(2026, 8, 7));
        assert_eq!((day1.critical, day1.warning, day1.info), (1, 1, 0));
        let day2 = timeline.day(day_of(2026, 8, 8));
        assert_eq!((day2.critical, day2.warning, day2.info), (0, 1, 1));
        assert_eq!(day2.total(), 2);
    }

    #[test]
    fn test_rebuild_replaces_previous_buckets() {
        let mut timeline = AlarmTimeline::new();
        timeline.rebuild(&[alarm(1, AlarmLevel::Critical, "2026-08-01T00:00:00Z")]);
        assert_eq!(timeline.buckets().len(), 1);

        timeline.rebuild(&[alarm(2, AlarmLevel::Info, "2026-08-05T00:00:00Z")]);
        assert_eq!(timeline.buckets().len(), 1);
        assert_eq!(timeline.day(day_of(2026, 8, 1)).total(), 0);
        assert_eq!(timeline.day(day_of(2026, 8, 5)).info, 1);
    }

    #[test]
    fn test_empty_rebuild() {
        let mut timeline = AlarmTimeline::new();
        timeline.rebuild(&[alarm(1, AlarmLevel::Info, "2026-08-01T00:00:00Z")]);
        timeline.rebuild(&[]);
        assert!(timeline.buckets().is_empty());
    }
}
