//! Capped, time-tagged reading buffers.
//!
//! A [`SeriesBuffer`] is the bounded-memory primitive behind both the live
//! per-sensor history in the store (cap 100) and the chart-side datasets
//! (cap selected by date range). Appends are O(1) and evict the oldest
//! element on overflow; ordering is by arrival until [`resort`] is called.
//!
//! [`resort`]: SeriesBuffer::resort

use std::collections::VecDeque;

use time::OffsetDateTime;

use shield_types::Point;

/// A capped FIFO ring of reading points.
///
/// `push` never re-sorts: points typically arrive in time order, and the
/// chart-feed layer calls [`resort`](Self::resort) after each append to
/// tolerate out-of-order delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBuffer {
    points: VecDeque<Point>,
    capacity: usize,
}

impl SeriesBuffer {
    /// Create an empty buffer holding at most `capacity` points.
    ///
    /// A zero capacity is clamped to 1 so the buffer can always hold the
    /// latest reading.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.max(1).min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append a point, evicting the oldest if the buffer is full.
    pub fn push(&mut self, point: Point) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Stable re-sort by timestamp, oldest first.
    pub fn resort(&mut self) {
        self.points
            .make_contiguous()
            .sort_by_key(|p: &Point| p.timestamp);
    }

    /// Change the capacity, evicting the oldest points if shrinking.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// The most recently appended point.
    #[must_use]
    pub fn latest(&self) -> Option<&Point> {
        self.points.back()
    }

    /// Timestamp of the most recently appended point.
    #[must_use]
    pub fn latest_timestamp(&self) -> Option<OffsetDateTime> {
        self.points.back().map(|p| p.timestamp)
    }

    /// Iterate the points in buffer order.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    /// Copy the points out in buffer order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Point> {
        self.points.iter().copied().collect()
    }

    /// Number of buffered points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the buffer holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all points, keeping the capacity.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
