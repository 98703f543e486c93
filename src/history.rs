//! Fixed-capacity sliding windows over tracked points.
//!
//! Each tracked body point (head, left hand, right hand) keeps a FIFO
//! window of its recent positions. The classifiers read range and
//! variance statistics from these windows; nothing here interprets them.
//!
//! Capacity is fixed at construction and the backing buffer never grows,
//! so a push is O(1) and memory stays constant for the whole session.

use std::collections::VecDeque;

/// One recorded position of a tracked point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint {
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: u64,
}

impl TrackedPoint {
    pub fn new(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self { x, y, timestamp_ms }
    }
}

/// Which coordinate a statistic is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn pick(self, point: &TrackedPoint) -> f32 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
        }
    }
}

/// Bounded FIFO window of recent points. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    points: VecDeque<TrackedPoint>,
    capacity: usize,
}

impl SlidingWindow {
    /// Create an empty window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest one when full.
    pub fn push(&mut self, point: TrackedPoint) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    pub fn latest(&self) -> Option<&TrackedPoint> {
        self.points.back()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Points from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedPoint> {
        self.points.iter()
    }

    /// max - min of one coordinate over the whole window.
    pub fn range(&self, axis: Axis) -> Option<f32> {
        if self.points.is_empty() {
            return None;
        }
        let (min, max) = self.points.iter().map(|p| axis.pick(p)).fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), v| (min.min(v), max.max(v)),
        );
        Some(max - min)
    }

    /// Population variance of one coordinate over the whole window.
    pub fn variance(&self, axis: Axis) -> Option<f32> {
        self.recent_variance(axis, self.points.len())
    }

    /// Population variance of one coordinate over the newest `count` points.
    ///
    /// Returns `None` when fewer than `count` points are held or `count` is zero.
    pub fn recent_variance(&self, axis: Axis, count: usize) -> Option<f32> {
        if count == 0 || self.points.len() < count {
            return None;
        }
        let skip = self.points.len() - count;
        let n = count as f32;
        let mean = self.points.iter().skip(skip).map(|p| axis.pick(p)).sum::<f32>() / n;
        let variance = self
            .points
            .iter()
            .skip(skip)
            .map(|p| {
                let d = axis.pick(p) - mean;
                d * d
            })
            .sum::<f32>()
            / n;
        Some(variance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32, t: u64) -> TrackedPoint {
        TrackedPoint::new(x, y, t)
    }

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut window = SlidingWindow::new(3);
        for i in 0..5 {
            window.push(point(i as f32, 0.0, i));
        }
        assert_eq!(window.len(), 3);
        assert!(window.is_full());
        let xs: Vec<f32> = window.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
        assert_eq!(window.latest().map(|p| p.timestamp_ms), Some(4));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let window = SlidingWindow::new(0);
        assert_eq!(window.capacity(), 1);
    }

    #[test]
    fn test_range_and_variance() {
        let mut window = SlidingWindow::new(5);
        for (i, x) in [1.0, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
            window.push(point(*x, 0.5, i as u64));
        }
        assert_eq!(window.range(Axis::X), Some(4.0));
        assert!((window.variance(Axis::X).unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(window.variance(Axis::Y), Some(0.0));
    }

    #[test]
    fn test_recent_variance_uses_newest_points() {
        let mut window = SlidingWindow::new(10);
        for i in 0..5 {
            window.push(point(i as f32, 0.0, i));
        }
        for i in 5..8 {
            window.push(point(10.0, 0.0, i));
        }
        assert_eq!(window.recent_variance(Axis::X, 3), Some(0.0));
        assert!(window.recent_variance(Axis::X, 8).unwrap() > 1.0);
        assert_eq!(window.recent_variance(Axis::X, 9), None);
        assert_eq!(window.recent_variance(Axis::X, 0), None);
    }

    #[test]
    fn test_empty_window_statistics() {
        let window = SlidingWindow::new(4);
        assert_eq!(window.range(Axis::X), None);
        assert_eq!(window.variance(Axis::Y), None);
    }
}
