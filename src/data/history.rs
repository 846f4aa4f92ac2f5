//! Rolling history of metrics snapshots for the performance charts.

use std::collections::VecDeque;

use crate::source::PerformanceSnapshot;

/// Maximum number of historical snapshots to keep.
const MAX_HISTORY_SIZE: usize = 60;

/// Chart series shown until enough live samples have arrived.
pub const SAMPLE_LABELS: [&str; 7] =
    ["10:00", "10:05", "10:10", "10:15", "10:20", "10:25", "10:30"];
pub const SAMPLE_THROUGHPUT: [f64; 7] = [45.0, 52.0, 38.0, 61.0, 47.0, 55.0, 43.0];
pub const SAMPLE_LATENCY: [f64; 7] = [95.0, 88.0, 102.0, 85.0, 92.0, 89.0, 98.0];

/// Tracks throughput and latency over the last [`MAX_HISTORY_SIZE`]
/// metrics snapshots.
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Queries per second, oldest first.
    pub throughput: VecDeque<f64>,
    /// Average latency in milliseconds, oldest first.
    pub latency: VecDeque<f64>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new metrics snapshot
    pub fn record(&mut self, metrics: &PerformanceSnapshot) {
        push_capped(&mut self.throughput, metrics.queries_per_second);
        push_capped(&mut self.latency, metrics.average_latency_ms);
    }

    pub fn len(&self) -> usize {
        self.throughput.len()
    }

    pub fn is_empty(&self) -> bool {
        self.throughput.is_empty()
    }

    /// Whether the charts should show live data instead of the sample series.
    pub fn is_live(&self) -> bool {
        self.len() >= 2
    }

    /// Throughput as chart points `(x, y)`.
    pub fn throughput_points(&self) -> Vec<(f64, f64)> {
        if self.is_live() {
            to_points(self.throughput.iter().copied())
        } else {
            to_points(SAMPLE_THROUGHPUT.iter().copied())
        }
    }

    /// Latency as chart points `(x, y)`.
    pub fn latency_points(&self) -> Vec<(f64, f64)> {
        if self.is_live() {
            to_points(self.latency.iter().copied())
        } else {
            to_points(SAMPLE_LATENCY.iter().copied())
        }
    }
}

fn push_capped(values: &mut VecDeque<f64>, value: f64) {
    values.push_back(value);
    if values.len() > MAX_HISTORY_SIZE {
        values.pop_front();
    }
}

fn to_points(values: impl Iterator<Item = f64>) -> Vec<(f64, f64)> {
    values.enumerate().map(|(i, v)| (i as f64, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(qps: f64, latency: f64) -> PerformanceSnapshot {
        PerformanceSnapshot {
            queries_per_second: qps,
            average_latency_ms: latency,
            ..PerformanceSnapshot::default()
        }
    }

    #[test]
    fn test_falls_back_to_samples() {
        let mut history = History::new();
        assert_eq!(history.throughput_points().len(), SAMPLE_THROUGHPUT.len());

        history.record(&metrics(1.0, 10.0));
        assert!(!history.is_live());
        assert_eq!(history.latency_points()[0], (0.0, 95.0));

        history.record(&metrics(2.0, 20.0));
        assert!(history.is_live());
        assert_eq!(history.throughput_points(), vec![(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(history.latency_points(), vec![(0.0, 10.0), (1.0, 20.0)]);
    }

    #[test]
    fn test_history_is_capped() {
        let mut history = History::new();
        for i in 0..(MAX_HISTORY_SIZE + 5) {
            history.record(&metrics(i as f64, 0.0));
        }
        assert_eq!(history.len(), MAX_HISTORY_SIZE);
        assert_eq!(history.throughput.front(), Some(&5.0));
    }
}
