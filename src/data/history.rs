//! Publish history for the sync view's sparkline and rate.

use std::collections::VecDeque;
use std::time::Instant;

/// Maximum number of samples to keep.
const MAX_HISTORY_SIZE: usize = 60;

/// Samples of the update bus publish counter over time.
#[derive(Debug, Clone, Default)]
pub struct PublishHistory {
    samples: VecDeque<(Instant, u64)>,
}

impl PublishHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the publish counter as of `at`.
    pub fn record(&mut self, at: Instant, publishes: u64) {
        self.samples.push_back((at, publishes));
        if self.samples.len() > MAX_HISTORY_SIZE {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Publishes between consecutive samples, normalized to 0-7 for 8 bar levels.
    ///
    /// Returns an empty Vec if there's not enough history.
    pub fn sparkline(&self) -> Vec<u8> {
        let deltas = self.deltas();
        if deltas.is_empty() {
            return Vec::new();
        }

        let max = deltas.iter().copied().max().unwrap_or(1).max(1) as f64;
        deltas
            .iter()
            .map(|&v| ((v as f64 / max * 7.0) as u8).min(7))
            .collect()
    }

    /// Publishes per second over the last interval.
    pub fn rate(&self) -> Option<f64> {
        let len = self.samples.len();
        if len < 2 {
            return None;
        }
        let (then, before) = self.samples[len - 2];
        let (now, after) = self.samples[len - 1];
        let elapsed = now.duration_since(then).as_secs_f64();

        if elapsed > 0.0 {
            Some(after.saturating_sub(before) as f64 / elapsed)
        } else {
            None
        }
    }

    fn deltas(&self) -> Vec<u64> {
        self.samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|((_, a), (_, b))| b.saturating_sub(*a))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn needs_two_samples() {
        let mut history = PublishHistory::new();
        history.record(Instant::now(), 3);
        assert!(history.sparkline().is_empty());
        assert_eq!(history.rate(), None);
    }

    #[test]
    fn sparkline_scales_to_busiest_interval() {
        let start = Instant::now();
        let mut history = PublishHistory::new();
        for (i, count) in [0, 0, 7, 14, 15].into_iter().enumerate() {
            history.record(start + Duration::from_secs(i as u64), count);
        }
        assert_eq!(history.sparkline(), vec![0, 7, 7, 1]);
        assert_eq!(history.rate(), Some(1.0));
    }

    #[test]
    fn keeps_a_bounded_window() {
        let start = Instant::now();
        let mut history = PublishHistory::new();
        for i in 0..100 {
            history.record(start + Duration::from_secs(i), i);
        }
        assert_eq!(history.len(), MAX_HISTORY_SIZE);
    }
}
