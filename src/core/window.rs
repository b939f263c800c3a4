//! Sliding-window statistics over cycle durations.
//!
//! The window is a fixed ring of `window_sz` samples that starts zero-filled.
//! Unfilled slots count toward the running sum, so the moving average is only
//! reported once the ring has been filled at least once.

use serde::{Deserialize, Serialize};

/// Point-in-time view of the window.
///
/// Field order is the persisted layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Total cycles observed since the window was created
    pub count: u32,
    /// Moving average over the window in seconds, 0 while warming up
    pub windowed_average: u32,
    /// Duration of the most recent cycle in seconds
    pub last_duration: u32,
}

/// Fixed-capacity moving-average accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidingWindowStats {
    samples: Vec<u32>,
    sum: u64,
    cursor: usize,
    lifetime_count: u32,
    last: u32,
}

impl SlidingWindowStats {
    /// Create an empty window holding `window_sz` samples.
    ///
    /// A zero size is raised to one.
    pub fn new(window_sz: u32) -> Self {
        Self {
            samples: vec![0; window_sz.max(1) as usize],
            sum: 0,
            cursor: 0,
            lifetime_count: 0,
            last: 0,
        }
    }

    /// Rebuild a window from its raw parts.
    ///
    /// Returns `None` when the parts are inconsistent (cursor outside the
    /// ring or a sum that does not match the samples).
    pub fn from_parts(samples: Vec<u32>, cursor: usize, lifetime_count: u32, last: u32) -> Option<Self> {
        if samples.is_empty() || cursor >= samples.len() {
            return None;
        }
        let sum = samples.iter().map(|&s| u64::from(s)).sum();
        Some(Self {
            samples,
            sum,
            cursor,
            lifetime_count,
            last,
        })
    }

    /// Fold one cycle duration into the window, overwriting the oldest slot.
    pub fn update(&mut self, value: u32) {
        let slot = &mut self.samples[self.cursor];
        self.sum -= u64::from(*slot);
        self.sum += u64::from(value);
        *slot = value;
        self.cursor = (self.cursor + 1) % self.samples.len();
        self.lifetime_count = self.lifetime_count.saturating_add(1);
        self.last = value;
    }

    /// Current record derived from the window.
    pub fn snapshot(&self) -> Record {
        let window_sz = self.window_sz();
        let windowed_average = if self.lifetime_count >= window_sz {
            (self.sum / u64::from(window_sz)) as u32
        } else {
            0
        };

        Record {
            count: self.lifetime_count,
            last_duration: self.last,
            windowed_average,
        }
    }

    pub fn window_sz(&self) -> u32 {
        self.samples.len() as u32
    }

    pub fn samples(&self) -> &[u32] {
        &self.samples
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn lifetime_count(&self) -> u32 {
        self.lifetime_count
    }

    pub fn last(&self) -> u32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_after_filling() {
        let mut window = SlidingWindowStats::new(3);
        window.update(5);
        window.update(7);
        window.update(9);

        let record = window.snapshot();
        assert_eq!(record.count, 3);
        assert_eq!(record.last_duration, 9);
        assert_eq!(record.windowed_average, 7);
    }

    #[test]
    fn test_average_zero_while_warming_up() {
        let mut window = SlidingWindowStats::new(4);
        for value in [10, 20, 30] {
            window.update(value);
            assert_eq!(window.snapshot().windowed_average, 0);
        }
        window.update(40);
        assert_eq!(window.snapshot().windowed_average, 25);
    }

    #[test]
    fn test_sum_tracks_most_recent_values() {
        let mut window = SlidingWindowStats::new(3);
        let values = [4, 8, 15, 16, 23, 42, 1];

        for (i, &value) in values.iter().enumerate() {
            window.update(value);
            let start = (i + 1).saturating_sub(3);
            let expected: u64 = values[start..=i].iter().map(|&v| u64::from(v)).sum();
            assert_eq!(window.sum(), expected);
        }

        assert_eq!(window.lifetime_count(), 7);
        // 23 + 42 + 1
        assert_eq!(window.snapshot().windowed_average, 22);
    }

    #[test]
    fn test_integer_division_truncates() {
        let mut window = SlidingWindowStats::new(2);
        window.update(1);
        window.update(2);
        assert_eq!(window.snapshot().windowed_average, 1);
    }

    #[test]
    fn test_from_parts_recomputes_sum() {
        let window = SlidingWindowStats::from_parts(vec![3, 0, 6], 1, 4, 3).unwrap();
        assert_eq!(window.sum(), 9);
        assert_eq!(window.cursor(), 1);

        assert!(SlidingWindowStats::from_parts(vec![1, 2], 2, 0, 0).is_none());
        assert!(SlidingWindowStats::from_parts(Vec::new(), 0, 0, 0).is_none());
    }
}
