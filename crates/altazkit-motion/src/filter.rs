//! Target filtering pipeline.
//!
//! Raw target writes pass through three stages before the step loop sees
//! them: a median window that swallows outlier samples, a hysteresis-gated
//! EMA that ignores sub-threshold jitter, and a second EMA that smooths
//! what the controller chases. Both EMA states round to whole steps.

use std::collections::VecDeque;

use crate::tuning::MotionTuning;

/// Number of raw writes the median window retains.
pub const MEDIAN_WINDOW: usize = 5;

/// Fixed-size ring of the most recent raw target writes.
#[derive(Debug, Clone, Default)]
pub struct MedianRing {
    slots: VecDeque<i32>,
}

impl MedianRing {
    /// Empty ring.
    pub fn new() -> Self {
        Self {
            slots: VecDeque::with_capacity(MEDIAN_WINDOW),
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, value: i32) {
        if self.slots.len() == MEDIAN_WINDOW {
            self.slots.pop_front();
        }
        self.slots.push_back(value);
    }

    /// Median of the current window; lower-middle for even fills.
    pub fn median(&self) -> Option<i32> {
        if self.slots.is_empty() {
            return None;
        }
        let mut sorted: Vec<i32> = self.slots.iter().copied().collect();
        sorted.sort_unstable();
        Some(sorted[(sorted.len() - 1) / 2])
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Current fill level.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no samples are held.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Per-axis filter state: median ring plus two cascaded EMAs.
#[derive(Debug, Clone, Default)]
pub struct TargetFilter {
    ring: MedianRing,
    pub(crate) filtered_input: f64,
    pub(crate) filtered_output: f64,
}

impl TargetFilter {
    /// Zeroed filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw target write (the `set_target` entry point).
    pub fn push(&mut self, raw: i32) {
        self.ring.push(raw);
    }

    /// Run one filtering tick and return the effective target.
    ///
    /// Stages, in order: ring push of the latest raw target, median,
    /// hysteresis-gated input EMA, controller EMA (`alpha_ctrl == 0`
    /// bypasses the second stage).
    pub fn tick(&mut self, raw_target: i32, t: &MotionTuning) -> i32 {
        self.ring.push(raw_target);
        let median = self.ring.median().unwrap_or(raw_target) as f64;

        if (median - self.filtered_input).abs() >= t.hyst_threshold as f64 {
            self.filtered_input =
                (self.filtered_input + t.alpha_in * (median - self.filtered_input)).round();
        }

        if t.alpha_ctrl == 0.0 {
            self.filtered_output = self.filtered_input;
        } else {
            self.filtered_output = (self.filtered_output
                + t.alpha_ctrl * (self.filtered_input - self.filtered_output))
                .round();
        }

        self.filtered_output as i32
    }

    /// Kill residual drift: pin the output stage to the actual position.
    pub fn snap_to(&mut self, position: i32) {
        self.filtered_output = position as f64;
    }

    /// Re-base the whole pipeline after a locked operation (homing zero,
    /// direct move) so tracking resumes from the new position instead of
    /// chasing the stale target.
    pub fn rebase(&mut self, position: i32) {
        self.ring.clear();
        self.filtered_input = position as f64;
        self.filtered_output = position as f64;
    }

    /// Effective target the step loop chases.
    pub fn output(&self) -> i32 {
        self.filtered_output as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> MotionTuning {
        MotionTuning::default()
    }

    #[test]
    fn test_median_of_five_writes() {
        let mut ring = MedianRing::new();
        for v in [100, 500, 100, 100, 900] {
            ring.push(v);
        }
        assert_eq!(ring.median(), Some(100));
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut ring = MedianRing::new();
        for v in [9, 1, 1, 1, 1, 1] {
            ring.push(v);
        }
        assert_eq!(ring.len(), MEDIAN_WINDOW);
        assert_eq!(ring.median(), Some(1), "the 9 must have been evicted");
    }

    #[test]
    fn test_median_empty_and_partial() {
        let mut ring = MedianRing::new();
        assert_eq!(ring.median(), None);
        ring.push(42);
        assert_eq!(ring.median(), Some(42));
        ring.push(100);
        // Lower-middle convention on even fills.
        assert_eq!(ring.median(), Some(42));
    }

    #[test]
    fn test_hysteresis_gate() {
        let t = tuning();
        let mut f = TargetFilter::new();
        f.filtered_input = 1000.0;
        f.filtered_output = 1000.0;

        // Delta 5 < threshold 8: input stage untouched.
        for _ in 0..MEDIAN_WINDOW {
            f.push(1005);
        }
        f.tick(1005, &t);
        assert_eq!(f.filtered_input, 1000.0);

        // Delta 10 >= 8: input stage moves by the EMA step, rounded.
        let mut f = TargetFilter::new();
        f.filtered_input = 1000.0;
        f.filtered_output = 1000.0;
        for _ in 0..MEDIAN_WINDOW {
            f.push(1010);
        }
        f.tick(1010, &t);
        assert_eq!(f.filtered_input, (1000.0_f64 + 0.18 * 10.0).round());
    }

    #[test]
    fn test_controller_stage_bypass() {
        let mut t = tuning();
        t.alpha_ctrl = 0.0;
        let mut f = TargetFilter::new();
        f.filtered_input = 500.0;
        f.filtered_output = 0.0;
        // Median equals the input state, so only the bypass acts.
        for _ in 0..MEDIAN_WINDOW {
            f.push(500);
        }
        f.tick(500, &t);
        assert_eq!(f.filtered_output, 500.0);
    }

    #[test]
    fn test_output_converges_toward_target() {
        let t = tuning();
        let mut f = TargetFilter::new();
        let mut last_gap = 10_000_i32;
        for _ in 0..400 {
            let out = f.tick(10_000, &t);
            let gap = (10_000 - out).abs();
            assert!(gap <= last_gap, "filter output must not diverge");
            last_gap = gap;
        }
        // Hysteresis leaves up to threshold-1 steps standing, and rounding
        // in the controller EMA can stall a couple more short of that.
        assert!(last_gap <= t.hyst_threshold + 2, "standing gap {last_gap}");
    }

    #[test]
    fn test_rebase_clears_history() {
        let t = tuning();
        let mut f = TargetFilter::new();
        for _ in 0..10 {
            f.tick(15_000, &t);
        }
        f.rebase(200);
        assert_eq!(f.output(), 200);
        assert!(f.ring.is_empty());
        // Next tick starts from the rebased state.
        let out = f.tick(200, &t);
        assert_eq!(out, 200);
    }
}
