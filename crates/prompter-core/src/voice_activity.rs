//! Frequency-based scroll speed.
//!
//! The estimator never looks at what was said. Recognition engines fire a
//! burst of callbacks per word, and the rate of those callbacks tracks the
//! speaking pace well enough to drive a multiplier on the base velocity:
//!
//! 1. Each event is pushed into a sliding window of timestamps.
//! 2. The first event after silence is a resumption: the target jumps to the
//!    baseline and the smoothed value is nudged toward it.
//! 3. Otherwise the interval rate over the window maps to a target through
//!    the calibration constant, clamped to `[min, max]`.
//! 4. Every frame the smoothed multiplier glides toward the target and snaps
//!    once close enough.

use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace};

/// A single buffered event has no interval; it keeps the current target.
const MIN_EVENTS_FOR_RATE: usize = 2;

/// Anything that can supply a velocity multiplier once per frame.
pub trait VelocitySource {
    /// Advance by `dt_secs` and return the multiplier for this frame.
    fn step(&mut self, dt_secs: f32) -> f32;

    /// Drop any in-flight glide so the next mode starts from rest.
    fn reset_motion(&mut self);
}

#[derive(Debug, Clone, Copy)]
pub struct VoiceActivityConfig {
    /// Event rate treated as normal pace (1.0x). Default 4/s: a recognizer
    /// typically fires about four interim callbacks per second of speech.
    pub calibration_events_per_second: f32,
    /// Hard cap. Default 1.6x keeps recognizer chatter from running away.
    pub max_multiplier: f32,
    /// Floor while speaking, so intermittent speech never reads as stopped.
    pub min_multiplier: f32,
    /// Target applied on speech resumption.
    pub resume_multiplier: f32,
    /// Fraction of the gap to the resume target applied immediately.
    pub resume_nudge: f32,
    /// Per-60Hz-frame blend toward the target.
    pub blend: f32,
    pub snap_epsilon: f32,
    pub rate_window: Duration,
    /// Lower bound on the span used as the rate denominator.
    pub rate_span_floor: Duration,
}

impl Default for VoiceActivityConfig {
    fn default() -> Self {
        Self {
            calibration_events_per_second: 4.0,
            max_multiplier: 1.6,
            min_multiplier: 0.35,
            resume_multiplier: 1.0,
            resume_nudge: 0.5,
            blend: 0.08,
            snap_epsilon: 0.01,
            rate_window: Duration::from_millis(1500),
            rate_span_floor: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoiceActivityEstimator {
    config: VoiceActivityConfig,
    timestamps: VecDeque<Duration>,
    smoothed: f32,
    target: f32,
    silent: bool,
}

impl VoiceActivityEstimator {
    pub fn new(config: VoiceActivityConfig) -> Self {
        Self {
            config,
            timestamps: VecDeque::new(),
            smoothed: 0.0,
            target: 0.0,
            silent: true,
        }
    }

    /// Back to the mic-start state: silent, stopped, empty window.
    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.smoothed = 0.0;
        self.target = 0.0;
        self.silent = true;
    }

    pub fn set_config(&mut self, config: VoiceActivityConfig) {
        self.config = config;
    }

    pub fn on_event(&mut self, at: Duration) {
        if self.silent {
            self.timestamps.clear();
            self.timestamps.push_back(at);
            self.silent = false;
            self.target = self.config.resume_multiplier;
            self.smoothed += (self.target - self.smoothed) * self.config.resume_nudge;
            debug!(
                target_multiplier = self.target,
                smoothed = self.smoothed,
                "Speech resumed"
            );
            return;
        }

        // Out-of-order delivery must not break the sorted window.
        let at = self
            .timestamps
            .back()
            .map_or(at, |last| at.max(*last));
        self.timestamps.push_back(at);
        self.evict_before(at);

        if let Some(rate) = self.events_per_second() {
            let raw = rate / self.config.calibration_events_per_second.max(f32::EPSILON);
            self.target = raw
                .min(self.config.max_multiplier)
                .max(self.config.min_multiplier);
            trace!(
                rate,
                target_multiplier = self.target,
                buffered = self.timestamps.len(),
                "Voice activity rate"
            );
        }
    }

    pub fn on_silence_timeout(&mut self) {
        if !self.silent {
            debug!("Silence timeout; pausing voice-driven scroll");
        }
        self.target = 0.0;
        self.silent = true;
    }

    /// Interval rate over the buffered window, `None` until enough events
    /// have arrived.
    pub fn events_per_second(&self) -> Option<f32> {
        if self.timestamps.len() < MIN_EVENTS_FOR_RATE {
            return None;
        }
        let (first, last) = (self.timestamps.front()?, self.timestamps.back()?);
        let span = last
            .saturating_sub(*first)
            .max(self.config.rate_span_floor)
            .as_secs_f32();
        Some((self.timestamps.len() - 1) as f32 / span.max(f32::EPSILON))
    }

    pub fn smoothed_multiplier(&self) -> f32 {
        self.smoothed
    }

    pub fn target_multiplier(&self) -> f32 {
        self.target
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn buffered_events(&self) -> usize {
        self.timestamps.len()
    }

    fn evict_before(&mut self, now: Duration) {
        let Some(cutoff) = now.checked_sub(self.config.rate_window) else {
            return;
        };
        while self.timestamps.front().is_some_and(|t| *t < cutoff) {
            self.timestamps.pop_front();
        }
    }
}

impl VelocitySource for VoiceActivityEstimator {
    fn step(&mut self, dt_secs: f32) -> f32 {
        if !dt_secs.is_finite() || dt_secs <= 0.0 {
            return self.smoothed;
        }
        let alpha = frame_blend(self.config.blend, dt_secs);
        self.smoothed += (self.target - self.smoothed) * alpha;
        if (self.target - self.smoothed).abs() < self.config.snap_epsilon {
            self.smoothed = self.target;
        }
        self.smoothed
    }

    fn reset_motion(&mut self) {
        self.smoothed = 0.0;
    }
}

/// Convert a per-60Hz-frame blend factor to the fraction for `dt_secs`.
pub(crate) fn frame_blend(per_frame: f32, dt_secs: f32) -> f32 {
    let per_frame = per_frame.clamp(0.0, 0.999);
    1.0 - (1.0 - per_frame).powf(dt_secs * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const FRAME: f32 = 1.0 / 60.0;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Feed events every `interval_ms` from `start_ms` for `duration_ms`,
    /// stepping at 60Hz in between.
    fn drive(
        estimator: &mut VoiceActivityEstimator,
        start_ms: u64,
        duration_ms: u64,
        interval_ms: u64,
    ) -> u64 {
        let mut next_event = start_ms;
        let mut now = start_ms as f32;
        let end = (start_ms + duration_ms) as f32;
        while now <= end {
            while (next_event as f32) <= now {
                estimator.on_event(ms(next_event));
                next_event += interval_ms;
            }
            estimator.step(FRAME);
            now += FRAME * 1000.0;
        }
        next_event
    }

    #[test]
    fn steady_calibration_rate_converges_to_unity() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        drive(&mut estimator, 0, 6_000, 250);
        let rate = estimator.events_per_second().expect("rate available");
        assert_abs_diff_eq!(rate, 4.0, epsilon = 1e-3);
        assert_abs_diff_eq!(estimator.target_multiplier(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(estimator.smoothed_multiplier(), 1.0, epsilon = 0.02);
    }

    #[test]
    fn fast_chatter_is_capped() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        drive(&mut estimator, 0, 3_000, 50);
        assert_abs_diff_eq!(estimator.target_multiplier(), 1.6, epsilon = 1e-6);
    }

    #[test]
    fn sparse_speech_holds_the_floor() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        for at in [0u64, 700, 1400, 2100, 2800] {
            estimator.on_event(ms(at));
        }
        // ~1.4 events/s -> 0.36x, just above the 0.35 floor
        assert!(estimator.target_multiplier() >= 0.35);
        assert!(estimator.target_multiplier() < 0.5);
    }

    #[test]
    fn slower_speech_never_scrolls_faster() {
        let mut previous = f32::INFINITY;
        for interval_ms in [500u64, 700, 1000, 1100] {
            let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
            for i in 0..10 {
                estimator.on_event(ms(i * interval_ms));
            }
            let target = estimator.target_multiplier();
            assert!(
                target <= previous,
                "{interval_ms}ms gaps gave {target}, faster speech gave {previous}"
            );
            previous = target;
        }
        // gaps wider than half the window still leave two events to measure
        assert_abs_diff_eq!(previous, 0.35, epsilon = 1e-6);
    }

    #[test]
    fn second_event_already_sets_a_rate() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        estimator.on_event(ms(0));
        assert_eq!(estimator.events_per_second(), None);
        estimator.on_event(ms(1000));
        assert_abs_diff_eq!(estimator.events_per_second().expect("rate"), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(estimator.target_multiplier(), 0.35, epsilon = 1e-6);
    }

    #[test]
    fn old_events_leave_the_window() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        for at in (0..=4_000).step_by(250) {
            estimator.on_event(ms(at));
        }
        // 1.5s window at 4/s keeps the cutoff sample plus six more
        assert_eq!(estimator.buffered_events(), 7);
    }

    #[test]
    fn silence_zeroes_target_and_snaps_smoothed_to_exact_zero() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        drive(&mut estimator, 0, 2_000, 250);
        assert!(estimator.smoothed_multiplier() > 0.5);

        estimator.on_silence_timeout();
        assert_eq!(estimator.target_multiplier(), 0.0);
        assert!(estimator.is_silent());

        for _ in 0..600 {
            estimator.step(FRAME);
        }
        assert_eq!(estimator.smoothed_multiplier(), 0.0);
    }

    #[test]
    fn single_event_after_silence_restores_baseline() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        drive(&mut estimator, 0, 2_000, 250);
        estimator.on_silence_timeout();
        for _ in 0..600 {
            estimator.step(FRAME);
        }
        assert_eq!(estimator.smoothed_multiplier(), 0.0);

        estimator.on_event(ms(20_000));
        assert_eq!(estimator.target_multiplier(), 1.0);
        assert!(!estimator.is_silent());
        assert_abs_diff_eq!(estimator.smoothed_multiplier(), 0.5, epsilon = 1e-6);
        assert_eq!(estimator.buffered_events(), 1);
    }

    #[test]
    fn zero_dt_step_changes_nothing() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        estimator.on_event(ms(0));
        let before = estimator.smoothed_multiplier();
        assert_eq!(estimator.step(0.0), before);
        assert_eq!(estimator.smoothed_multiplier(), before);
    }

    #[test]
    fn reset_motion_keeps_target() {
        let mut estimator = VoiceActivityEstimator::new(VoiceActivityConfig::default());
        estimator.on_event(ms(0));
        estimator.reset_motion();
        assert_eq!(estimator.smoothed_multiplier(), 0.0);
        assert_eq!(estimator.target_multiplier(), 1.0);
    }

    #[test]
    fn frame_blend_is_rate_independent() {
        let one_frame = frame_blend(0.12, FRAME);
        assert_abs_diff_eq!(one_frame, 0.12, epsilon = 1e-5);
        let two_halves = 1.0 - (1.0 - frame_blend(0.12, FRAME / 2.0)).powi(2);
        assert_abs_diff_eq!(one_frame, two_halves, epsilon = 1e-5);
        assert_eq!(frame_blend(0.12, 0.0), 0.0);
    }
}
