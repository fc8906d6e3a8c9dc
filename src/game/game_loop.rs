//! Fixed-timestep scheduler
//!
//! Real elapsed time is fed into an accumulator and drained in `dt`-sized
//! steps. The remainder is returned as the interpolation fraction for the
//! renderer. Time is kept in integer nanoseconds so step counts are exact.

use std::time::Duration;

use tracing::warn;

use crate::config::{ConfigError, WorldConfig};

/// Anything that can be advanced by one fixed step
pub trait Simulation {
    fn step(&mut self);
}

impl<F: FnMut()> Simulation for F {
    fn step(&mut self) {
        self()
    }
}

/// Result of one `advance` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    /// Steps executed
    pub steps: u32,
    /// Leftover time as a fraction of `dt`, in `[0, 1)`
    pub alpha: f64,
    /// Simulated time discarded because the step cap was reached
    pub dropped: Duration,
}

#[derive(Debug, Clone)]
pub struct TimeScheduler {
    step: Duration,
    max_steps: u32,
    accumulator: Duration,
    total_steps: u64,
    dropped_total: Duration,
}

impl TimeScheduler {
    /// `step` must be non-zero and `max_steps` at least 1
    pub fn new(step: Duration, max_steps: u32) -> Self {
        assert!(!step.is_zero(), "step duration must be positive");
        assert!(max_steps > 0, "step cap must be at least 1");
        Self {
            step,
            max_steps,
            accumulator: Duration::ZERO,
            total_steps: 0,
            dropped_total: Duration::ZERO,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.step_duration(), config.max_steps_per_advance))
    }

    /// Add `elapsed` to the accumulator and run every whole step it covers,
    /// up to the cap. Whole steps beyond the cap are discarded; the
    /// sub-step remainder is kept.
    pub fn advance<S: Simulation + ?Sized>(&mut self, elapsed: Duration, sim: &mut S) -> Advance {
        self.accumulator += elapsed;

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            sim.step();
            self.accumulator -= self.step;
            steps += 1;
        }
        self.total_steps += u64::from(steps);

        let mut dropped = Duration::ZERO;
        if self.accumulator >= self.step {
            let remainder = self.accumulator.as_nanos() % self.step.as_nanos();
            // remainder < step, which always fits in u64 nanoseconds
            let remainder = Duration::from_nanos(remainder as u64);
            dropped = self.accumulator - remainder;
            self.accumulator = remainder;
            self.dropped_total += dropped;
            warn!(
                "Step cap {} reached, dropped {:.1}ms of simulated time",
                self.max_steps,
                dropped.as_secs_f64() * 1000.0
            );
        }

        Advance {
            steps,
            alpha: self.alpha(),
            dropped,
        }
    }

    /// Current interpolation fraction
    pub fn alpha(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.step.as_secs_f64()
    }

    /// Discard accumulated time (e.g. after a pause)
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    pub fn step_duration(&self) -> Duration {
        self.step
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn dropped_total(&self) -> Duration {
        self.dropped_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thirty_hz(max_steps: u32) -> TimeScheduler {
        TimeScheduler::new(Duration::from_secs_f64(1.0 / 30.0), max_steps)
    }

    #[test]
    fn test_advance_runs_whole_steps() {
        // 0.1s at dt = 1/30 is exactly three steps
        let mut scheduler = thirty_hz(5);
        let mut count = 0;
        let result = scheduler.advance(Duration::from_secs_f64(0.1), &mut || count += 1);

        assert_eq!(count, 3);
        assert_eq!(result.steps, 3);
        assert!(result.alpha >= 0.0 && result.alpha < 1e-6);
        assert_eq!(result.dropped, Duration::ZERO);
    }

    #[test]
    fn test_accumulates_across_calls() {
        let mut scheduler = thirty_hz(5);
        let mut count = 0;

        let first = scheduler.advance(Duration::from_millis(20), &mut || count += 1);
        assert_eq!(first.steps, 0);
        assert!((first.alpha - 0.6).abs() < 1e-6);

        let second = scheduler.advance(Duration::from_millis(20), &mut || count += 1);
        assert_eq!(second.steps, 1);
        assert!((second.alpha - 0.2).abs() < 1e-6);
        assert_eq!(count, 1);
        assert_eq!(scheduler.total_steps(), 1);
    }

    #[test]
    fn test_alpha_stays_below_one() {
        let mut scheduler = thirty_hz(100);
        let mut sim = || {};
        for ms in [1, 7, 16, 33, 34, 50, 99, 250] {
            let result = scheduler.advance(Duration::from_millis(ms), &mut sim);
            assert!((0.0..1.0).contains(&result.alpha), "alpha {} after {}ms", result.alpha, ms);
        }
    }

    #[test]
    fn test_cap_drops_surplus_time() {
        let mut scheduler = TimeScheduler::new(Duration::from_millis(10), 3);
        let mut count = 0;

        // A 1s stall would need 100 steps
        let result = scheduler.advance(Duration::from_millis(1005), &mut || count += 1);
        assert_eq!(result.steps, 3);
        assert_eq!(count, 3);
        assert_eq!(result.dropped, Duration::from_millis(970));
        assert!((result.alpha - 0.5).abs() < 1e-9);
        assert_eq!(scheduler.dropped_total(), Duration::from_millis(970));

        // Next frame runs normally
        let next = scheduler.advance(Duration::from_millis(10), &mut || count += 1);
        assert_eq!(next.steps, 1);
        assert_eq!(next.dropped, Duration::ZERO);
    }

    #[test]
    fn test_zero_elapsed_runs_nothing() {
        let mut scheduler = thirty_hz(5);
        let mut count = 0;
        let result = scheduler.advance(Duration::ZERO, &mut || count += 1);
        assert_eq!(count, 0);
        assert_eq!(result.steps, 0);
        assert_eq!(result.alpha, 0.0);
    }

    #[test]
    fn test_reset_clears_accumulator() {
        let mut scheduler = thirty_hz(5);
        scheduler.advance(Duration::from_millis(30), &mut || {});
        assert!(scheduler.alpha() > 0.0);
        scheduler.reset();
        assert_eq!(scheduler.accumulator(), Duration::ZERO);
    }

    #[test]
    fn test_from_config_rejects_zero_cap() {
        let config = WorldConfig {
            max_steps_per_advance: 0,
            ..Default::default()
        };
        assert!(matches!(TimeScheduler::from_config(&config), Err(ConfigError::ZeroStepCap)));

        let scheduler = TimeScheduler::from_config(&WorldConfig::default()).unwrap();
        assert_eq!(scheduler.max_steps(), 5);
    }

    #[test]
    fn test_from_config_rejects_unrepresentable_step() {
        // Rounds to zero nanoseconds, and overflows Duration
        for step_seconds in [1e-10, 1e30] {
            let config = WorldConfig {
                step_seconds,
                ..Default::default()
            };
            assert!(matches!(
                TimeScheduler::from_config(&config),
                Err(ConfigError::InvalidStep(_))
            ));
        }
    }
}
