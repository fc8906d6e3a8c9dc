//! Performance monitoring
//!
//! `StepMonitor` judges simulation health from what the scheduler actually
//! does: step cost against `dt`, whether a capped catch-up burst still fits
//! in one step period, and whether simulated time is being dropped.
//! `FrameCounter` samples the draw rate over short fixed windows.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::WorldConfig;
use crate::game::constants::performance::{FPS_WINDOW_MS, MIN_SAMPLES, WINDOW};
use crate::game::game_loop::Advance;

/// Simulation health, worst last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PerformanceStatus {
    /// A full capped burst of steps fits inside one `dt`
    Healthy,
    /// Single steps fit `dt`, but a capped burst does not; a long frame
    /// leaves the scheduler behind for several frames
    Tight,
    /// Average step cost exceeds `dt`; the accumulator can only grow
    OverBudget,
    /// The scheduler hit its step cap and discarded simulated time
    DroppingTime,
}

impl PerformanceStatus {
    /// Simulated time is no longer keeping pace with real time
    pub fn is_overloaded(&self) -> bool {
        *self >= PerformanceStatus::OverBudget
    }
}

/// Rolling windows of step costs and scheduler advances
pub struct StepMonitor {
    step_durations: VecDeque<Duration>,
    /// Steps run and time dropped per `advance` call
    advances: VecDeque<(u32, Duration)>,
    /// Step budget (`dt`)
    budget: Duration,
    /// Scheduler step cap
    max_steps: u32,
    step_start: Option<Instant>,
    last_entity_count: usize,
    dropped_total: Duration,
}

impl StepMonitor {
    pub fn new(budget: Duration, max_steps: u32) -> Self {
        Self {
            step_durations: VecDeque::with_capacity(WINDOW),
            advances: VecDeque::with_capacity(WINDOW),
            budget,
            max_steps: max_steps.max(1),
            step_start: None,
            last_entity_count: 0,
            dropped_total: Duration::ZERO,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.step_duration(), config.max_steps_per_advance)
    }

    pub fn step_start(&mut self) {
        self.step_start = Some(Instant::now());
    }

    pub fn step_end(&mut self, entity_count: usize) {
        if let Some(start) = self.step_start.take() {
            self.record_step(start.elapsed());
            self.last_entity_count = entity_count;
        }
    }

    pub fn record_step(&mut self, duration: Duration) {
        push_bounded(&mut self.step_durations, duration);
    }

    /// Record the outcome of one scheduler `advance` call
    pub fn record_advance(&mut self, advance: &Advance) {
        self.dropped_total += advance.dropped;
        push_bounded(&mut self.advances, (advance.steps, advance.dropped));
    }

    pub fn status(&self) -> PerformanceStatus {
        if self.advances.iter().any(|(_, dropped)| !dropped.is_zero()) {
            return PerformanceStatus::DroppingTime;
        }
        if self.step_durations.len() < MIN_SAMPLES {
            return PerformanceStatus::Healthy;
        }

        let average = self.average_step_duration();
        if average > self.budget {
            PerformanceStatus::OverBudget
        } else if average * self.max_steps > self.budget {
            PerformanceStatus::Tight
        } else {
            PerformanceStatus::Healthy
        }
    }

    pub fn average_step_duration(&self) -> Duration {
        if self.step_durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.step_durations.iter().sum();
        sum / self.step_durations.len() as u32
    }

    /// 95th percentile step duration
    pub fn p95_step_duration(&self) -> Duration {
        let mut sorted: Vec<_> = self.step_durations.iter().copied().collect();
        if sorted.is_empty() {
            return Duration::ZERO;
        }
        let idx = (sorted.len() * 95 / 100).min(sorted.len() - 1);
        *sorted.select_nth_unstable(idx).1
    }

    /// Mean steps per `advance` call over the window
    pub fn average_steps_per_advance(&self) -> f32 {
        if self.advances.is_empty() {
            return 0.0;
        }
        let steps: u32 = self.advances.iter().map(|(steps, _)| steps).sum();
        steps as f32 / self.advances.len() as f32
    }

    /// Average step cost as a percentage of `dt` (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        if self.budget.is_zero() {
            return 0.0;
        }
        self.average_step_duration().as_secs_f32() / self.budget.as_secs_f32() * 100.0
    }

    pub fn dropped_total(&self) -> Duration {
        self.dropped_total
    }

    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    pub fn sample_count(&self) -> usize {
        self.step_durations.len()
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% of dt (avg {:?}, p95 {:?}), {:.2} steps/frame, {:?} dropped, {} entities",
            self.status(),
            self.budget_usage_percent(),
            self.average_step_duration(),
            self.p95_step_duration(),
            self.average_steps_per_advance(),
            self.dropped_total,
            self.last_entity_count
        )
    }
}

fn push_bounded<T>(window: &mut VecDeque<T>, sample: T) {
    if window.len() == WINDOW {
        window.pop_front();
    }
    window.push_back(sample);
}

/// Frames-per-second counter sampled over fixed windows
#[derive(Debug, Clone)]
pub struct FrameCounter {
    window: Duration,
    window_start: Option<Instant>,
    frames: u32,
    fps: f32,
    total_frames: u64,
}

impl FrameCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            frames: 0,
            fps: 0.0,
            total_frames: 0,
        }
    }

    /// Count one drawn frame. Returns the new rate when a window closes.
    pub fn frame(&mut self, now: Instant) -> Option<f32> {
        self.total_frames += 1;
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };

        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window {
            return None;
        }
        self.fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = Some(now);
        Some(self.fps)
    }

    /// Rate measured over the last complete window
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new(Duration::from_millis(FPS_WINDOW_MS))
    }
}
