use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::constants::{grid, input, spawn, timing, world};
use crate::game::entity::Axes;
use crate::game::render::Interpolation;
use crate::game::spatial::BroadPhase;
use crate::util::vec2::Vec2;

/// Fixed world rectangle used for out-of-bounds checks and spawn placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl WorldBounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Axes on which a box at `position` with `extent` leaves the world
    pub fn exceeded_axes(&self, position: Vec2, extent: Vec2) -> Axes {
        let far = position + extent;
        Axes {
            x: position.x < self.min.x || far.x > self.max.x,
            y: position.y < self.min.y || far.y > self.max.y,
        }
    }

    /// Clamp a box's top-left corner so the box stays inside the world.
    /// Returns the clamped position and the axes that had to be clamped.
    ///
    /// A box wider than the world is pinned to `min` on that axis.
    pub fn clamp_position(&self, position: Vec2, extent: Vec2) -> (Vec2, Axes) {
        let hi = (self.max - extent).max(self.min);
        let clamped = Vec2::new(
            position.x.clamp(self.min.x, hi.x),
            position.y.clamp(self.min.y, hi.y),
        );
        let axes = Axes {
            x: clamped.x != position.x,
            y: clamped.y != position.y,
        };
        (clamped, axes)
    }

    /// True when a box of `extent` can be placed inside the world at all
    pub fn fits(&self, extent: Vec2) -> bool {
        let size = self.size();
        extent.x <= size.x && extent.y <= size.y
    }

    /// Uniformly random top-left corner keeping a box of `extent` inside the world
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R, extent: Vec2) -> Option<Vec2> {
        if !self.fits(extent) {
            return None;
        }
        let hi = self.max - extent;
        let x = if hi.x > self.min.x { rng.gen_range(self.min.x..=hi.x) } else { self.min.x };
        let y = if hi.y > self.min.y { rng.gen_range(self.min.y..=hi.y) } else { self.min.y };
        Some(Vec2::new(x, y))
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(Vec2::splat(world::MIN), Vec2::splat(world::MAX))
    }
}

/// World configuration, supplied once at startup and immutable afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World rectangle
    pub bounds: WorldBounds,
    /// Fixed simulation step duration in seconds (`dt`)
    pub step_seconds: f64,
    /// Spatial grid cell size in world units
    pub cell_size: f32,
    /// Maximum steps executed by one `advance()` call
    pub max_steps_per_advance: u32,
    /// Randomized placement attempts for an overlapping spawn
    pub spawn_retry_budget: u32,
    /// Prune empty grid cells every N steps
    pub prune_interval: u64,
    /// Broad-phase candidate selection
    pub broad_phase: BroadPhase,
    /// How the renderer derives display positions from the interpolation fraction
    pub interpolation: Interpolation,
    /// Intents buffered between two steps before backpressure
    pub input_capacity: usize,
    /// Upper bound on draws per second (demo driver only)
    pub max_frame_rate: u32,
    /// RNG seed for spawn placement; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: WorldBounds::default(),
            step_seconds: timing::STEP_SECONDS,
            cell_size: grid::CELL_SIZE,
            max_steps_per_advance: timing::MAX_STEPS_PER_ADVANCE,
            spawn_retry_budget: spawn::RETRY_BUDGET,
            prune_interval: grid::PRUNE_INTERVAL,
            broad_phase: BroadPhase::SameCell,
            interpolation: Interpolation::Predictive,
            input_capacity: input::CAPACITY,
            max_frame_rate: timing::MAX_FRAME_RATE,
            seed: None,
        }
    }
}

/// Configuration errors - always fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("step duration must be a positive, representable number of seconds, got {0}")]
    InvalidStep(f64),
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
    #[error("max_steps_per_advance must be at least 1")]
    ZeroStepCap,
    #[error("prune_interval must be at least 1")]
    ZeroPruneInterval,
    #[error("input_capacity must be at least 1")]
    ZeroInputCapacity,
    #[error("max_frame_rate must be at least 1")]
    ZeroFrameRate,
    #[error("world bounds are empty or inverted: min {min:?}, max {max:?}")]
    InvalidBounds { min: Vec2, max: Vec2 },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl WorldConfig {
    /// Load config from environment or use defaults
    ///
    /// `SIM_CONFIG` names a JSON file used as the base; individual
    /// `SIM_*` variables override single fields on top of it.
    pub fn load_or_default() -> Self {
        let mut config = match std::env::var("SIM_CONFIG") {
            Ok(path) => Self::from_json_file(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring SIM_CONFIG: {}", e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        if let Some(step) = env_override("SIM_STEP_SECONDS", |v: &f64| v.is_finite() && *v > 0.0) {
            config.step_seconds = step;
        }
        if let Some(cell) = env_override("SIM_CELL_SIZE", |v: &f32| v.is_finite() && *v > 0.0) {
            config.cell_size = cell;
        }
        if let Some(cap) = env_override("SIM_MAX_STEPS", |v: &u32| *v > 0) {
            config.max_steps_per_advance = cap;
        }
        if let Some(retries) = env_override("SIM_SPAWN_RETRIES", |_: &u32| true) {
            config.spawn_retry_budget = retries;
        }
        if let Some(rate) = env_override("SIM_MAX_FRAME_RATE", |v: &u32| *v > 0) {
            config.max_frame_rate = rate;
        }
        if let Some(seed) = env_override("SIM_SEED", |_: &u64| true) {
            config.seed = Some(seed);
        }
        if let Some(phase) = env_override("SIM_BROAD_PHASE", |_: &BroadPhase| true) {
            config.broad_phase = phase;
        }

        config
    }

    /// Parse a (possibly partial) JSON config; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Must survive the conversion the scheduler does, not just be positive
        match Duration::try_from_secs_f64(self.step_seconds) {
            Ok(step) if !step.is_zero() => {}
            _ => return Err(ConfigError::InvalidStep(self.step_seconds)),
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        if self.max_steps_per_advance == 0 {
            return Err(ConfigError::ZeroStepCap);
        }
        if self.prune_interval == 0 {
            return Err(ConfigError::ZeroPruneInterval);
        }
        if self.input_capacity == 0 {
            return Err(ConfigError::ZeroInputCapacity);
        }
        if self.max_frame_rate == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        let WorldBounds { min, max } = self.bounds;
        if !(min.is_finite() && max.is_finite() && min.x < max.x && min.y < max.y) {
            return Err(ConfigError::InvalidBounds { min, max });
        }
        Ok(())
    }

    /// Step duration as a `Duration`. Only meaningful on a validated config;
    /// an unrepresentable value comes back as zero.
    pub fn step_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.step_seconds).unwrap_or(Duration::ZERO)
    }

    /// Minimum time between two draws in the demo driver
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.max_frame_rate.max(1)))
    }
}

/// Read and parse an environment variable, warning and ignoring bad values
fn env_override<T: FromStr>(name: &str, accept: impl Fn(&T) -> bool) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) if accept(&value) => Some(value),
        Ok(_) => {
            tracing::warn!("{} out of range '{}', using default", name, raw);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert!((config.step_seconds - 1.0 / 30.0).abs() < 1e-12);
        assert_eq!(config.cell_size, 64.0);
        assert_eq!(config.max_steps_per_advance, 5);
        assert_eq!(config.broad_phase, BroadPhase::SameCell);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = WorldConfig::load_or_default();
        assert!(config.step_seconds > 0.0);
    }

    #[test]
    fn test_rejects_unrepresentable_step() {
        let mut config = WorldConfig::default();
        for step in [0.0, -1.0 / 30.0, f64::NAN, f64::INFINITY, 1e-10, 1e30] {
            config.step_seconds = step;
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidStep(_))),
                "step {} accepted",
                step
            );
        }
        // One nanosecond is the smallest usable step
        config.step_seconds = 1e-9;
        assert!(config.validate().is_ok());
        assert_eq!(config.step_duration(), Duration::from_nanos(1));
    }

    #[test]
    fn test_rejects_non_positive_cell_size() {
        let mut config = WorldConfig::default();
        config.cell_size = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCellSize(_))));
        config.cell_size = -4.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCellSize(_))));
        config.cell_size = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCellSize(_))));
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let mut config = WorldConfig::default();
        config.step_seconds = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidStep(_))));
        config.step_seconds = -1.0 / 30.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidStep(_))));
    }

    #[test]
    fn test_rejects_zero_caps() {
        let mut config = WorldConfig::default();
        config.max_steps_per_advance = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroStepCap)));

        let mut config = WorldConfig::default();
        config.prune_interval = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPruneInterval)));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut config = WorldConfig::default();
        config.bounds = WorldBounds::new(Vec2::new(10.0, 0.0), Vec2::new(5.0, 100.0));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBounds { .. })));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = WorldConfig::from_json_str(
            r#"{ "cell_size": 50.0, "broad_phase": "neighborhood", "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.cell_size, 50.0);
        assert_eq!(config.broad_phase, BroadPhase::Neighborhood);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_steps_per_advance, WorldConfig::default().max_steps_per_advance);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            WorldConfig::from_json_str("{ cell_size: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = WorldConfig::from_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_exceeded_axes_independent() {
        let bounds = WorldBounds::new(Vec2::ZERO, Vec2::new(1000.0, 1000.0));
        let axes = bounds.exceeded_axes(Vec2::new(1000.0, 50.0), Vec2::new(10.0, 10.0));
        assert!(axes.x);
        assert!(!axes.y);

        let axes = bounds.exceeded_axes(Vec2::new(-1.0, 995.0), Vec2::new(10.0, 10.0));
        assert!(axes.x && axes.y);

        let axes = bounds.exceeded_axes(Vec2::new(990.0, 990.0), Vec2::new(10.0, 10.0));
        assert!(!axes.any());
    }

    #[test]
    fn test_clamp_position() {
        let bounds = WorldBounds::new(Vec2::ZERO, Vec2::new(100.0, 100.0));
        let (pos, axes) = bounds.clamp_position(Vec2::new(95.0, 40.0), Vec2::new(10.0, 10.0));
        assert_eq!(pos, Vec2::new(90.0, 40.0));
        assert!(axes.x && !axes.y);

        let (pos, axes) = bounds.clamp_position(Vec2::new(-3.0, -3.0), Vec2::new(10.0, 10.0));
        assert_eq!(pos, Vec2::ZERO);
        assert!(axes.x && axes.y);
    }

    #[test]
    fn test_random_position_stays_inside() {
        let bounds = WorldBounds::new(Vec2::ZERO, Vec2::new(100.0, 50.0));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let pos = bounds.random_position(&mut rng, Vec2::new(20.0, 20.0)).unwrap();
            assert!(!bounds.exceeded_axes(pos, Vec2::new(20.0, 20.0)).any());
        }
        assert!(bounds.random_position(&mut rng, Vec2::new(200.0, 10.0)).is_none());
    }
}
