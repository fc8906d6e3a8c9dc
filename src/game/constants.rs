/// Timing constants for the fixed-step loop
pub mod timing {
    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 30;
    /// Duration of one simulation step in seconds
    pub const STEP_SECONDS: f64 = 1.0 / TICK_RATE as f64;
    /// Maximum simulation steps run by a single `advance()` call.
    /// Anything beyond this is dropped to avoid a catch-up spiral.
    pub const MAX_STEPS_PER_ADVANCE: u32 = 5;
    /// Upper bound on draws per second in the demo driver
    pub const MAX_FRAME_RATE: u32 = 60;
}

/// Spatial grid constants
pub mod grid {
    /// Default cell size in world units.
    /// Must be >= largest entity extent + largest per-step displacement.
    pub const CELL_SIZE: f32 = 64.0;
    /// Prune empty cells every N steps
    pub const PRUNE_INTERVAL: u64 = 1;
    /// Initial capacity for the cell map (number of expected non-empty cells)
    pub const INITIAL_CELL_CAPACITY: usize = 256;
}

/// World extent constants
pub mod world {
    /// Minimum coordinate on both axes
    pub const MIN: f32 = 0.0;
    /// Maximum coordinate on both axes
    pub const MAX: f32 = 1320.0;
}

/// Spawn placement constants
pub mod spawn {
    /// Randomized placement attempts after the requested position overlaps
    pub const RETRY_BUDGET: u32 = 64;
}

/// Input collaborator constants
pub mod input {
    /// Capacity of the intent channel (intents buffered between steps)
    pub const CAPACITY: usize = 1024;
    /// Velocity added per engaged movement direction (units/step)
    pub const MOVE_SPEED: f32 = 5.0;
}

/// Projectile constants
pub mod projectile {
    /// Projectile speed (units/step)
    pub const SPEED: f32 = 12.0;
    /// Projectile width and height
    pub const EXTENT: f32 = 6.0;
    /// Steps between two shots while the trigger is held
    pub const COOLDOWN_STEPS: u32 = 6;
    /// Steps before an unimpeded projectile expires
    pub const LIFETIME_STEPS: u32 = 90;
}

/// Performance monitoring constants
pub mod performance {
    /// Step duration samples kept in the rolling window
    pub const WINDOW: usize = 120;
    /// Samples required before the status changes
    pub const MIN_SAMPLES: usize = 10;
    /// Frame counter sampling window in milliseconds (4 samples per second)
    pub const FPS_WINDOW_MS: u64 = 250;
}
