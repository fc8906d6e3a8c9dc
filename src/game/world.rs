//! Simulation world
//!
//! Owns every component and runs them in a fixed order each step:
//!
//! 1. promote entities spawned since the last step
//! 2. feed pending intents to behaviors
//! 3. integrate positions and re-index the grid
//! 4. broad phase, narrow phase and collision resolution
//! 5. world bounds check
//! 6. behavior events: `AfterUpdate`, then `Collision`, then `OutOfBounds`
//! 7. apply removals to store, grid and behaviors together
//! 8. prune dead behaviors and empty cells
//!
//! Nothing outside this module mutates the store during a step; the
//! renderer gets a read-only `FrameView` between steps.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::{ConfigError, WorldConfig};
use crate::game::behavior::{Behavior, BehaviorDispatch, SimEvent, StepContext};
use crate::game::entity::{EntityId, Tick};
use crate::game::game_loop::Simulation;
use crate::game::input_buffer::{InputBuffer, InputSender, Intent};
use crate::game::render::FrameView;
use crate::game::spatial::SpatialGrid;
use crate::game::spawn::{SpawnError, SpawnRequest, Spawner};
use crate::game::store::EntityStore;
use crate::game::systems::boundary::{self, Breach};
use crate::game::systems::collision::{self, CollisionStats, Contact};
use crate::game::systems::physics;

/// Counters from the most recent step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub tick: Tick,
    pub promoted: usize,
    pub intents: usize,
    pub moved: usize,
    pub regridded: usize,
    pub collisions: CollisionStats,
    pub breaches: usize,
    pub removed: usize,
    pub pruned_cells: usize,
}

pub struct World {
    config: WorldConfig,
    tick: Tick,
    store: EntityStore,
    grid: SpatialGrid,
    behaviors: BehaviorDispatch,
    rng: StdRng,
    input: InputBuffer,
    quit_requested: bool,
    last_step: StepSummary,
    // Per-step scratch buffers, reused across steps
    pairs: Vec<(EntityId, EntityId)>,
    contacts: Vec<Contact>,
    breaches: Vec<Breach>,
    events: Vec<SimEvent>,
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            "World initialized: bounds {:?}..{:?}, dt {:.4}s, cell {}, {:?} broad phase",
            config.bounds.min, config.bounds.max, config.step_seconds, config.cell_size, config.broad_phase
        );

        Ok(Self {
            tick: 0,
            store: EntityStore::new(),
            grid: SpatialGrid::new(config.cell_size),
            behaviors: BehaviorDispatch::new(),
            rng,
            input: InputBuffer::new(config.input_capacity),
            quit_requested: false,
            last_step: StepSummary::default(),
            pairs: Vec::new(),
            contacts: Vec::new(),
            breaches: Vec::new(),
            events: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Steps completed so far
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn behaviors(&self) -> &BehaviorDispatch {
        &self.behaviors
    }

    /// Handle for the input collaborator
    pub fn input_sender(&self) -> InputSender {
        self.input.sender()
    }

    /// Set once a `Quit` intent has been processed
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn last_step(&self) -> StepSummary {
        self.last_step
    }

    /// Spawn a new entity. It takes part in the simulation from the next step.
    pub fn spawn(&mut self, request: SpawnRequest) -> Result<EntityId, SpawnError> {
        Spawner {
            store: &mut self.store,
            grid: &mut self.grid,
            rng: &mut self.rng,
            bounds: &self.config.bounds,
            retry_budget: self.config.spawn_retry_budget,
        }
        .spawn(request)
    }

    /// Spawn an entity together with its behaviors
    pub fn spawn_with(
        &mut self,
        request: SpawnRequest,
        behaviors: impl IntoIterator<Item = Behavior>,
    ) -> Result<EntityId, SpawnError> {
        let id = self.spawn(request)?;
        for behavior in behaviors {
            self.behaviors.attach(id, behavior);
        }
        Ok(id)
    }

    /// Attach a behavior to a live entity. Returns false for stale ids.
    pub fn attach_behavior(&mut self, id: EntityId, behavior: Behavior) -> bool {
        if !self.store.is_live(id) {
            debug!("Not attaching {} to stale entity {}", behavior.name(), id);
            return false;
        }
        self.behaviors.attach(id, behavior);
        true
    }

    /// Condemn an entity; it is removed at the end of the next step and
    /// skipped by every pass until then.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.store.mark_for_removal(id)
    }

    /// Run one fixed step
    pub fn step(&mut self) -> StepSummary {
        self.tick += 1;
        let tick = self.tick;
        let mut summary = StepSummary {
            tick,
            ..Default::default()
        };

        summary.promoted = self.store.activate_pending();

        let intents = self.input.drain();
        summary.intents = intents.len();
        for input in &intents {
            if input.intent == Intent::Quit {
                info!("Quit requested at {:?}", input.timestamp);
                self.quit_requested = true;
                continue;
            }
            self.behaviors.apply_input(&input.intent, &mut self.store);
        }

        summary.moved = physics::integrate(&mut self.store, tick);
        summary.regridded = physics::sync_grid(&self.store, &mut self.grid);

        self.grid.collect_candidate_pairs(self.config.broad_phase, &mut self.pairs);
        self.contacts.clear();
        summary.collisions = collision::resolve(&mut self.store, &self.pairs, &mut self.contacts);

        self.breaches.clear();
        boundary::check(&mut self.store, &self.config.bounds, &mut self.breaches);
        summary.breaches = self.breaches.len();

        self.events.clear();
        self.events.push(SimEvent::AfterUpdate { tick });
        self.events
            .extend(self.contacts.iter().map(|c| SimEvent::Collision { a: c.a, b: c.b }));
        self.events
            .extend(self.breaches.iter().map(|b| SimEvent::OutOfBounds { id: b.id, axes: b.axes }));
        let mut ctx = StepContext::new(&mut self.store, &mut self.grid, &mut self.rng, &self.config);
        self.behaviors.dispatch(&self.events, &mut ctx);

        summary.removed = self.apply_removals();
        self.behaviors.prune(&self.store);
        if tick % self.config.prune_interval == 0 {
            summary.pruned_cells = self.grid.prune_empty_cells();
        }

        debug_assert!(self.grid_is_consistent(), "grid out of sync at tick {}", tick);
        debug!(
            "Step {}: {} moved, {} pairs, {} contacts, {} out of bounds, {} removed",
            tick,
            summary.moved,
            summary.collisions.candidates,
            summary.collisions.contacts,
            summary.breaches,
            summary.removed
        );

        self.last_step = summary;
        summary
    }

    /// Drop every condemned entity from the store, grid and behaviors
    fn apply_removals(&mut self) -> usize {
        let condemned = self.store.take_pending_removals();
        if condemned.is_empty() {
            return 0;
        }
        for &id in &condemned {
            self.grid.remove(id);
            self.behaviors.detach_all(id);
        }
        self.store.remove_batch(&condemned).len()
    }

    /// Read-only view for the renderer
    pub fn frame(&self, alpha: f64) -> FrameView<'_> {
        FrameView::new(&self.store, alpha, self.config.interpolation)
    }

    /// Every stored entity is indexed under the cell of its position and
    /// the grid holds nothing else
    pub fn grid_is_consistent(&self) -> bool {
        self.grid.len() == self.store.len()
            && self
                .store
                .iter()
                .all(|e| self.grid.location(e.id) == Some(self.grid.cell_of(e.position)))
    }
}

impl Simulation for World {
    fn step(&mut self) {
        World::step(self);
    }
}
