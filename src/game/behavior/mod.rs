//! Per-entity reactive behaviors
//!
//! Behaviors are owned here, keyed by the id of the entity they act on.
//! They see input intents before integration and simulation events after
//! the collision and bounds passes. A behavior mutates only its own
//! entity, or spawns new ones through the step context.

pub mod input;
pub mod lifetime;
pub mod track;

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::WorldConfig;
use crate::game::entity::{Axes, EntityId, Tick};
use crate::game::input_buffer::Intent;
use crate::game::spatial::SpatialGrid;
use crate::game::spawn::Spawner;
use crate::game::store::EntityStore;

pub use self::input::{Launcher, MoveOnInput};
pub use self::lifetime::Expiry;
pub use self::track::TrackTarget;

/// Closed set of reaction kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Steer the owner from movement intents
    MoveOnInput(MoveOnInput),
    /// Keep the owner centred on another entity (camera follow)
    TrackTarget(TrackTarget),
    /// Fire projectiles while the trigger is held
    SpawnProjectileOnTrigger(Launcher),
    /// Remove the owner after a number of steps
    ExpireAfterFrames(Expiry),
    /// Remove the owner on its first contact
    DestroyOnCollision,
}

impl Behavior {
    pub fn name(&self) -> &'static str {
        match self {
            Behavior::MoveOnInput(_) => "move_on_input",
            Behavior::TrackTarget(_) => "track_target",
            Behavior::SpawnProjectileOnTrigger(_) => "spawn_projectile_on_trigger",
            Behavior::ExpireAfterFrames(_) => "expire_after_frames",
            Behavior::DestroyOnCollision => "destroy_on_collision",
        }
    }

    fn on_intent(&mut self, owner: EntityId, intent: &Intent, store: &mut EntityStore) {
        match self {
            Behavior::MoveOnInput(mover) => mover.on_intent(owner, intent, store),
            Behavior::SpawnProjectileOnTrigger(launcher) => launcher.on_intent(intent),
            Behavior::TrackTarget(_) | Behavior::ExpireAfterFrames(_) | Behavior::DestroyOnCollision => {}
        }
    }

    fn on_event(&mut self, owner: EntityId, event: &SimEvent, ctx: &mut StepContext<'_>) {
        match (self, event) {
            (Behavior::TrackTarget(tracker), SimEvent::AfterUpdate { .. }) => tracker.follow(owner, ctx),
            (Behavior::SpawnProjectileOnTrigger(launcher), SimEvent::AfterUpdate { .. }) => {
                launcher.tick(owner, ctx)
            }
            (Behavior::ExpireAfterFrames(expiry), SimEvent::AfterUpdate { .. }) => expiry.tick(owner, ctx.store),
            (Behavior::DestroyOnCollision, SimEvent::Collision { .. }) => {
                if ctx.store.mark_for_removal(owner) {
                    debug!("Entity {} destroyed on collision", owner);
                }
            }
            _ => {}
        }
    }
}

/// Events delivered after the collision and bounds passes, in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Sent to every owner once per step
    AfterUpdate { tick: Tick },
    /// Sent to both participants; both ids are still stored
    Collision { a: EntityId, b: EntityId },
    /// Sent to the entity that left the world
    OutOfBounds { id: EntityId, axes: Axes },
}

/// Mutable view of the world handed to behaviors during dispatch
pub struct StepContext<'a> {
    pub store: &'a mut EntityStore,
    pub grid: &'a mut SpatialGrid,
    pub rng: &'a mut StdRng,
    pub config: &'a WorldConfig,
    /// Behaviors for entities spawned during this pass
    attached: Vec<(EntityId, Behavior)>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        store: &'a mut EntityStore,
        grid: &'a mut SpatialGrid,
        rng: &'a mut StdRng,
        config: &'a WorldConfig,
    ) -> Self {
        Self {
            store,
            grid,
            rng,
            config,
            attached: Vec::new(),
        }
    }

    pub fn spawner(&mut self) -> Spawner<'_, StdRng> {
        Spawner {
            store: &mut *self.store,
            grid: &mut *self.grid,
            rng: &mut *self.rng,
            bounds: &self.config.bounds,
            retry_budget: self.config.spawn_retry_budget,
        }
    }

    /// Queue a behavior for an entity spawned during this pass
    pub fn attach(&mut self, id: EntityId, behavior: Behavior) {
        self.attached.push((id, behavior));
    }
}

type BehaviorList = SmallVec<[Behavior; 2]>;

/// Owner of every behavior instance
#[derive(Debug, Default)]
pub struct BehaviorDispatch {
    behaviors: HashMap<EntityId, BehaviorList, FxBuildHasher>,
}

impl BehaviorDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, owner: EntityId, behavior: Behavior) {
        self.behaviors.entry(owner).or_default().push(behavior);
    }

    /// Drop every behavior of `owner`. Returns how many were dropped.
    pub fn detach_all(&mut self, owner: EntityId) -> usize {
        self.behaviors.remove(&owner).map_or(0, |list| list.len())
    }

    pub fn behaviors_of(&self, owner: EntityId) -> &[Behavior] {
        self.behaviors.get(&owner).map_or(&[], |list| list.as_slice())
    }

    pub fn contains(&self, owner: EntityId) -> bool {
        self.behaviors.contains_key(&owner)
    }

    /// Number of entities with at least one behavior
    pub fn owner_count(&self) -> usize {
        self.behaviors.len()
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.values().map(|list| list.len()).sum()
    }

    /// Feed one intent to every behavior that consumes input.
    /// Owners already condemned are skipped.
    pub fn apply_input(&mut self, intent: &Intent, store: &mut EntityStore) {
        for (&owner, list) in self.behaviors.iter_mut() {
            if !store.is_live(owner) {
                continue;
            }
            for behavior in list.iter_mut() {
                behavior.on_intent(owner, intent, store);
            }
        }
    }

    /// Deliver `events` in order.
    ///
    /// Only behaviors of `Active` owners run. `AfterUpdate` goes to the
    /// owners present when the pass started, in ascending id order;
    /// behaviors attached during the pass first run next step.
    pub fn dispatch(&mut self, events: &[SimEvent], ctx: &mut StepContext<'_>) {
        let mut owners: Vec<EntityId> = self.behaviors.keys().copied().collect();
        owners.sort_unstable();

        for event in events {
            match *event {
                SimEvent::AfterUpdate { .. } => {
                    for &owner in &owners {
                        self.deliver(owner, event, ctx);
                    }
                }
                SimEvent::Collision { a, b } => {
                    self.deliver(a, event, ctx);
                    self.deliver(b, event, ctx);
                }
                SimEvent::OutOfBounds { id, .. } => self.deliver(id, event, ctx),
            }
        }

        for (owner, behavior) in ctx.attached.drain(..) {
            self.behaviors.entry(owner).or_default().push(behavior);
        }
    }

    fn deliver(&mut self, owner: EntityId, event: &SimEvent, ctx: &mut StepContext<'_>) {
        if !ctx.store.get(owner).is_some_and(|e| e.is_active()) {
            return;
        }
        if let Some(list) = self.behaviors.get_mut(&owner) {
            for behavior in list.iter_mut() {
                behavior.on_event(owner, event, ctx);
            }
        }
    }

    /// Drop behaviors whose owner is no longer stored. Returns owners pruned.
    pub fn prune(&mut self, store: &EntityStore) -> usize {
        let before = self.behaviors.len();
        self.behaviors.retain(|&owner, _| store.contains(owner));
        before - self.behaviors.len()
    }
}
