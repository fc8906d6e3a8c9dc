//! Input-driven behaviors: movement and projectile launching

use tracing::{debug, warn};

use super::{Behavior, StepContext};
use crate::game::constants::projectile;
use crate::game::entity::{EntityId, EntityKind};
use crate::game::input_buffer::{Direction, Intent};
use crate::game::spawn::{Placement, SpawnRequest};
use crate::game::store::EntityStore;
use crate::util::vec2::Vec2;

use super::lifetime::Expiry;

/// Adds `speed` along a direction while it is held and takes it back on release
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOnInput {
    pub speed: f32,
    /// Held state per direction: up, down, left, right
    held: [bool; 4],
}

impl MoveOnInput {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            held: [false; 4],
        }
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.held[slot(direction)]
    }

    pub(super) fn on_intent(&mut self, owner: EntityId, intent: &Intent, store: &mut EntityStore) {
        let Intent::Move { direction, engaged } = *intent else {
            return;
        };
        let held = &mut self.held[slot(direction)];
        // Repeated presses or stray releases leave velocity alone
        if *held == engaged {
            return;
        }
        *held = engaged;

        let Some(entity) = store.get_mut(owner) else {
            return;
        };
        let delta = direction.unit() * self.speed;
        if engaged {
            entity.velocity += delta;
        } else {
            entity.velocity -= delta;
        }
    }
}

fn slot(direction: Direction) -> usize {
    match direction {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Left => 2,
        Direction::Right => 3,
    }
}

/// Fires a projectile toward the last pointer position while the trigger is held
#[derive(Debug, Clone, PartialEq)]
pub struct Launcher {
    pub speed: f32,
    pub extent: f32,
    /// Steps between two shots
    pub cooldown_steps: u32,
    /// Lifetime given to each projectile
    pub lifetime_steps: u32,
    trigger: bool,
    aim: Option<Vec2>,
    cooldown: u32,
}

impl Launcher {
    pub fn new(speed: f32, extent: f32, cooldown_steps: u32, lifetime_steps: u32) -> Self {
        Self {
            speed,
            extent,
            cooldown_steps,
            lifetime_steps,
            trigger: false,
            aim: None,
            cooldown: 0,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger
    }

    pub fn aim(&self) -> Option<Vec2> {
        self.aim
    }

    pub(super) fn on_intent(&mut self, intent: &Intent) {
        match *intent {
            Intent::Fire { engaged } => self.trigger = engaged,
            Intent::Pointer { position } => self.aim = Some(position),
            Intent::Move { .. } | Intent::Quit => {}
        }
    }

    pub(super) fn tick(&mut self, owner: EntityId, ctx: &mut StepContext<'_>) {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return;
        }
        if !self.trigger {
            return;
        }

        let origin = match ctx.store.get(owner) {
            Some(firer) => firer.center(),
            None => return,
        };
        // Fall back to facing right when aimed at the firer itself
        let direction = match self.aim.map(|aim| (aim - origin).normalize()) {
            Some(dir) if dir != Vec2::ZERO => dir,
            _ => Vec2::RIGHT,
        };

        let extent = Vec2::splat(self.extent);
        let request = SpawnRequest::new(
            EntityKind::Projectile,
            origin - extent * 0.5,
            extent,
            direction * self.speed,
        )
        .owner(owner)
        .placement(Placement::AsRequested);

        let spawned = ctx.spawner().spawn(request);
        match spawned {
            Ok(shot) => {
                ctx.attach(shot, Behavior::ExpireAfterFrames(Expiry::new(self.lifetime_steps)));
                self.cooldown = self.cooldown_steps;
                debug!("Entity {} fired projectile {}", owner, shot);
            }
            Err(e) => warn!("Entity {} failed to fire: {}", owner, e),
        }
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(
            projectile::SPEED,
            projectile::EXTENT,
            projectile::COOLDOWN_STEPS,
            projectile::LIFETIME_STEPS,
        )
    }
}
