//! Target tracking (camera follow)
//!
//! The tracking entity is a derived projection of its target: it is never
//! integrated, only repositioned here after every step.

use tracing::debug;

use super::StepContext;
use crate::game::entity::EntityId;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTarget {
    pub target: EntityId,
}

impl TrackTarget {
    pub fn new(target: EntityId) -> Self {
        Self { target }
    }

    /// `position = target.position - own.bounds / 2`, clamped into the world.
    /// Velocity copies the target's, zeroed on clamped axes.
    pub(super) fn follow(&self, owner: EntityId, ctx: &mut StepContext<'_>) {
        let (target_pos, target_vel) = match ctx.store.get(self.target) {
            Some(t) if t.is_live() => (t.position, t.velocity),
            _ => {
                debug!("Entity {} tracks missing target {}", owner, self.target);
                return;
            }
        };

        let Some(entity) = ctx.store.get_mut(owner) else {
            return;
        };
        let desired = target_pos - entity.bounds * 0.5;
        let (position, clamped) = ctx.config.bounds.clamp_position(desired, entity.bounds);

        entity.position = position;
        entity.velocity = Vec2::new(
            if clamped.x { 0.0 } else { target_vel.x },
            if clamped.y { 0.0 } else { target_vel.y },
        );
        ctx.grid.update(owner, position);
    }
}
