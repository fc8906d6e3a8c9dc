//! World boundary checks
//!
//! Runs after integration. Movable actors bounce off the world edges one
//! axis at a time, projectiles leaving the world are condemned, static
//! obstacles are only reported, and camera proxies are skipped (their
//! tracking behavior keeps them clamped).

use crate::config::WorldBounds;
use crate::game::entity::{Axes, EntityId, EntityKind};
use crate::game::store::EntityStore;

/// An entity found outside the world this step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breach {
    pub id: EntityId,
    pub axes: Axes,
}

/// Check every active entity against the world bounds.
///
/// Breaches are appended to `breaches` in ascending id order. Returns the
/// number of projectiles condemned.
pub fn check(store: &mut EntityStore, bounds: &WorldBounds, breaches: &mut Vec<Breach>) -> usize {
    let first = breaches.len();
    let mut expired = Vec::new();

    for entity in store.iter_mut() {
        if !entity.is_active() || entity.kind == EntityKind::CameraProxy {
            continue;
        }
        let axes = bounds.exceeded_axes(entity.position, entity.bounds);
        if !axes.any() {
            continue;
        }

        match entity.kind {
            EntityKind::MovableActor => {
                // Only flip a component still heading further out
                let far = entity.position + entity.bounds;
                if axes.x
                    && ((entity.position.x < bounds.min.x && entity.velocity.x < 0.0)
                        || (far.x > bounds.max.x && entity.velocity.x > 0.0))
                {
                    entity.velocity.x = -entity.velocity.x;
                }
                if axes.y
                    && ((entity.position.y < bounds.min.y && entity.velocity.y < 0.0)
                        || (far.y > bounds.max.y && entity.velocity.y > 0.0))
                {
                    entity.velocity.y = -entity.velocity.y;
                }
            }
            EntityKind::Projectile => expired.push(entity.id),
            EntityKind::StaticObstacle | EntityKind::CameraProxy => {}
        }

        breaches.push(Breach { id: entity.id, axes });
    }

    breaches[first..].sort_unstable_by_key(|b| b.id);
    expired.into_iter().filter(|&id| store.mark_for_removal(id)).count()
}
