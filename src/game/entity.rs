//! Entity definitions
//!
//! Entities are plain data owned by the `EntityStore`; every other
//! component refers to them by `EntityId` only.

use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Stable entity identifier. Never reused once allocated.
pub type EntityId = u64;

/// Simulation step counter
pub type Tick = u64;

/// Entity type tag - selects integration, resolution and bounds policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Moving body that bounces off actors, obstacles and world edges
    MovableActor,
    /// Immovable body; never reacts to contact
    StaticObstacle,
    /// Destroyed on contact or when leaving the world
    Projectile,
    /// Viewport that follows a target; never simulated on its own
    CameraProxy,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::MovableActor,
        EntityKind::StaticObstacle,
        EntityKind::Projectile,
        EntityKind::CameraProxy,
    ];

    /// Dense index used by the resolution table
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            EntityKind::MovableActor => 0,
            EntityKind::StaticObstacle => 1,
            EntityKind::Projectile => 2,
            EntityKind::CameraProxy => 3,
        }
    }

    /// Whether integration moves this kind by its velocity
    pub fn is_integrated(self) -> bool {
        !matches!(self, EntityKind::CameraProxy | EntityKind::StaticObstacle)
    }
}

/// Entity lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Spawned this step; indexed but skipped by every pass until the next step
    Pending,
    /// Fully simulated
    Active,
    /// Marked for removal; dropped at the end of the current step
    PendingRemoval,
}

/// Opaque handle the rendering collaborator maps to a sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteHandle(pub u32);

/// Per-axis flags (out-of-bounds axes, clamped axes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axes {
    pub x: bool,
    pub y: bool,
}

impl Axes {
    #[inline]
    pub fn any(&self) -> bool {
        self.x || self.y
    }
}

/// Axis-aligned bounding box, half-open: `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box with top-left corner `position` and size `extent`
    #[inline]
    pub fn from_extent(position: Vec2, extent: Vec2) -> Self {
        Self {
            min: position,
            max: position + extent,
        }
    }

    /// Strict overlap on both axes; boxes that only touch do not overlap
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x.max(other.min.x) < self.max.x.min(other.max.x)
            && self.min.y.max(other.min.y) < self.max.y.min(other.max.y)
    }
}

/// Simulated entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Top-left corner in world space
    pub position: Vec2,
    /// Width and height
    pub bounds: Vec2,
    /// Units per step
    pub velocity: Vec2,
    /// Step at which the entity was last integrated
    pub last_updated: Tick,
    pub state: Lifecycle,
    /// Entity that fired this one; the pair never collides
    pub owner: Option<EntityId>,
    pub sprite: Option<SpriteHandle>,
}

impl Entity {
    pub fn aabb(&self) -> Aabb {
        Aabb::from_extent(self.position, self.bounds)
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.bounds * 0.5
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == Lifecycle::Active
    }

    /// Still present in the store and not already condemned
    #[inline]
    pub fn is_live(&self) -> bool {
        self.state != Lifecycle::PendingRemoval
    }

    /// Whether a contact between these two is on the firer ignore-list
    pub fn is_related(&self, other: &Entity) -> bool {
        self.owner == Some(other.id) || other.owner == Some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::from_extent(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_overlap_requires_both_axes() {
        let a = aabb(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&aabb(5.0, 5.0, 10.0, 10.0)));
        // x overlaps, y does not
        assert!(!a.overlaps(&aabb(5.0, 20.0, 10.0, 10.0)));
        // y overlaps, x does not
        assert!(!a.overlaps(&aabb(20.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = aabb(0.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&aabb(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&aabb(0.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = aabb(10.0, 50.0, 10.0, 10.0);
        let b = aabb(15.0, 50.0, 10.0, 10.0);
        assert_eq!(a.overlaps(&b), b.overlaps(&a));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_containment_overlaps() {
        let outer = aabb(0.0, 0.0, 100.0, 100.0);
        let inner = aabb(40.0, 40.0, 5.0, 5.0);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_kind_index_is_dense() {
        for (i, kind) in EntityKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_integrated_kinds() {
        assert!(EntityKind::MovableActor.is_integrated());
        assert!(EntityKind::Projectile.is_integrated());
        assert!(!EntityKind::StaticObstacle.is_integrated());
        assert!(!EntityKind::CameraProxy.is_integrated());
    }
}
