//! Entity spawning
//!
//! Inserts a new entity into both the store and the grid. Non-overlapping
//! placement first tries the requested position, then a bounded number of
//! random positions inside the world, and fails rather than placing an
//! entity on top of another.

use rand::Rng;
use tracing::debug;

use crate::config::WorldBounds;
use crate::game::entity::{Aabb, EntityId, EntityKind, SpriteHandle};
use crate::game::spatial::SpatialGrid;
use crate::game::store::EntityStore;
use crate::util::vec2::Vec2;

/// Placement policy for a spawn request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Place exactly where requested, even on top of something
    AsRequested,
    /// Requested position if free, else random free positions within the retry budget
    NonOverlapping,
}

/// Parameters for a new entity
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub kind: EntityKind,
    pub position: Vec2,
    pub bounds: Vec2,
    pub velocity: Vec2,
    pub owner: Option<EntityId>,
    pub sprite: Option<SpriteHandle>,
    pub placement: Placement,
}

impl SpawnRequest {
    pub fn new(kind: EntityKind, position: Vec2, bounds: Vec2, velocity: Vec2) -> Self {
        Self {
            kind,
            position,
            bounds,
            velocity,
            owner: None,
            sprite: None,
            placement: Placement::NonOverlapping,
        }
    }

    /// Firer of this entity; the pair never collides and placement ignores it
    pub fn owner(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn sprite(mut self, sprite: SpriteHandle) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

/// Spawn errors - surfaced to the caller, never silently worked around
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpawnError {
    #[error("invalid spawn geometry: position {position:?}, bounds {bounds:?}, velocity {velocity:?}")]
    InvalidGeometry {
        position: Vec2,
        bounds: Vec2,
        velocity: Vec2,
    },
    #[error("extent {0:?} does not fit inside the world")]
    DoesNotFit(Vec2),
    #[error("no free position found after {attempts} attempts")]
    PlacementExhausted { attempts: u32 },
}

/// Borrowed view of everything a spawn touches
pub struct Spawner<'a, R: Rng + ?Sized> {
    pub store: &'a mut EntityStore,
    pub grid: &'a mut SpatialGrid,
    pub rng: &'a mut R,
    pub bounds: &'a WorldBounds,
    pub retry_budget: u32,
}

impl<R: Rng + ?Sized> Spawner<'_, R> {
    /// Create a `Pending` entity and index it. It joins the simulation at
    /// the start of the next step.
    pub fn spawn(&mut self, request: SpawnRequest) -> Result<EntityId, SpawnError> {
        let SpawnRequest {
            kind,
            position,
            bounds,
            velocity,
            owner,
            sprite,
            placement,
        } = request;

        if !(position.is_finite() && bounds.is_finite() && velocity.is_finite())
            || bounds.x < 0.0
            || bounds.y < 0.0
        {
            return Err(SpawnError::InvalidGeometry {
                position,
                bounds,
                velocity,
            });
        }

        let position = match placement {
            Placement::AsRequested => position,
            Placement::NonOverlapping => self.find_free_position(position, bounds, owner)?,
        };

        let entity = self.store.insert(kind, position, bounds, velocity);
        entity.owner = owner;
        entity.sprite = sprite;
        let id = entity.id;
        self.grid.insert(id, position);

        debug!("Spawned {:?} {} at ({:.1}, {:.1})", kind, id, position.x, position.y);
        Ok(id)
    }

    fn find_free_position(
        &mut self,
        requested: Vec2,
        extent: Vec2,
        owner: Option<EntityId>,
    ) -> Result<Vec2, SpawnError> {
        if !self.overlaps_existing(Aabb::from_extent(requested, extent), owner) {
            return Ok(requested);
        }
        if !self.bounds.fits(extent) {
            return Err(SpawnError::DoesNotFit(extent));
        }

        for _ in 0..self.retry_budget {
            let Some(candidate) = self.bounds.random_position(self.rng, extent) else {
                break;
            };
            if !self.overlaps_existing(Aabb::from_extent(candidate, extent), owner) {
                return Ok(candidate);
            }
        }

        Err(SpawnError::PlacementExhausted {
            attempts: self.retry_budget + 1,
        })
    }

    /// Whether `aabb` overlaps any live, collidable entity other than `ignore`
    fn overlaps_existing(&self, aabb: Aabb, ignore: Option<EntityId>) -> bool {
        // Entities are indexed by top-left corner; widen by the largest extent
        let reach = aabb.min - self.store.max_extent();
        self.grid.query_region(reach, aabb.max).into_iter().any(|id| {
            if Some(id) == ignore {
                return false;
            }
            self.store.get(id).is_some_and(|other| {
                other.is_live() && other.kind != EntityKind::CameraProxy && other.aabb().overlaps(&aabb)
            })
        })
    }
}
