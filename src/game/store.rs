//! Entity store
//!
//! Owns every simulated entity, keyed by a monotonically increasing id.
//! Iteration is always in ascending id order so passes are deterministic.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::game::entity::{Entity, EntityId, EntityKind, Lifecycle};
use crate::util::vec2::Vec2;

/// Entity counts by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub actors: usize,
    pub obstacles: usize,
    pub projectiles: usize,
    pub cameras: usize,
}

impl KindCounts {
    pub fn total(&self) -> usize {
        self.actors + self.obstacles + self.projectiles + self.cameras
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity, FxBuildHasher>,
    /// Ids of stored entities, ascending (ids are allocated in order)
    order: Vec<EntityId>,
    next_id: EntityId,
    /// Ids marked this step, in marking order
    pending_removals: Vec<EntityId>,
    /// Largest width/height ever stored; widens spawn overlap queries
    max_extent: Vec2,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `Pending` entity and return it for further setup
    pub fn insert(
        &mut self,
        kind: EntityKind,
        position: Vec2,
        bounds: Vec2,
        velocity: Vec2,
    ) -> &mut Entity {
        let id = self.next_id;
        self.next_id += 1;

        self.max_extent = self.max_extent.max(bounds);
        self.order.push(id);
        self.entities.entry(id).or_insert(Entity {
            id,
            kind,
            position,
            bounds,
            velocity,
            last_updated: 0,
            state: Lifecycle::Pending,
            owner: None,
            sprite: None,
        })
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Stored and not marked for removal
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(Entity::is_live)
    }

    /// Ascending ids of every stored entity
    #[inline]
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Entities in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.order.iter().filter_map(move |id| self.entities.get(id))
    }

    /// Mutable access to every entity, in no particular order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn max_extent(&self) -> Vec2 {
        self.max_extent
    }

    /// Promote every `Pending` entity to `Active`. Returns how many changed.
    pub fn activate_pending(&mut self) -> usize {
        let mut promoted = 0;
        for entity in self.entities.values_mut() {
            if entity.state == Lifecycle::Pending {
                entity.state = Lifecycle::Active;
                promoted += 1;
            }
        }
        promoted
    }

    /// Mark an entity for removal at the end of the step.
    /// Returns false for unknown or already-marked ids.
    pub fn mark_for_removal(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) if entity.state != Lifecycle::PendingRemoval => {
                entity.state = Lifecycle::PendingRemoval;
                self.pending_removals.push(id);
                true
            }
            _ => false,
        }
    }

    /// Ids marked since the last call
    pub fn take_pending_removals(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_removals)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Ok(idx) = self.order.binary_search(&id) {
            self.order.remove(idx);
        }
        Some(entity)
    }

    /// Remove a batch of ids with a single pass over the order index
    pub fn remove_batch(&mut self, ids: &[EntityId]) -> Vec<Entity> {
        let removed: Vec<Entity> = ids.iter().filter_map(|id| self.entities.remove(id)).collect();
        if !removed.is_empty() {
            let entities = &self.entities;
            self.order.retain(|id| entities.contains_key(id));
        }
        removed
    }

    pub fn counts(&self) -> KindCounts {
        let mut counts = KindCounts::default();
        for entity in self.entities.values() {
            match entity.kind {
                EntityKind::MovableActor => counts.actors += 1,
                EntityKind::StaticObstacle => counts.obstacles += 1,
                EntityKind::Projectile => counts.projectiles += 1,
                EntityKind::CameraProxy => counts.cameras += 1,
            }
        }
        counts
    }
}
