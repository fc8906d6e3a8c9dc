//! Narrow-phase collision detection and per-type resolution
//!
//! Consumes the broad-phase candidate pairs produced by the spatial grid,
//! runs an AABB test on each, and applies the reaction each side has to
//! the other's type. Reactions are looked up in a fixed table, so the
//! outcome for an entity depends only on its own kind and the other's
//! kind, never on which side of the pair it was listed on.

use tracing::trace;

use crate::game::entity::{EntityId, EntityKind};
use crate::game::store::EntityStore;

use crate::game::entity::EntityKind::{
    CameraProxy as C, MovableActor as A, Projectile as P, StaticObstacle as S,
};
use self::Reaction::{Destroy as D, Ignore as I, Observe as O, Reflect as R};

/// How an entity responds to touching another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// The pair is not tested at all and no contact is reported
    Ignore,
    /// Contact is reported, this side is unaffected
    Observe,
    /// Negate both velocity components
    Reflect,
    /// Mark for removal at the end of the step
    Destroy,
}

/// `REACTIONS[own][other]`, indexed by `EntityKind::index`
const REACTIONS: [[Reaction; 4]; 4] = {
    let mut table = [[I; 4]; 4];
    table[A.index()] = [R, R, O, I];
    table[S.index()] = [O, I, O, I];
    table[P.index()] = [D, D, D, I];
    table[C.index()] = [I, I, I, I];
    table
};

/// Reaction of an entity of kind `own` touching one of kind `other`
#[inline]
pub fn reaction(own: EntityKind, other: EntityKind) -> Reaction {
    REACTIONS[own.index()][other.index()]
}

/// Reactions for both sides of a pair, or `None` if the pair is ignored
pub fn pair_reactions(a: EntityKind, b: EntityKind) -> Option<(Reaction, Reaction)> {
    let (ra, rb) = (reaction(a, b), reaction(b, a));
    if ra == Reaction::Ignore || rb == Reaction::Ignore {
        None
    } else {
        Some((ra, rb))
    }
}

/// A detected overlap, both ids valid until the end of the step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
}

/// Counters for one collision pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionStats {
    /// Broad-phase pairs considered
    pub candidates: usize,
    /// Pairs that reached the AABB test
    pub tests: usize,
    /// Overlapping pairs
    pub contacts: usize,
}

/// Resolve every candidate pair.
///
/// Pairs touching a non-`Active` entity are skipped, which covers both
/// entities spawned during this step and entities already condemned
/// earlier in the pass. Detected contacts are appended to `contacts`.
pub fn resolve(
    store: &mut EntityStore,
    pairs: &[(EntityId, EntityId)],
    contacts: &mut Vec<Contact>,
) -> CollisionStats {
    let mut stats = CollisionStats {
        candidates: pairs.len(),
        ..Default::default()
    };

    for &(a, b) in pairs {
        let (Some(ea), Some(eb)) = (store.get(a), store.get(b)) else {
            continue;
        };
        if !ea.is_active() || !eb.is_active() || ea.is_related(eb) {
            continue;
        }
        let Some((ra, rb)) = pair_reactions(ea.kind, eb.kind) else {
            continue;
        };

        stats.tests += 1;
        if !ea.aabb().overlaps(&eb.aabb()) {
            continue;
        }

        trace!("Contact {} <-> {} ({:?}/{:?})", a, b, ra, rb);
        stats.contacts += 1;
        contacts.push(Contact { a, b });
        apply(store, a, ra);
        apply(store, b, rb);
    }

    stats
}

fn apply(store: &mut EntityStore, id: EntityId, reaction: Reaction) {
    match reaction {
        Reaction::Reflect => {
            if let Some(entity) = store.get_mut(id) {
                entity.velocity = -entity.velocity;
            }
        }
        Reaction::Destroy => {
            store.mark_for_removal(id);
        }
        Reaction::Observe | Reaction::Ignore => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Lifecycle;
    use crate::util::vec2::Vec2;

    fn spawn(store: &mut EntityStore, kind: EntityKind, pos: (f32, f32), vel: (f32, f32)) -> EntityId {
        let id = store
            .insert(kind, Vec2::new(pos.0, pos.1), Vec2::splat(10.0), Vec2::new(vel.0, vel.1))
            .id;
        store.activate_pending();
        id
    }

    #[test]
    fn test_actor_actor_bounce() {
        // Positions after two steps of the approaching-actors scenario
        let mut store = EntityStore::new();
        let a = spawn(&mut store, A, (10.0, 50.0), (5.0, 0.0));
        let b = spawn(&mut store, A, (15.0, 50.0), (-5.0, 0.0));

        let mut contacts = Vec::new();
        let stats = resolve(&mut store, &[(a, b)], &mut contacts);

        assert_eq!(stats.contacts, 1);
        assert_eq!(contacts, vec![Contact { a, b }]);
        assert_eq!(store.get(a).unwrap().velocity, Vec2::new(-5.0, 0.0));
        assert_eq!(store.get(b).unwrap().velocity, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let setup = || {
            let mut store = EntityStore::new();
            let a = spawn(&mut store, A, (0.0, 0.0), (3.0, 1.0));
            let b = spawn(&mut store, S, (5.0, 5.0), (0.0, 0.0));
            (store, a, b)
        };

        let (mut forward, a, b) = setup();
        resolve(&mut forward, &[(a, b)], &mut Vec::new());
        let (mut backward, a2, b2) = setup();
        resolve(&mut backward, &[(b2, a2)], &mut Vec::new());

        assert_eq!(forward.get(a).unwrap().velocity, backward.get(a2).unwrap().velocity);
        assert_eq!(forward.get(b).unwrap().velocity, backward.get(b2).unwrap().velocity);
    }

    #[test]
    fn test_actor_obstacle_only_actor_reflects() {
        let mut store = EntityStore::new();
        let actor = spawn(&mut store, A, (0.0, 0.0), (4.0, -2.0));
        let wall = spawn(&mut store, S, (5.0, 0.0), (0.0, 0.0));

        resolve(&mut store, &[(actor, wall)], &mut Vec::new());

        assert_eq!(store.get(actor).unwrap().velocity, Vec2::new(-4.0, 2.0));
        assert_eq!(store.get(wall).unwrap().velocity, Vec2::ZERO);
        assert_eq!(store.get(wall).unwrap().state, Lifecycle::Active);
    }

    #[test]
    fn test_projectile_destroyed_other_policy_applies() {
        let mut store = EntityStore::new();
        let actor = spawn(&mut store, A, (0.0, 0.0), (1.0, 0.0));
        let shot = spawn(&mut store, P, (5.0, 0.0), (-8.0, 0.0));

        let mut contacts = Vec::new();
        resolve(&mut store, &[(actor, shot)], &mut contacts);

        assert_eq!(contacts.len(), 1);
        assert_eq!(store.get(shot).unwrap().state, Lifecycle::PendingRemoval);
        // Actor observes a projectile: unchanged
        assert_eq!(store.get(actor).unwrap().velocity, Vec2::new(1.0, 0.0));
        assert_eq!(store.take_pending_removals(), vec![shot]);
    }

    #[test]
    fn test_projectile_ignores_its_firer() {
        let mut store = EntityStore::new();
        let firer = spawn(&mut store, A, (0.0, 0.0), (1.0, 0.0));
        let shot = spawn(&mut store, P, (2.0, 2.0), (5.0, 0.0));
        store.get_mut(shot).unwrap().owner = Some(firer);

        let mut contacts = Vec::new();
        let stats = resolve(&mut store, &[(firer, shot)], &mut contacts);

        assert_eq!(stats.tests, 0);
        assert!(contacts.is_empty());
        assert_eq!(store.get(shot).unwrap().state, Lifecycle::Active);
    }

    #[test]
    fn test_camera_pairs_ignored() {
        let mut store = EntityStore::new();
        let camera = spawn(&mut store, C, (0.0, 0.0), (0.0, 0.0));
        let shot = spawn(&mut store, P, (2.0, 2.0), (5.0, 0.0));
        let actor = spawn(&mut store, A, (3.0, 3.0), (5.0, 0.0));

        let mut contacts = Vec::new();
        resolve(&mut store, &[(camera, shot), (camera, actor)], &mut contacts);

        assert!(contacts.is_empty());
        assert_eq!(store.get(shot).unwrap().state, Lifecycle::Active);
        assert_eq!(store.get(actor).unwrap().velocity, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_condemned_entity_skipped_for_rest_of_pass() {
        let mut store = EntityStore::new();
        let shot = spawn(&mut store, P, (0.0, 0.0), (1.0, 0.0));
        let wall = spawn(&mut store, S, (2.0, 0.0), (0.0, 0.0));
        let actor = spawn(&mut store, A, (4.0, 0.0), (2.0, 0.0));

        let mut contacts = Vec::new();
        resolve(&mut store, &[(shot, wall), (shot, actor), (wall, actor)], &mut contacts);

        // (shot, actor) skipped once the shot was condemned by the wall
        assert_eq!(contacts, vec![Contact { a: shot, b: wall }, Contact { a: wall, b: actor }]);
        assert_eq!(store.get(actor).unwrap().velocity, Vec2::new(-2.0, 0.0));
    }

    #[test]
    fn test_pending_entities_excluded() {
        let mut store = EntityStore::new();
        let actor = spawn(&mut store, A, (0.0, 0.0), (1.0, 0.0));
        let fresh = store
            .insert(A, Vec2::new(1.0, 1.0), Vec2::splat(10.0), Vec2::ZERO)
            .id;

        let stats = resolve(&mut store, &[(actor, fresh)], &mut Vec::new());
        assert_eq!(stats.tests, 0);
        assert_eq!(store.get(actor).unwrap().velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_no_contact_without_overlap() {
        let mut store = EntityStore::new();
        let a = spawn(&mut store, A, (5.0, 50.0), (5.0, 0.0));
        let b = spawn(&mut store, A, (20.0, 50.0), (-5.0, 0.0));

        let stats = resolve(&mut store, &[(a, b)], &mut Vec::new());
        assert_eq!(stats.tests, 1);
        assert_eq!(stats.contacts, 0);
        assert_eq!(store.get(a).unwrap().velocity, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_reaction_table() {
        assert_eq!(pair_reactions(A, A), Some((R, R)));
        assert_eq!(pair_reactions(A, S), Some((R, O)));
        assert_eq!(pair_reactions(S, A), Some((O, R)));
        assert_eq!(pair_reactions(P, S), Some((D, O)));
        assert_eq!(pair_reactions(P, P), Some((D, D)));
        assert_eq!(pair_reactions(S, S), None);
        for kind in EntityKind::ALL {
            assert_eq!(pair_reactions(C, kind), None);
            assert_eq!(pair_reactions(kind, C), None);
        }
    }
}
