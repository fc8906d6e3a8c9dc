use crate::game::entity::Tick;
use crate::game::spatial::SpatialGrid;
use crate::game::store::EntityStore;

/// Integrate every active, integrated entity: `position += velocity`.
/// Velocities are in units per step, so no `dt` scaling is applied.
///
/// Returns the number of entities moved.
pub fn integrate(store: &mut EntityStore, tick: Tick) -> usize {
    let mut moved = 0;
    for entity in store.iter_mut() {
        if !entity.is_active() || !entity.kind.is_integrated() {
            continue;
        }
        entity.position += entity.velocity;
        entity.last_updated = tick;
        moved += 1;
    }
    moved
}

/// Re-index every stored entity under the cell matching its position.
/// Returns the number that changed cell.
pub fn sync_grid(store: &EntityStore, grid: &mut SpatialGrid) -> usize {
    let mut changed = 0;
    for entity in store.iter() {
        if grid.update(entity.id, entity.position) {
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{EntityKind, Lifecycle};
    use crate::util::vec2::Vec2;

    fn create_test_store() -> (EntityStore, u64) {
        let mut store = EntityStore::new();
        let id = store
            .insert(EntityKind::MovableActor, Vec2::new(100.0, 100.0), Vec2::splat(10.0), Vec2::new(5.0, -2.0))
            .id;
        store.activate_pending();
        (store, id)
    }

    #[test]
    fn test_position_integration() {
        let (mut store, id) = create_test_store();
        assert_eq!(integrate(&mut store, 1), 1);

        let entity = store.get(id).unwrap();
        assert_eq!(entity.position, Vec2::new(105.0, 98.0));
        assert_eq!(entity.velocity, Vec2::new(5.0, -2.0));
        assert_eq!(entity.last_updated, 1);
    }

    #[test]
    fn test_pending_entities_not_integrated() {
        let (mut store, _) = create_test_store();
        let fresh = store
            .insert(EntityKind::Projectile, Vec2::ZERO, Vec2::ONE, Vec2::RIGHT)
            .id;

        integrate(&mut store, 1);

        let entity = store.get(fresh).unwrap();
        assert_eq!(entity.state, Lifecycle::Pending);
        assert_eq!(entity.position, Vec2::ZERO);
    }

    #[test]
    fn test_camera_and_obstacles_not_integrated() {
        let mut store = EntityStore::new();
        let camera = store
            .insert(EntityKind::CameraProxy, Vec2::ZERO, Vec2::splat(100.0), Vec2::new(3.0, 3.0))
            .id;
        let wall = store
            .insert(EntityKind::StaticObstacle, Vec2::ZERO, Vec2::splat(100.0), Vec2::new(1.0, 0.0))
            .id;
        store.activate_pending();

        assert_eq!(integrate(&mut store, 1), 0);
        assert_eq!(store.get(camera).unwrap().position, Vec2::ZERO);
        assert_eq!(store.get(wall).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_integration_determinism() {
        let (mut store1, id1) = create_test_store();
        let (mut store2, id2) = create_test_store();

        for tick in 1..=100 {
            integrate(&mut store1, tick);
            integrate(&mut store2, tick);
        }

        assert_eq!(store1.get(id1).unwrap().position, store2.get(id2).unwrap().position);
    }

    #[test]
    fn test_sync_grid_tracks_position() {
        let (mut store, id) = create_test_store();
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(id, store.get(id).unwrap().position);
        assert_eq!(grid.location(id), Some((1, 1)));

        store.get_mut(id).unwrap().position = Vec2::new(130.0, 100.0);
        assert_eq!(sync_grid(&store, &mut grid), 1);
        assert_eq!(grid.location(id), Some((2, 1)));
        assert_eq!(sync_grid(&store, &mut grid), 0);
    }
}
