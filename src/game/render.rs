//! Read-only frame view for the rendering collaborator
//!
//! The renderer runs between steps and only ever sees shared references
//! into the store. Display positions are derived from the scheduler's
//! interpolation fraction.

use serde::{Deserialize, Serialize};

use crate::game::entity::{Aabb, Entity, EntityId, EntityKind, SpriteHandle};
use crate::game::store::EntityStore;
use crate::util::vec2::Vec2;

/// How display positions are derived from the interpolation fraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// `position + velocity * alpha` for kinds that move between steps
    #[default]
    Predictive,
    /// `position` as of the last step
    Snap,
}

impl Interpolation {
    pub fn display_position(self, entity: &Entity, alpha: f64) -> Vec2 {
        match self {
            Interpolation::Predictive if moves_between_steps(entity.kind) => {
                entity.position + entity.velocity * alpha as f32
            }
            Interpolation::Predictive | Interpolation::Snap => entity.position,
        }
    }
}

/// Integrated kinds, plus cameras whose velocity mirrors their target
fn moves_between_steps(kind: EntityKind) -> bool {
    kind.is_integrated() || kind == EntityKind::CameraProxy
}

/// Everything the renderer needs to draw one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Interpolated top-left corner in world space
    pub position: Vec2,
    pub bounds: Vec2,
    pub sprite: Option<SpriteHandle>,
}

/// One frame's read-only view of the world
pub struct FrameView<'a> {
    store: &'a EntityStore,
    alpha: f64,
    interpolation: Interpolation,
    viewport: Option<Aabb>,
}

impl<'a> FrameView<'a> {
    pub fn new(store: &'a EntityStore, alpha: f64, interpolation: Interpolation) -> Self {
        Self {
            store,
            alpha,
            interpolation,
            viewport: None,
        }
    }

    /// Cull against the interpolated rectangle of a camera proxy.
    /// A missing camera leaves the view unculled.
    pub fn with_camera(mut self, camera: EntityId) -> Self {
        self.viewport = self
            .store
            .get(camera)
            .filter(|cam| cam.kind == EntityKind::CameraProxy)
            .map(|cam| Aabb::from_extent(self.interpolation.display_position(cam, self.alpha), cam.bounds));
        self
    }

    pub fn with_viewport(mut self, viewport: Aabb) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn viewport(&self) -> Option<Aabb> {
        self.viewport
    }

    /// Drawable entities in ascending id order. Camera proxies are never
    /// drawn; with a viewport, entities outside it are skipped.
    pub fn items(&self) -> impl Iterator<Item = RenderItem> + '_ {
        self.store
            .iter()
            .filter(|e| e.kind != EntityKind::CameraProxy)
            .map(|e| RenderItem {
                id: e.id,
                kind: e.kind,
                position: self.interpolation.display_position(e, self.alpha),
                bounds: e.bounds,
                sprite: e.sprite,
            })
            .filter(|item| {
                self.viewport
                    .map_or(true, |view| view.overlaps(&Aabb::from_extent(item.position, item.bounds)))
            })
    }

    /// World position relative to the viewport's top-left corner
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        match self.viewport {
            Some(view) => world - view.min,
            None => world,
        }
    }
}

/// External rendering collaborator
pub trait Renderer {
    fn render(&mut self, frame: &FrameView<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Vec2, b: Vec2) -> bool {
        a.approx_eq(b, 1e-5)
    }

    fn setup() -> (EntityStore, EntityId, EntityId, EntityId) {
        let mut store = EntityStore::new();
        let near = store
            .insert(EntityKind::MovableActor, Vec2::new(100.0, 100.0), Vec2::splat(10.0), Vec2::new(4.0, -2.0))
            .id;
        let far = store
            .insert(EntityKind::StaticObstacle, Vec2::new(900.0, 900.0), Vec2::splat(10.0), Vec2::ZERO)
            .id;
        let camera = store
            .insert(EntityKind::CameraProxy, Vec2::new(0.0, 0.0), Vec2::new(640.0, 480.0), Vec2::ZERO)
            .id;
        store.activate_pending();
        (store, near, far, camera)
    }

    #[test]
    fn test_predictive_interpolation() {
        let (store, near, _, _) = setup();
        let view = FrameView::new(&store, 0.5, Interpolation::Predictive);
        let item = view.items().find(|i| i.id == near).unwrap();
        assert!(approx_eq(item.position, Vec2::new(102.0, 99.0)));
    }

    #[test]
    fn test_static_obstacle_is_not_extrapolated() {
        let mut store = EntityStore::new();
        // Velocity on an obstacle is never integrated, so it must not be drawn either
        let wall = store
            .insert(EntityKind::StaticObstacle, Vec2::new(50.0, 50.0), Vec2::splat(20.0), Vec2::new(3.0, 3.0))
            .id;
        let camera = store
            .insert(EntityKind::CameraProxy, Vec2::new(10.0, 10.0), Vec2::splat(100.0), Vec2::new(2.0, 0.0))
            .id;
        store.activate_pending();

        let interp = Interpolation::Predictive;
        assert_eq!(interp.display_position(store.get(wall).unwrap(), 0.5), Vec2::new(50.0, 50.0));
        assert!(approx_eq(
            interp.display_position(store.get(camera).unwrap(), 0.5),
            Vec2::new(11.0, 10.0)
        ));
    }

    #[test]
    fn test_snap_interpolation() {
        let (store, near, _, _) = setup();
        let view = FrameView::new(&store, 0.5, Interpolation::Snap);
        let item = view.items().find(|i| i.id == near).unwrap();
        assert_eq!(item.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_camera_culls_offscreen_and_is_not_drawn() {
        let (store, near, far, camera) = setup();
        let view = FrameView::new(&store, 0.0, Interpolation::Predictive).with_camera(camera);

        let ids: Vec<_> = view.items().map(|i| i.id).collect();
        assert_eq!(ids, vec![near]);
        assert!(!ids.contains(&far));
    }

    #[test]
    fn test_unculled_view_draws_everything_but_cameras() {
        let (store, near, far, _) = setup();
        let view = FrameView::new(&store, 0.0, Interpolation::Snap);
        let ids: Vec<_> = view.items().map(|i| i.id).collect();
        assert_eq!(ids, vec![near, far]);
    }

    #[test]
    fn test_missing_camera_leaves_view_unculled() {
        let (store, _, _, _) = setup();
        let view = FrameView::new(&store, 0.0, Interpolation::Snap).with_camera(12345);
        assert!(view.viewport().is_none());
        assert_eq!(view.items().count(), 2);
    }

    #[test]
    fn test_to_screen_offsets_by_viewport() {
        let (store, _, _, _) = setup();
        let view = FrameView::new(&store, 0.0, Interpolation::Snap)
            .with_viewport(Aabb::from_extent(Vec2::new(50.0, 20.0), Vec2::splat(100.0)));
        assert_eq!(view.to_screen(Vec2::new(60.0, 70.0)), Vec2::new(10.0, 50.0));
    }
}
