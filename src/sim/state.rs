//! World state
//!
//! The world exclusively owns its bodies. Everything that affects a future
//! step (bodies, gravity, clock, RNG, sensor contacts) lives here so two worlds
//! fed the same seed and commands stay bit-identical.

use std::collections::BTreeSet;
use std::sync::Arc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::body::{Body, BodyId, BodyKind, BodyView, CommentPayload, Snapshot};
use super::layout::{Layout, StaticKind};
use crate::Rect;
use crate::consts::*;
use crate::error::WorldError;

/// The physics world
#[derive(Debug, Clone)]
pub struct World {
    /// Seed for spawn positions
    pub(super) seed: u64,
    pub(super) rng: Pcg32,
    /// Gravity in units of `GRAVITY_SCALE`
    pub(super) gravity: Vec2,
    /// All bodies, sorted by id for deterministic iteration
    pub(super) bodies: Vec<Body>,
    /// Static layout, present once initialized
    pub(super) layout: Option<Layout>,
    pub(super) area: Option<Rect>,
    /// Comments overlapping the sensor after the previous step
    pub(super) sensor_contacts: BTreeSet<BodyId>,
    /// Simulated clock
    pub(super) time_ms: f64,
    pub(super) step_count: u64,
    next_id: u32,
}

impl World {
    /// Create an empty, uninitialized world
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            gravity: Vec2::new(DEFAULT_GRAVITY.0, DEFAULT_GRAVITY.1),
            bodies: Vec::new(),
            layout: None,
            area: None,
            sensor_contacts: BTreeSet::new(),
            time_ms: 0.0,
            step_count: 0,
            next_id: 1,
        }
    }

    /// Build the static layout for a game area
    ///
    /// Re-initializing replaces the static geometry and keeps live comments.
    pub fn initialize(&mut self, area: Rect) -> Result<(), WorldError> {
        // The area lives inside the virtual canvas; anything larger would
        // only inflate the peg rows
        if !area.is_valid() || area.width > VIRTUAL_WIDTH || area.height > VIRTUAL_HEIGHT {
            return Err(WorldError::InvalidBounds(format!("{area:?}")));
        }

        self.bodies.retain(|b| !b.is_static());
        let layout = Layout::build(&area);
        for piece in layout.pieces() {
            let kind = match piece.kind {
                StaticKind::Wall => BodyKind::Wall,
                StaticKind::Peg => BodyKind::Peg,
                StaticKind::Sensor => BodyKind::Sensor,
            };
            let id = self.next_body_id();
            self.bodies
                .push(Body::new_static(id, kind, piece.shape, piece.pos));
        }
        self.normalize_order();

        log::info!(
            "World initialized: area={:?}, pegs={}, spawn band={:?}",
            area,
            layout.pegs.len(),
            layout.spawn_band
        );
        self.layout = Some(layout);
        self.area = Some(area);
        self.sensor_contacts.clear();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.layout.is_some()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn area(&self) -> Option<Rect> {
        self.area
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Allocate a new body ID
    fn next_body_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Drop a comment at a random x in the spawn band, above the canvas
    pub fn spawn_comment(
        &mut self,
        payload: CommentPayload,
        ttl_ms: Option<u64>,
    ) -> Result<BodyId, WorldError> {
        let (left, right) = self
            .layout
            .as_ref()
            .map(|l| l.spawn_band)
            .ok_or(WorldError::NotInitialized)?;
        payload.validate()?;

        let x = if left < right {
            self.rng.random_range(left..right)
        } else {
            left
        };
        self.insert_comment(Arc::new(payload), ttl_ms, Vec2::new(x, SPAWN_Y))
    }

    /// Spawn a comment at an exact position instead of the spawn band
    pub fn spawn_comment_at(
        &mut self,
        payload: CommentPayload,
        ttl_ms: Option<u64>,
        pos: Vec2,
    ) -> Result<BodyId, WorldError> {
        payload.validate()?;
        self.insert_comment(Arc::new(payload), ttl_ms, pos)
    }

    /// Insert a comment at an exact position
    pub(super) fn insert_comment(
        &mut self,
        payload: Arc<CommentPayload>,
        ttl_ms: Option<u64>,
        pos: Vec2,
    ) -> Result<BodyId, WorldError> {
        if !self.is_initialized() {
            return Err(WorldError::NotInitialized);
        }
        let id = self.next_body_id();
        let ttl = ttl_ms.map(|ms| ms as f64);
        // Ids only grow, so pushing keeps the order
        self.bodies
            .push(Body::new_comment(id, payload, pos, self.time_ms, ttl));
        log::debug!("Spawned comment {:?} at ({:.1}, {:.1})", id, pos.x, pos.y);
        Ok(id)
    }

    /// Set gravity; applies from the next step
    pub fn set_gravity(&mut self, x: f32, y: f32) {
        if !x.is_finite() || !y.is_finite() {
            log::warn!("Ignoring non-finite gravity ({x}, {y})");
            return;
        }
        self.gravity = Vec2::new(x, y);
    }

    /// Remove every non-static body
    pub fn clear_world(&mut self) {
        let before = self.bodies.len();
        self.bodies.retain(|b| b.is_static());
        self.sensor_contacts.clear();
        log::info!("World cleared ({} bodies removed)", before - self.bodies.len());
    }

    /// Number of live comment bodies
    pub fn comment_count(&self) -> usize {
        self.bodies.iter().filter(|b| !b.is_static()).count()
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.binary_search_by_key(&id, |b| b.id).is_ok()
    }

    /// Owned copy of all renderable state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.step_count,
            time_ms: self.time_ms,
            bodies: self.bodies.iter().map(BodyView::from).collect(),
        }
    }

    /// Ensure bodies are sorted by ID for deterministic iteration
    pub(super) fn normalize_order(&mut self) {
        self.bodies.sort_by_key(|b| b.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::{BodyTag, Color};

    fn hello() -> CommentPayload {
        CommentPayload::text("hello", Color::from_hue(42.0))
    }

    #[test]
    fn test_spawn_before_initialize_fails() {
        let mut world = World::new(1);
        assert_eq!(
            world.spawn_comment(hello(), None),
            Err(WorldError::NotInitialized)
        );
        assert!(world.snapshot().bodies.is_empty());
    }

    #[test]
    fn test_initialize_rejects_degenerate_area() {
        let mut world = World::new(1);
        let result = world.initialize(Rect::new(0.0, 0.0, 0.0, 100.0));
        assert!(matches!(result, Err(WorldError::InvalidBounds(_))));
        assert!(!world.is_initialized());
    }

    #[test]
    fn test_initialize_rejects_area_beyond_canvas() {
        let mut world = World::new(1);
        let result = world.initialize(Rect::new(0.0, 0.0, 1e12, 720.0));
        assert!(matches!(result, Err(WorldError::InvalidBounds(_))));
        let result = world.initialize(Rect::new(0.0, 0.0, 1280.0, VIRTUAL_HEIGHT + 1.0));
        assert!(matches!(result, Err(WorldError::InvalidBounds(_))));
        assert!(!world.is_initialized());

        // The full canvas itself is fine
        world
            .initialize(Rect::new(0.0, 0.0, VIRTUAL_WIDTH, VIRTUAL_HEIGHT))
            .unwrap();
        assert!(world.is_initialized());
    }

    #[test]
    fn test_initialize_builds_one_sensor() {
        let mut world = World::new(1);
        world.initialize(Rect::default()).unwrap();
        let snapshot = world.snapshot();
        let sensors = snapshot.bodies.iter().filter(|b| b.kind == BodyTag::Sensor).count();
        let pegs = snapshot.bodies.iter().filter(|b| b.kind == BodyTag::Peg).count();
        let walls = snapshot.bodies.iter().filter(|b| b.kind == BodyTag::Wall).count();
        assert_eq!(sensors, 1);
        assert_eq!(pegs, 30);
        assert_eq!(walls, 2);

        // Re-initializing does not duplicate static geometry
        world.initialize(Rect::default()).unwrap();
        assert_eq!(world.snapshot().bodies.len(), snapshot.bodies.len());
    }

    #[test]
    fn test_spawn_position_and_validation() {
        let mut world = World::new(7);
        world.initialize(Rect::default()).unwrap();

        let id = world.spawn_comment(hello(), Some(5_000)).unwrap();
        let snapshot = world.snapshot();
        let body = snapshot.get(id).unwrap();
        assert_eq!(body.y, SPAWN_Y);
        assert!(body.x >= 420.0 && body.x < 1500.0);
        assert_eq!(body.payload.as_ref().unwrap().text, "hello");

        let bad = CommentPayload::text("", Color::from_hue(1.0));
        assert!(matches!(
            world.spawn_comment(bad, None),
            Err(WorldError::InvalidPayload(_))
        ));
        assert_eq!(world.comment_count(), 1);
    }

    #[test]
    fn test_spawn_at_exact_position() {
        let mut world = World::new(7);
        world.initialize(Rect::default()).unwrap();

        let id = world
            .spawn_comment_at(hello(), None, Vec2::new(960.0, 980.0))
            .unwrap();
        let snapshot = world.snapshot();
        let body = snapshot.get(id).unwrap();
        assert_eq!((body.x, body.y), (960.0, 980.0));

        let bad = CommentPayload::text("", Color::from_hue(1.0));
        assert!(matches!(
            world.spawn_comment_at(bad, None, Vec2::ZERO),
            Err(WorldError::InvalidPayload(_))
        ));
        assert_eq!(world.comment_count(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut world = World::new(3);
        world.initialize(Rect::default()).unwrap();
        let a = world.spawn_comment(hello(), None).unwrap();
        world.clear_world();
        let b = world.spawn_comment(hello(), None).unwrap();
        assert_ne!(a, b);
        assert!(!world.contains(a));
        assert!(world.contains(b));
    }

    #[test]
    fn test_clear_keeps_static_geometry() {
        let mut world = World::new(3);
        world.initialize(Rect::default()).unwrap();
        let statics = world.snapshot().bodies.len();
        for _ in 0..5 {
            world.spawn_comment(hello(), None).unwrap();
        }
        assert_eq!(world.comment_count(), 5);

        world.clear_world();
        assert_eq!(world.comment_count(), 0);
        assert_eq!(world.snapshot().bodies.len(), statics);
    }

    #[test]
    fn test_set_gravity_ignores_nan() {
        let mut world = World::new(3);
        world.set_gravity(0.5, -1.0);
        world.set_gravity(f32::NAN, 1.0);
        assert_eq!(world.gravity(), Vec2::new(0.5, -1.0));
    }
}
