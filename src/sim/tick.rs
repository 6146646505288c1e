//! Fixed timestep simulation tick
//!
//! Advances the world deterministically: integrate, resolve contacts, cull,
//! then detect new sensor contacts.

use std::collections::BTreeSet;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodyId, CommentPayload, Shape};
use super::collision::{bounce_velocity, circle_circle, circle_overlaps_rect, circle_rect};
use super::layout::{StaticKind, StaticPiece};
use super::state::World;
use crate::consts::*;
use crate::error::WorldError;

/// Mutation requests for the world, applied between steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorldCommand {
    SpawnComment {
        payload: CommentPayload,
        #[serde(default)]
        ttl_ms: Option<u64>,
    },
    SetGravity {
        x: f32,
        y: f32,
    },
    ClearWorld,
}

/// Side-channel events raised by a step
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// A comment touched the sensor (once per contact)
    LuckyHit {
        body_id: BodyId,
        payload: Arc<CommentPayload>,
    },
}

impl World {
    /// Apply one command; returns the spawned body id for spawns
    pub fn apply(&mut self, command: WorldCommand) -> Result<Option<BodyId>, WorldError> {
        match command {
            WorldCommand::SpawnComment { payload, ttl_ms } => {
                self.spawn_comment(payload, ttl_ms).map(Some)
            }
            WorldCommand::SetGravity { x, y } => {
                self.set_gravity(x, y);
                Ok(None)
            }
            WorldCommand::ClearWorld => {
                self.clear_world();
                Ok(None)
            }
        }
    }

    /// Advance the world by one fixed timestep
    pub fn step(&mut self, dt_ms: f32) -> Vec<WorldEvent> {
        let dt = dt_ms / 1000.0;
        self.time_ms += dt_ms as f64;
        self.step_count += 1;

        let accel = self.gravity * GRAVITY_SCALE;
        for body in self.bodies.iter_mut().filter(|b| !b.is_static()) {
            body.vel += accel * dt;
            body.pos += body.vel * dt;
            body.angle += body.angular_vel * dt;
        }

        self.resolve_body_contacts();
        self.resolve_static_contacts();
        self.cull();
        self.detect_sensor_contacts()
    }

    /// Comment against comment (equal-density circles)
    fn resolve_body_contacts(&mut self) {
        let n = self.bodies.len();
        for i in 0..n {
            if self.bodies[i].is_static() {
                continue;
            }
            for j in (i + 1)..n {
                if self.bodies[j].is_static() {
                    continue;
                }
                let (head, tail) = self.bodies.split_at_mut(j);
                resolve_pair(&mut head[i], &mut tail[0]);
            }
        }
    }

    /// Comments against walls and pegs (the sensor has no response)
    fn resolve_static_contacts(&mut self) {
        let Some(layout) = self.layout.as_ref() else {
            return;
        };
        for body in self.bodies.iter_mut().filter(|b| !b.is_static()) {
            for piece in layout.walls.iter().chain(layout.pegs.iter()) {
                resolve_static(body, piece);
            }
        }
    }

    /// Remove comments that fell off the world or outlived their TTL
    fn cull(&mut self) {
        let limit = VIRTUAL_HEIGHT + OUT_OF_BOUNDS_MARGIN;
        let now = self.time_ms;
        let before = self.bodies.len();
        self.bodies.retain(|b| {
            if b.is_static() {
                return true;
            }
            if b.pos.y > limit {
                log::debug!("Comment {:?} fell off the world", b.id);
                return false;
            }
            if b.is_expired(now) {
                log::debug!("Comment {:?} expired", b.id);
                return false;
            }
            true
        });
        if self.bodies.len() != before {
            let live: BTreeSet<BodyId> = self.bodies.iter().map(|b| b.id).collect();
            self.sensor_contacts.retain(|id| live.contains(id));
        }
    }

    /// Edge-triggered: only comments that were not touching last step fire
    fn detect_sensor_contacts(&mut self) -> Vec<WorldEvent> {
        let Some(sensor) = self.layout.as_ref().map(|l| l.sensor) else {
            return Vec::new();
        };
        let half = sensor.shape.half_extents();

        let mut touching = BTreeSet::new();
        let mut events = Vec::new();
        for body in &self.bodies {
            let Some(payload) = body.payload() else {
                continue;
            };
            let Shape::Circle { radius } = body.shape else {
                continue;
            };
            if circle_overlaps_rect(body.pos, radius, sensor.pos, half) {
                touching.insert(body.id);
                if !self.sensor_contacts.contains(&body.id) {
                    log::debug!("Sensor contact by comment {:?}", body.id);
                    events.push(WorldEvent::LuckyHit {
                        body_id: body.id,
                        payload: Arc::clone(payload),
                    });
                }
            }
        }
        self.sensor_contacts = touching;
        events
    }
}

fn circle_radius(body: &Body) -> Option<f32> {
    match body.shape {
        Shape::Circle { radius } => Some(radius),
        Shape::Rect { .. } => None,
    }
}

/// Separate and bounce two dynamic circles
fn resolve_pair(a: &mut Body, b: &mut Body) {
    let (Some(ra), Some(rb)) = (circle_radius(a), circle_radius(b)) else {
        return;
    };
    let contact = circle_circle(a.pos, ra, b.pos, rb);
    if !contact.hit {
        return;
    }

    let (ia, ib) = (a.inv_mass(), b.inv_mass());
    let total = ia + ib;
    if total <= 0.0 {
        return;
    }
    let n = contact.normal;
    a.pos += n * contact.penetration * (ia / total);
    b.pos -= n * contact.penetration * (ib / total);

    let approach = (a.vel - b.vel).dot(n);
    if approach < 0.0 {
        let restitution = a.material.restitution.max(b.material.restitution);
        let impulse = -(1.0 + restitution) * approach / total;
        a.vel += n * impulse * ia;
        b.vel -= n * impulse * ib;
    }
}

/// Push a comment out of a wall or peg and bounce it
fn resolve_static(body: &mut Body, piece: &StaticPiece) {
    if piece.kind == StaticKind::Sensor {
        return;
    }
    let Some(radius) = circle_radius(body) else {
        return;
    };
    let contact = match piece.shape {
        Shape::Circle { radius: r } => circle_circle(body.pos, radius, piece.pos, r),
        Shape::Rect { .. } => circle_rect(body.pos, radius, piece.pos, piece.shape.half_extents()),
    };
    if !contact.hit {
        return;
    }

    body.pos += contact.normal * contact.penetration;
    body.vel = bounce_velocity(
        body.vel,
        contact.normal,
        body.material.restitution,
        body.material.friction,
    );
    // Roll along the surface
    let tangent = Vec2::new(-contact.normal.y, contact.normal.x);
    body.angular_vel = body.vel.dot(tangent) / radius;
}

/// Accumulates wall-clock time into whole fixed steps
#[derive(Debug, Clone)]
pub struct FixedStepper {
    accumulator_ms: f32,
    dt_ms: f32,
    max_substeps: u32,
}

impl Default for FixedStepper {
    fn default() -> Self {
        Self::new(SIM_DT_MS, MAX_SUBSTEPS)
    }
}

/// What one `FixedStepper::advance` call did
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub steps: u32,
    pub events: Vec<WorldEvent>,
}

impl FixedStepper {
    pub fn new(dt_ms: f32, max_substeps: u32) -> Self {
        Self {
            accumulator_ms: 0.0,
            dt_ms,
            max_substeps,
        }
    }

    pub fn dt_ms(&self) -> f32 {
        self.dt_ms
    }

    /// Run as many fixed steps as `elapsed_ms` covers
    pub fn advance(&mut self, world: &mut World, elapsed_ms: f32) -> StepOutcome {
        // Clamp long stalls (debugger, suspended laptop)
        self.accumulator_ms += elapsed_ms.clamp(0.0, 250.0);

        let mut outcome = StepOutcome::default();
        while self.accumulator_ms >= self.dt_ms && outcome.steps < self.max_substeps {
            outcome.events.extend(world.step(self.dt_ms));
            self.accumulator_ms -= self.dt_ms;
            outcome.steps += 1;
        }

        if self.accumulator_ms >= self.dt_ms {
            log::debug!(
                "Dropping {:.1}ms of simulation backlog",
                self.accumulator_ms
            );
            self.accumulator_ms %= self.dt_ms;
        }
        outcome
    }
}
