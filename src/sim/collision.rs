//! Collision detection and response for circles against circles and boxes
//!
//! Comment bodies are circles; pegs are circles; walls and the sensor are
//! axis-aligned boxes. Every test returns the normal pointing from the
//! obstacle toward the moving circle, so pushing along it separates them.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the obstacle surface
    pub point: Vec2,
    /// Surface normal, pointing toward the circle center
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Circle `a` against circle `b`; the normal points from `b` to `a`
pub fn circle_circle(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = a_pos - b_pos;
    let reach = a_radius + b_radius;
    let dist_sq = delta.length_squared();
    if dist_sq >= reach * reach {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    // Coincident centers: separate straight up
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::NEG_Y };
    CollisionResult {
        hit: true,
        point: b_pos + normal * b_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Circle against an axis-aligned box given by center and half extents
pub fn circle_rect(pos: Vec2, radius: f32, rect_center: Vec2, half: Vec2) -> CollisionResult {
    let local = pos - rect_center;
    let closest = local.clamp(-half, half);
    let inside = closest == local;

    if !inside {
        let delta = local - closest;
        let dist_sq = delta.length_squared();
        if dist_sq >= radius * radius {
            return CollisionResult::miss();
        }
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            point: rect_center + closest,
            normal: delta / dist,
            penetration: radius - dist,
        };
    }

    // Center inside the box: push out through the nearest face
    let to_x = half.x - local.x.abs();
    let to_y = half.y - local.y.abs();
    let (normal, depth) = if to_x < to_y {
        (Vec2::new(local.x.signum(), 0.0), to_x)
    } else {
        (Vec2::new(0.0, local.y.signum()), to_y)
    };
    let normal = if normal.x == 0.0 && normal.y == 0.0 {
        Vec2::NEG_Y
    } else {
        normal
    };
    CollisionResult {
        hit: true,
        point: pos - normal * depth,
        normal,
        penetration: depth + radius,
    }
}

/// Overlap test only, for sensors
#[inline]
pub fn circle_overlaps_rect(pos: Vec2, radius: f32, rect_center: Vec2, half: Vec2) -> bool {
    let local = pos - rect_center;
    let closest = local.clamp(-half, half);
    (local - closest).length_squared() < radius * radius || closest == local
}

/// Bounce velocity off a static surface with restitution and friction
///
/// Only the approaching normal component is reflected; the tangential part is
/// damped by `friction`.
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32, friction: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    let normal_part = normal * vn;
    let tangent_part = velocity - normal_part;
    tangent_part * (1.0 - friction).clamp(0.0, 1.0) - normal_part * restitution
}
