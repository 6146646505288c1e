//! Simulation space to viewport mapping
//!
//! Simulation space is the broadcast canvas itself, so the broadcast view is
//! the identity. The spectator view stretches the game capture area over the
//! spectator window using the smaller of the two axis scales (aspect ratio
//! preserved) and centers the result. Nothing is cached: the window can be
//! resized between any two calls.

use serde::{Deserialize, Serialize};

use crate::Rect;
use crate::sim::{BodyView, Snapshot};

/// Pixel size of a viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A transformed position plus the uniform scale applied to extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

/// Which render target a projection is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewportKind {
    Broadcast,
    Spectator,
}

/// Named render target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Viewport {
    /// Full broadcast canvas (OBS capture window)
    Broadcast,
    /// Streamer's own full-screen view of the game capture area
    Spectator { capture: Rect, size: ViewportSize },
}

impl Viewport {
    pub fn kind(&self) -> ViewportKind {
        match self {
            Viewport::Broadcast => ViewportKind::Broadcast,
            Viewport::Spectator { .. } => ViewportKind::Spectator,
        }
    }

    pub fn project(&self, x: f32, y: f32) -> Projected {
        match *self {
            Viewport::Broadcast => to_broadcast_view(x, y),
            Viewport::Spectator { capture, size } => to_spectator_view(x, y, &capture, size),
        }
    }
}

/// Identity: simulation space is the broadcast canvas
#[inline]
pub fn to_broadcast_view(x: f32, y: f32) -> Projected {
    Projected { x, y, scale: 1.0 }
}

/// Fit-smaller-axis scale of the capture area into the viewport
pub fn spectator_scale(capture: &Rect, viewport: ViewportSize) -> f32 {
    let scale_x = viewport.width / capture.width;
    let scale_y = viewport.height / capture.height;
    let scale = scale_x.min(scale_y);
    if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
}

/// Map a simulation position into the spectator viewport
pub fn to_spectator_view(x: f32, y: f32, capture: &Rect, viewport: ViewportSize) -> Projected {
    let scale = spectator_scale(capture, viewport);
    let offset_x = (viewport.width - capture.width * scale) / 2.0;
    let offset_y = (viewport.height - capture.height * scale) / 2.0;
    Projected {
        x: (x - capture.x) * scale + offset_x,
        y: (y - capture.y) * scale + offset_y,
        scale,
    }
}

/// Transform every body of a snapshot into a viewport
pub fn project(snapshot: &Snapshot, viewport: &Viewport) -> Vec<BodyView> {
    snapshot
        .bodies
        .iter()
        .map(|body| {
            let p = viewport.project(body.x, body.y);
            BodyView {
                x: p.x,
                y: p.y,
                shape: body.shape.scaled(p.scale),
                ..body.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CAPTURE: Rect = Rect::new(320.0, 180.0, 1280.0, 720.0);

    #[test]
    fn test_broadcast_is_identity() {
        assert_eq!(
            to_broadcast_view(123.5, -40.0),
            Projected {
                x: 123.5,
                y: -40.0,
                scale: 1.0
            }
        );
    }

    #[test]
    fn test_spectator_same_aspect_fills_viewport() {
        // 4K spectator: 3840 / 1280 = 2160 / 720 = 3
        let size = ViewportSize::new(3840.0, 2160.0);
        let origin = to_spectator_view(320.0, 180.0, &CAPTURE, size);
        assert_eq!(origin, Projected { x: 0.0, y: 0.0, scale: 3.0 });

        let corner = to_spectator_view(1600.0, 900.0, &CAPTURE, size);
        assert_eq!(corner.x, 3840.0);
        assert_eq!(corner.y, 2160.0);
    }

    #[test]
    fn test_spectator_wide_viewport_is_pillarboxed() {
        // Width allows 2.0, height only 1.0: fit the smaller axis
        let size = ViewportSize::new(2560.0, 720.0);
        let p = to_spectator_view(320.0, 180.0, &CAPTURE, size);
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.x, 640.0);
        assert_eq!(p.y, 0.0);

        let center = to_spectator_view(960.0, 540.0, &CAPTURE, size);
        assert_eq!(center.x, 1280.0);
        assert_eq!(center.y, 360.0);
    }

    #[test]
    fn test_spectator_tall_viewport_is_letterboxed() {
        let size = ViewportSize::new(1280.0, 1440.0);
        let p = to_spectator_view(320.0, 180.0, &CAPTURE, size);
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 360.0);
    }

    #[test]
    fn test_resize_recomputes() {
        let a = to_spectator_view(960.0, 540.0, &CAPTURE, ViewportSize::new(1920.0, 1080.0));
        let b = to_spectator_view(960.0, 540.0, &CAPTURE, ViewportSize::new(3840.0, 2160.0));
        assert_eq!(a.scale, 1.5);
        assert_eq!(b.scale, 3.0);
        assert_eq!((b.x, b.y), (1920.0, 1080.0));
    }

    #[test]
    fn test_degenerate_viewport_falls_back_to_unit_scale() {
        let p = to_spectator_view(320.0, 180.0, &CAPTURE, ViewportSize::new(0.0, 0.0));
        assert_eq!(p.scale, 1.0);
    }

    #[test]
    fn test_project_scales_shapes() {
        use crate::sim::{BodyId, BodyTag, Shape};
        let snapshot = Snapshot {
            step: 1,
            time_ms: 16.0,
            bodies: vec![BodyView {
                id: BodyId(1),
                kind: BodyTag::Peg,
                x: 960.0,
                y: 540.0,
                angle: 0.0,
                shape: Shape::Circle { radius: 8.0 },
                payload: None,
            }],
        };
        let viewport = Viewport::Spectator {
            capture: CAPTURE,
            size: ViewportSize::new(3840.0, 2160.0),
        };
        let projected = project(&snapshot, &viewport);
        assert_eq!(projected[0].x, 1920.0);
        assert_eq!(projected[0].shape, Shape::Circle { radius: 24.0 });

        let broadcast = project(&snapshot, &Viewport::Broadcast);
        assert_eq!(broadcast, snapshot.bodies);
    }

    proptest! {
        #[test]
        fn prop_spectator_scale_is_smaller_axis(w in 100.0f32..8000.0, h in 100.0f32..8000.0) {
            let size = ViewportSize::new(w, h);
            let p = to_spectator_view(320.0, 180.0, &CAPTURE, size);
            let expected = (w / 1280.0).min(h / 720.0);
            prop_assert!((p.scale - expected).abs() <= expected * 1e-6);
            // Capture area stays inside the viewport and is centered
            prop_assert!(p.x >= -0.01 && p.y >= -0.01);
            let far = to_spectator_view(1600.0, 900.0, &CAPTURE, size);
            prop_assert!(far.x <= w + 0.01 && far.y <= h + 0.01);
            prop_assert!((p.x - (w - far.x)).abs() < 0.05);
        }
    }
}
