//! Static geometry built once from the game area
//!
//! Two side walls, two staggered peg rows with a centered gap in the lower
//! row, and the lucky sensor band at the bottom of the canvas.

use glam::Vec2;

use super::body::Shape;
use crate::Rect;
use crate::consts::*;

/// What a static piece of the layout is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    Wall,
    Peg,
    Sensor,
}

/// One static body of the layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticPiece {
    pub kind: StaticKind,
    pub shape: Shape,
    pub pos: Vec2,
}

/// The complete static arrangement for one game area
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub walls: Vec<StaticPiece>,
    pub pegs: Vec<StaticPiece>,
    pub sensor: StaticPiece,
    /// Horizontal range comments spawn in
    pub spawn_band: (f32, f32),
}

impl Layout {
    pub fn build(area: &Rect) -> Self {
        let wall_height = area.bottom();
        let wall_shape = Shape::Rect {
            width: WALL_THICKNESS,
            height: wall_height,
        };
        let walls = vec![
            StaticPiece {
                kind: StaticKind::Wall,
                shape: wall_shape,
                pos: Vec2::new(area.x - WALL_THICKNESS / 2.0, wall_height / 2.0),
            },
            StaticPiece {
                kind: StaticKind::Wall,
                shape: wall_shape,
                pos: Vec2::new(area.right() + WALL_THICKNESS / 2.0, wall_height / 2.0),
            },
        ];

        let pegs = peg_positions(area)
            .into_iter()
            .map(|pos| StaticPiece {
                kind: StaticKind::Peg,
                shape: Shape::Circle { radius: PEG_RADIUS },
                pos,
            })
            .collect();

        let sensor = StaticPiece {
            kind: StaticKind::Sensor,
            shape: Shape::Rect {
                width: SENSOR_WIDTH,
                height: SENSOR_HEIGHT,
            },
            pos: Vec2::new(area.center().x, VIRTUAL_HEIGHT - SENSOR_HEIGHT / 2.0),
        };

        let left = area.x + SPAWN_INSET;
        let right = area.right() - SPAWN_INSET;
        let spawn_band = if left < right {
            (left, right)
        } else {
            let cx = area.center().x;
            (cx, cx)
        };

        Self {
            walls,
            pegs,
            sensor,
            spawn_band,
        }
    }

    /// All pieces in creation order: walls, pegs, sensor
    pub fn pieces(&self) -> impl Iterator<Item = &StaticPiece> {
        self.walls
            .iter()
            .chain(self.pegs.iter())
            .chain(std::iter::once(&self.sensor))
    }
}

/// Peg centers: the upper row spans the area width on `PEG_SPACING` columns,
/// the lower row is offset by half a column and skips pegs near the center.
pub fn peg_positions(area: &Rect) -> Vec<Vec2> {
    let columns = (area.width / PEG_SPACING).floor() as u32;
    let upper_y = area.y + area.height / 2.0;
    let lower_y = upper_y + PEG_ROW_GAP;
    let center_x = area.center().x;

    let upper = (0..columns).map(|i| Vec2::new(area.x + PEG_SPACING / 2.0 + i as f32 * PEG_SPACING, upper_y));
    let lower = (0..columns.saturating_sub(1))
        .map(|i| Vec2::new(area.x + PEG_SPACING + i as f32 * PEG_SPACING, lower_y))
        .filter(|p| (p.x - center_x).abs() >= PEG_GAP_HALF_WIDTH);

    upper.chain(lower).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_peg_rows() {
        let area = Rect::default();
        let pegs = peg_positions(&area);

        let upper: Vec<_> = pegs.iter().filter(|p| p.y == 540.0).collect();
        let lower: Vec<_> = pegs.iter().filter(|p| p.y == 620.0).collect();
        assert_eq!(upper.len(), 16);
        assert_eq!(lower.len(), 14);
        assert_eq!(upper.len() + lower.len(), pegs.len());

        assert_eq!(upper[0].x, 360.0);
        assert_eq!(upper[15].x, 1560.0);
        assert_eq!(lower[0].x, 400.0);
        assert_eq!(lower[13].x, 1520.0);

        // The center column of the lower row is the gap
        assert!(lower.iter().all(|p| p.x != 960.0));
        assert!(lower.iter().any(|p| p.x == 880.0));
        assert!(lower.iter().any(|p| p.x == 1040.0));
    }

    #[test]
    fn test_walls_and_sensor() {
        let layout = Layout::build(&Rect::default());
        assert_eq!(layout.walls.len(), 2);
        assert_eq!(layout.walls[0].pos, Vec2::new(270.0, 450.0));
        assert_eq!(layout.walls[1].pos, Vec2::new(1650.0, 450.0));

        assert_eq!(layout.sensor.kind, StaticKind::Sensor);
        assert_eq!(layout.sensor.pos, Vec2::new(960.0, 1060.0));
        assert_eq!(layout.spawn_band, (420.0, 1500.0));
        assert_eq!(layout.pieces().filter(|p| p.kind == StaticKind::Sensor).count(), 1);
    }

    #[test]
    fn test_narrow_area_spawns_at_center() {
        let layout = Layout::build(&Rect::new(0.0, 0.0, 150.0, 300.0));
        assert_eq!(layout.spawn_band, (75.0, 75.0));
    }
}
