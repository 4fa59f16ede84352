//! Box versus tile-grid collision
//!
//! The player is an axis-aligned box anchored at its feet (bottom center).
//! Movement is resolved one axis at a time; per-step displacement must stay
//! under one tile so nothing can pass through a single solid tile.

use glam::Vec2;

use super::terrain::Terrain;
use crate::consts::TILE_SIZE;

/// Gap kept between a resolved box and the tile it was pushed out of
const SKIN: f32 = 0.01;

/// Anything that can answer "is this tile solid"
pub trait SolidGrid {
    fn solid(&mut self, tx: i32, ty: i32) -> bool;
}

impl SolidGrid for Terrain {
    fn solid(&mut self, tx: i32, ty: i32) -> bool {
        self.is_solid(tx, ty)
    }
}

/// Axis-aligned box in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box standing on `feet`
    pub fn from_feet(feet: Vec2, half_width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(feet.x - half_width, feet.y),
            max: Vec2::new(feet.x + half_width, feet.y + height),
        }
    }

    /// Inclusive tile range the box covers; touching edges don't count
    pub fn tile_range(&self) -> (i32, i32, i32, i32) {
        let x0 = (self.min.x / TILE_SIZE).floor() as i32;
        let y0 = (self.min.y / TILE_SIZE).floor() as i32;
        let x1 = (self.max.x / TILE_SIZE).ceil() as i32 - 1;
        let y1 = (self.max.y / TILE_SIZE).ceil() as i32 - 1;
        (x0, y0, x1.max(x0), y1.max(y0))
    }
}

/// Solid tiles overlapped by `aabb`, as their inclusive bounding tile range
fn solid_bounds(grid: &mut impl SolidGrid, aabb: Aabb) -> Option<(i32, i32, i32, i32)> {
    let (x0, y0, x1, y1) = aabb.tile_range();
    let mut bounds: Option<(i32, i32, i32, i32)> = None;
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            if grid.solid(tx, ty) {
                bounds = Some(match bounds {
                    None => (tx, ty, tx, ty),
                    Some((a, b, c, d)) => (a.min(tx), b.min(ty), c.max(tx), d.max(ty)),
                });
            }
        }
    }
    bounds
}

pub fn overlaps_solid(grid: &mut impl SolidGrid, aabb: Aabb) -> bool {
    solid_bounds(grid, aabb).is_some()
}

/// Outcome of moving along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMove {
    /// Resolved coordinate on the moved axis
    pub value: f32,
    pub blocked: bool,
}

/// Move the feet horizontally by `dx`, stopping against solid tiles
pub fn move_x(
    grid: &mut impl SolidGrid,
    feet: Vec2,
    half_width: f32,
    height: f32,
    dx: f32,
) -> AxisMove {
    let target = feet.x + dx;
    let aabb = Aabb::from_feet(Vec2::new(target, feet.y), half_width, height);
    match solid_bounds(grid, aabb) {
        None => AxisMove {
            value: target,
            blocked: false,
        },
        Some((min_tx, _, max_tx, _)) => {
            let value = if dx > 0.0 {
                min_tx as f32 * TILE_SIZE - half_width - SKIN
            } else {
                (max_tx + 1) as f32 * TILE_SIZE + half_width + SKIN
            };
            AxisMove {
                value,
                blocked: true,
            }
        }
    }
}

/// Move the feet vertically by `dy`, landing on floors and stopping at ceilings
pub fn move_y(
    grid: &mut impl SolidGrid,
    feet: Vec2,
    half_width: f32,
    height: f32,
    dy: f32,
) -> AxisMove {
    let target = feet.y + dy;
    let aabb = Aabb::from_feet(Vec2::new(feet.x, target), half_width, height);
    match solid_bounds(grid, aabb) {
        None => AxisMove {
            value: target,
            blocked: false,
        },
        Some((_, min_ty, _, max_ty)) => {
            let value = if dy < 0.0 {
                (max_ty + 1) as f32 * TILE_SIZE
            } else {
                min_ty as f32 * TILE_SIZE - height - SKIN
            };
            AxisMove {
                value,
                blocked: true,
            }
        }
    }
}

/// Whether there is solid ground directly under the feet
pub fn on_ground(grid: &mut impl SolidGrid, feet: Vec2, half_width: f32) -> bool {
    let sample = Aabb {
        min: Vec2::new(feet.x - half_width, feet.y - 0.5),
        max: Vec2::new(feet.x + half_width, feet.y),
    };
    overlaps_solid(grid, sample)
}

/// Nearest spot straight above `feet` where the box fits, searching up to
/// `max_tiles` rows
pub fn free_spot_above(
    grid: &mut impl SolidGrid,
    feet: Vec2,
    half_width: f32,
    height: f32,
    max_tiles: u32,
) -> Option<Vec2> {
    if !overlaps_solid(grid, Aabb::from_feet(feet, half_width, height)) {
        return Some(feet);
    }
    let base = (feet.y / TILE_SIZE).floor() as i32;
    (1..=max_tiles as i32)
        .map(|k| Vec2::new(feet.x, (base + k) as f32 * TILE_SIZE))
        .find(|&candidate| !overlaps_solid(grid, Aabb::from_feet(candidate, half_width, height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Hand-built grid for collision tests
    #[derive(Default)]
    struct Grid(HashSet<(i32, i32)>);

    impl Grid {
        fn floor(y: i32, from: i32, to: i32) -> Self {
            Self((from..=to).map(|x| (x, y)).collect())
        }
    }

    impl SolidGrid for Grid {
        fn solid(&mut self, tx: i32, ty: i32) -> bool {
            self.0.contains(&(tx, ty))
        }
    }

    #[test]
    fn test_tile_range_edges() {
        let aabb = Aabb {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(16.0, 32.0),
        };
        assert_eq!(aabb.tile_range(), (0, 0, 0, 1));
    }

    #[test]
    fn test_land_on_floor() {
        let mut grid = Grid::floor(-1, -5, 5);
        let step = move_y(&mut grid, Vec2::new(0.0, 3.0), 6.0, 24.0, -8.0);
        assert!(step.blocked);
        assert_eq!(step.value, 0.0);
        assert!(on_ground(&mut grid, Vec2::new(0.0, step.value), 6.0));
    }

    #[test]
    fn test_hit_ceiling() {
        let mut grid = Grid::floor(3, -5, 5);
        let step = move_y(&mut grid, Vec2::new(0.0, 20.0), 6.0, 24.0, 10.0);
        assert!(step.blocked);
        assert!(step.value + 24.0 <= 48.0);
    }

    #[test]
    fn test_wall_stops_horizontal() {
        let mut grid = Grid((0..4).map(|y| (2, y)).collect());
        let step = move_x(&mut grid, Vec2::new(20.0, 0.0), 6.0, 24.0, 10.0);
        assert!(step.blocked);
        assert!(step.value + 6.0 <= 32.0);
        assert!(!overlaps_solid(&mut grid, Aabb::from_feet(Vec2::new(step.value, 0.0), 6.0, 24.0)));

        let back = move_x(&mut grid, Vec2::new(60.0, 0.0), 6.0, 24.0, -14.0);
        assert!(back.blocked);
        assert!(back.value - 6.0 >= 48.0);
    }

    #[test]
    fn test_free_move() {
        let mut grid = Grid::default();
        let step = move_x(&mut grid, Vec2::ZERO, 6.0, 24.0, 5.0);
        assert!(!step.blocked);
        assert_eq!(step.value, 5.0);
    }

    #[test]
    fn test_free_spot_above() {
        let mut grid = Grid((-2..=2).flat_map(|x| (-3..=4).map(move |y| (x, y))).collect());
        let spot = free_spot_above(&mut grid, Vec2::new(0.0, 10.0), 6.0, 24.0, 64).unwrap();
        assert_eq!(spot.y, 80.0);
        assert!(free_spot_above(&mut grid, Vec2::new(0.0, 10.0), 6.0, 24.0, 2).is_none());
    }
}
