//! Signed depth field helpers
//!
//! Terrain is described by a depth function: positive inside solid ground,
//! negative in open air, zero on the surface. These helpers turn that field
//! into normals and exact contact points.

use glam::Vec2;

/// Bisection steps when refining a contact; halves the bracket each time
const BISECT_ITERATIONS: usize = 24;
/// Stride when walking out of the ground
const ESCAPE_STEP: f32 = 1.0;

/// Signed distance to an axis-aligned box (negative inside)
#[inline]
pub fn sd_box(p: Vec2, min: Vec2, max: Vec2) -> f32 {
    let center = (min + max) * 0.5;
    let half = (max - min) * 0.5;
    let d = (p - center).abs() - half;
    d.max(Vec2::ZERO).length() + d.x.max(d.y).min(0.0)
}

/// Gradient of a scalar field using central differences
pub fn gradient<F>(p: Vec2, field: F) -> Vec2
where
    F: Fn(Vec2) -> f32,
{
    let eps = 0.5;
    let dx = field(p + Vec2::new(eps, 0.0)) - field(p - Vec2::new(eps, 0.0));
    let dy = field(p + Vec2::new(0.0, eps)) - field(p - Vec2::new(0.0, eps));
    Vec2::new(dx, dy).normalize_or_zero()
}

/// Where a moving point first touched solid ground
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContact {
    /// On the surface, on the open side
    pub point: Vec2,
    /// Unit normal pointing out of the ground
    pub normal: Vec2,
}

/// Refine a bracket with `outside` in air and `inside` in solid ground.
///
/// Returns the air-side end of the final bracket.
pub fn bisect_surface<F>(mut outside: Vec2, mut inside: Vec2, depth: F) -> Vec2
where
    F: Fn(Vec2) -> f32,
{
    for _ in 0..BISECT_ITERATIONS {
        let mid = (outside + inside) * 0.5;
        if depth(mid) > 0.0 {
            inside = mid;
        } else {
            outside = mid;
        }
    }
    outside
}

/// Surface point reached by walking out of the ground along `normal`
///
/// `None` when `inside` is still buried after `max_dist`.
pub fn escape_surface<F>(inside: Vec2, normal: Vec2, max_dist: f32, depth: F) -> Option<Vec2>
where
    F: Fn(Vec2) -> f32,
{
    if depth(inside) <= 0.0 {
        return Some(inside);
    }
    let steps = ((max_dist / ESCAPE_STEP).ceil() as usize).clamp(1, 256);
    let mut prev = inside;
    for i in 1..=steps {
        let p = inside + normal * (i as f32 * ESCAPE_STEP);
        if depth(p) <= 0.0 {
            return Some(bisect_surface(p, prev, &depth));
        }
        prev = p;
    }
    None
}

/// March from `start` to `end` and return the first surface crossing
///
/// Samples are at most `max_step` apart, so features thinner than that can
/// be skipped. A `start` already inside the ground yields no contact.
pub fn find_contact<F>(start: Vec2, end: Vec2, max_step: f32, depth: F) -> Option<SurfaceContact>
where
    F: Fn(Vec2) -> f32,
{
    if depth(start) > 0.0 {
        return None;
    }
    let total = start.distance(end);
    if !total.is_finite() {
        return None;
    }
    let steps = ((total / max_step.max(1e-3)).ceil() as usize).clamp(1, 1024);

    let mut prev = start;
    for i in 1..=steps {
        let p = start.lerp(end, i as f32 / steps as f32);
        if depth(p) > 0.0 {
            let point = bisect_surface(prev, p, &depth);
            let mut normal = -gradient(point, &depth);
            if normal == Vec2::ZERO {
                normal = (prev - p).normalize_or_zero();
            }
            return Some(SurfaceContact { point, normal });
        }
        prev = p;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground(p: Vec2) -> f32 {
        -150.0 - p.y
    }

    #[test]
    fn test_sd_box() {
        let (min, max) = (Vec2::new(0.0, 0.0), Vec2::new(10.0, 4.0));
        assert!((sd_box(Vec2::new(5.0, 2.0), min, max) + 2.0).abs() < 1e-5);
        assert!((sd_box(Vec2::new(13.0, 2.0), min, max) - 3.0).abs() < 1e-5);
        assert!((sd_box(Vec2::new(13.0, 8.0), min, max) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_gradient_of_flat_ground() {
        let g = gradient(Vec2::new(3.0, -150.0), ground);
        assert!((g - Vec2::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn test_find_contact_on_flat_ground() {
        let hit = find_contact(Vec2::new(10.0, -140.0), Vec2::new(12.0, -170.0), 8.0, ground)
            .expect("segment crosses the ground");
        assert!((hit.point.y + 150.0).abs() < 1e-3, "{:?}", hit.point);
        assert!(ground(hit.point) <= 0.0);
        assert!((hit.normal - Vec2::Y).length() < 1e-4);
    }

    #[test]
    fn test_find_contact_miss() {
        assert!(find_contact(Vec2::new(0.0, 0.0), Vec2::new(50.0, -10.0), 8.0, ground).is_none());
    }

    #[test]
    fn test_start_inside_is_no_contact() {
        let hit = find_contact(Vec2::new(0.0, -200.0), Vec2::new(0.0, -100.0), 8.0, ground);
        assert!(hit.is_none());
    }

    #[test]
    fn test_escape_surface_from_inside() {
        let surface = escape_surface(Vec2::new(4.0, -153.5), Vec2::Y, 16.0, ground).unwrap();
        assert!((surface.y + 150.0).abs() < 1e-3, "{surface:?}");
        assert_eq!(surface.x, 4.0);
        assert!(ground(surface) <= 0.0);
    }

    #[test]
    fn test_escape_surface_gives_up_when_buried() {
        assert!(escape_surface(Vec2::new(0.0, -400.0), Vec2::Y, 16.0, ground).is_none());
        let open = Vec2::new(0.0, -10.0);
        assert_eq!(escape_surface(open, Vec2::Y, 16.0, ground), Some(open));
    }

    #[test]
    fn test_thin_wall_found_with_small_steps() {
        let wall = |p: Vec2| 2.0 - (p.x - 50.0).abs();
        let hit =
            find_contact(Vec2::ZERO, Vec2::new(100.0, 0.0), 1.0, wall).expect("wall is hit");
        assert!((hit.point.x - 48.0).abs() < 1e-3);
        assert!(hit.normal.x < -0.99);
    }
}
