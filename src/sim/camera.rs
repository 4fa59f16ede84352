//! Follow camera
//!
//! Only here so the chunk cache knows which altitudes are on screen.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Camera {
    pub pos: Vec2,
}

impl Camera {
    pub fn new(pos: Vec2) -> Self {
        Self { pos }
    }

    /// Ease toward `target`
    pub fn follow(&mut self, target: Vec2, config: &CameraConfig) {
        if !target.is_finite() {
            return;
        }
        let rate = config.follow_rate.clamp(0.0, 1.0);
        self.pos += (target - self.pos) * rate;
    }

    /// Visible altitude range `(low, high)`
    pub fn visible_range(&self, config: &CameraConfig) -> (f32, f32) {
        let half = config.view_half_height.abs();
        (self.pos.y - half, self.pos.y + half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_converges() {
        let config = CameraConfig::default();
        let mut cam = Camera::default();
        let target = Vec2::new(40.0, 1000.0);
        for _ in 0..600 {
            cam.follow(target, &config);
        }
        assert!(cam.pos.distance(target) < 0.01);
    }

    #[test]
    fn test_follow_ignores_nan() {
        let config = CameraConfig::default();
        let mut cam = Camera::new(Vec2::new(1.0, 2.0));
        cam.follow(Vec2::new(f32::NAN, 0.0), &config);
        assert_eq!(cam.pos, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_visible_range() {
        let config = CameraConfig::default();
        let cam = Camera::new(Vec2::new(0.0, 500.0));
        assert_eq!(cam.visible_range(&config), (100.0, 900.0));
    }
}
