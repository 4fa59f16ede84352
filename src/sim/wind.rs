//! Gusting crosswind
//!
//! A seeded RNG picks a new target speed every one to three seconds; the
//! actual speed eases toward it. Stronger gusts higher up.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::noise::{self, salt};
use crate::tuning::WindConfig;

/// Horizontal wind, positive blowing toward +x
#[derive(Debug, Clone)]
pub struct Wind {
    rng: Pcg32,
    speed: f32,
    target: f32,
    hold_ticks: u32,
}

impl Wind {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(noise::hash2(seed, salt::WIND, 0, 0)),
            speed: 0.0,
            target: 0.0,
            hold_ticks: 0,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Advance one tick at the given altitude
    pub fn update(&mut self, config: &WindConfig, altitude: f32) {
        if self.hold_ticks == 0 {
            let scale = 1.0 + altitude.max(0.0) / config.altitude_scale.max(1.0);
            let peak = (config.max_speed * scale).min(config.max_speed * 8.0);
            self.target = self.rng.random_range(-1.0f32..=1.0) * peak;
            let lo = config.min_hold_ticks.max(1);
            let hi = config.max_hold_ticks.max(lo);
            self.hold_ticks = self.rng.random_range(lo..=hi);
        }
        self.hold_ticks -= 1;
        self.speed += (self.target - self.speed) * config.ease.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_deterministic() {
        let config = WindConfig::default();
        let mut a = Wind::new(7);
        let mut b = Wind::new(7);
        for _ in 0..1000 {
            a.update(&config, 500.0);
            b.update(&config, 500.0);
        }
        assert_eq!(a.speed(), b.speed());
    }

    #[test]
    fn test_wind_bounded_by_altitude_peak() {
        let config = WindConfig::default();
        let mut wind = Wind::new(3);
        let peak = config.max_speed * (1.0 + 1000.0 / config.altitude_scale);
        for _ in 0..5000 {
            wind.update(&config, 1000.0);
            assert!(wind.target.abs() <= peak + 1e-3);
            assert!(wind.speed().abs() <= peak + 1e-3);
        }
    }

    #[test]
    fn test_wind_eases_instead_of_jumping() {
        let config = WindConfig::default();
        let mut wind = Wind::new(11);
        wind.update(&config, 0.0);
        assert!(wind.speed().abs() <= wind.target.abs() * config.ease + 1e-6);
    }

    #[test]
    fn test_calm_wind() {
        let config = WindConfig::calm();
        let mut wind = Wind::new(1);
        for _ in 0..500 {
            wind.update(&config, 10_000.0);
        }
        assert_eq!(wind.speed(), 0.0);
    }
}
