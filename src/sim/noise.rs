//! Seeded hashing and smooth noise primitives
//!
//! Everything here is a pure function of its arguments. Coordinates are
//! hashed rather than fed through a stateful RNG so any sample can be taken
//! in any order and still come out the same.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Salts that keep the independent noise streams apart
pub mod salt {
    pub const SURFACE: u64 = 0x5355_5246;
    pub const WALL_LEFT: u64 = 0x574c_4654;
    pub const WALL_RIGHT: u64 = 0x5752_4754;
    pub const ICE: u64 = 0x0049_4345;
    pub const GRIP: u64 = 0x4752_4950;
    pub const LOOT: u64 = 0x4c4f_4f54;
    pub const CAMP: u64 = 0x4341_4d50;
    pub const CAVE: u64 = 0x4341_5645;
    pub const WIND: u64 = 0x5749_4e44;
}

/// Splitmix64-style hash of `(seed, salt, x, y)`
#[inline]
pub fn hash2(seed: u64, salt: u64, x: i64, y: i64) -> u64 {
    let mut h = seed ^ salt.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    h = h.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(x as u64);
    h = h.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(y as u64);
    h ^= h >> 30;
    h = h.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^= h >> 31;
    h
}

/// Map a hash to `[0, 1)`
#[inline]
pub fn unit(h: u64) -> f32 {
    (h >> 40) as f32 / (1u64 << 24) as f32
}

/// Map a hash to `[-1, 1)`
#[inline]
pub fn signed(h: u64) -> f32 {
    unit(h) * 2.0 - 1.0
}

/// Deterministic RNG for decisions at one world coordinate
pub fn coord_rng(seed: u64, salt: u64, x: i64, y: i64) -> Pcg32 {
    Pcg32::seed_from_u64(hash2(seed, salt, x, y))
}

/// Catmull-Rom interpolation between `p1` and `p2`
#[inline]
pub fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Smooth 1D value noise in roughly `[-1, 1]`
///
/// Control points sit at integer `x` with hashed values; samples between
/// them are Catmull-Rom interpolated, so the result is C1 continuous and
/// has no steps at lattice boundaries.
pub fn value_noise_1d(seed: u64, salt: u64, x: f32) -> f32 {
    let x = if x.is_finite() { x } else { 0.0 };
    let base = x.floor();
    let t = x - base;
    let i = base as i64;
    let p = |k: i64| signed(hash2(seed, salt, i.wrapping_add(k), 0));
    catmull_rom(p(-1), p(0), p(1), p(2), t)
}

/// Fractal sum of `value_noise_1d` octaves, normalized to roughly `[-1, 1]`
pub fn fbm_1d(
    seed: u64,
    salt: u64,
    x: f32,
    octaves: u32,
    lacunarity: f32,
    persistence: f32,
) -> f32 {
    let mut sum = 0.0;
    let mut norm = 0.0;
    let mut amp = 1.0;
    let mut freq = 1.0;
    for octave in 0..octaves.max(1) {
        sum += value_noise_1d(seed, salt.wrapping_add(octave as u64), x * freq) * amp;
        norm += amp;
        amp *= persistence;
        freq *= lacunarity;
    }
    if norm > 0.0 { sum / norm } else { 0.0 }
}

/// 2D coherent noise used to carve caves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaveField {
    seed: i32,
    frequency: f32,
}

impl CaveField {
    pub fn new(seed: u64, frequency: f32) -> Self {
        let mixed = hash2(seed, salt::CAVE, 0, 0);
        Self {
            seed: (mixed >> 33) as i32,
            frequency,
        }
    }

    /// Build a sampler; construct once per batch of queries
    pub fn sampler(&self) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(self.seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(self.frequency));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(3));
        noise.set_fractal_gain(Some(0.5));
        noise.set_fractal_lacunarity(Some(2.0));
        noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash2(42, 1, 10, -20), hash2(42, 1, 10, -20));
    }

    #[test]
    fn test_hash_varies_with_input() {
        let base = hash2(42, 1, 10, 20);
        assert_ne!(base, hash2(43, 1, 10, 20));
        assert_ne!(base, hash2(42, 2, 10, 20));
        assert_ne!(base, hash2(42, 1, 11, 20));
        assert_ne!(base, hash2(42, 1, 10, 21));
    }

    #[test]
    fn test_unit_range() {
        for i in 0..1000 {
            let u = unit(hash2(7, 0, i, i * 3));
            assert!((0.0..1.0).contains(&u), "out of range: {u}");
        }
    }

    #[test]
    fn test_catmull_rom_hits_control_points() {
        assert!((catmull_rom(0.0, 1.0, 3.0, 2.0, 0.0) - 1.0).abs() < 1e-6);
        assert!((catmull_rom(0.0, 1.0, 3.0, 2.0, 1.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_value_noise_continuous_across_lattice() {
        for i in -50..50 {
            let x = i as f32;
            let left = value_noise_1d(9, 0, x - 1e-3);
            let right = value_noise_1d(9, 0, x + 1e-3);
            assert!((left - right).abs() < 0.02, "jump at {x}: {left} vs {right}");
        }
    }

    #[test]
    fn test_value_noise_nan_input() {
        assert!(value_noise_1d(1, 0, f32::NAN).is_finite());
        assert!(value_noise_1d(1, 0, f32::INFINITY).is_finite());
        assert!(value_noise_1d(1, 0, 1.0e30).is_finite());
    }

    #[test]
    fn test_fbm_bounded() {
        for i in 0..500 {
            let v = fbm_1d(3, 0, i as f32 * 0.37, 5, 2.0, 0.5);
            // Catmull-Rom can overshoot its control points a little
            assert!(v.abs() < 1.5, "fbm out of range: {v}");
        }
    }

    #[test]
    fn test_coord_rng_repeatable() {
        let a: u32 = coord_rng(5, salt::GRIP, 3, 4).random();
        let b: u32 = coord_rng(5, salt::GRIP, 3, 4).random();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cave_field_deterministic() {
        let field = CaveField::new(42, 0.02);
        let a = field.sampler().get_noise_2d(10.5, -3.25);
        let b = CaveField::new(42, 0.02).sampler().get_noise_2d(10.5, -3.25);
        assert_eq!(a, b);
        assert!((-1.5..=1.5).contains(&a));
    }
}
