//! Ascent - simulation core for a rope-swinging climb up an endless mountain
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, chunk streaming, rope, player)
//! - `persistence`: Save/load of the seed and climb progress
//! - `tuning`: Data-driven game balance
//! - `error`: Errors for the fallible edges (config, saves, storage)

pub mod error;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use error::{AscentError, Result};
pub use persistence::SaveRecord;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Edge length of one terrain tile in world units
    pub const TILE_SIZE: f32 = 16.0;
    /// Chunk width in tiles
    pub const CHUNK_W: i32 = 32;
    /// Chunk height in tiles
    pub const CHUNK_H: i32 = 32;
    /// Tiles per chunk
    pub const CHUNK_TILES: usize = (CHUNK_W * CHUNK_H) as usize;

    /// Floor used in place of zero lengths in constraint math
    pub const DIST_EPSILON: f32 = 1.0e-3;
}

/// Unit direction for an angle in radians (counter-clockwise from +x)
#[inline]
pub fn angle_to_dir(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// World coordinate to tile coordinate on one axis
#[inline]
pub fn world_to_tile(v: f32) -> i32 {
    (v / consts::TILE_SIZE).floor() as i32
}

/// Tile coordinate to chunk coordinate on one axis (`size` = chunk extent in tiles)
#[inline]
pub fn tile_to_chunk(t: i32, size: i32) -> i32 {
    t.div_euclid(size)
}
