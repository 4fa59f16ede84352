//! Chunk contents: tiles, grips, loot and camp flags
//!
//! A chunk is the unit of streaming. Its contents are a pure function of
//! `(seed, cx, cy)`; see `Terrain::generate_chunk`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{CHUNK_H, CHUNK_TILES, CHUNK_W, TILE_SIZE};
use crate::tile_to_chunk;

/// Chunk-grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// Chunk containing tile `(tx, ty)`
    pub fn of_tile(tx: i32, ty: i32) -> Self {
        Self::new(tile_to_chunk(tx, CHUNK_W), tile_to_chunk(ty, CHUNK_H))
    }

    /// Chunk containing a world position
    pub fn of_point(p: Vec2) -> Self {
        Self::of_tile(crate::world_to_tile(p.x), crate::world_to_tile(p.y))
    }

    /// Lowest-left tile of this chunk
    pub fn origin_tile(&self) -> (i32, i32) {
        (self.cx * CHUNK_W, self.cy * CHUNK_H)
    }

    /// World-space vertical span `[low, high)`
    pub fn altitude_span(&self) -> (f32, f32) {
        let low = (self.cy * CHUNK_H) as f32 * TILE_SIZE;
        (low, low + CHUNK_H as f32 * TILE_SIZE)
    }
}

/// Chunk row containing a world altitude
pub fn chunk_row(altitude: f32) -> i32 {
    tile_to_chunk(crate::world_to_tile(altitude), CHUNK_H)
}

/// Terrain material of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Air,
    Dirt,
    Rock,
    Snow,
    Ice,
    /// Flattened camp ledge
    Platform,
}

impl TileKind {
    pub fn is_solid(self) -> bool {
        self != TileKind::Air
    }
}

/// Surface a grip or anchor is set in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Rock,
    /// Slippery: weaker swing, faster grip loss
    Ice,
}

impl Surface {
    pub fn from_tile(kind: TileKind) -> Self {
        match kind {
            TileKind::Ice | TileKind::Snow => Surface::Ice,
            _ => Surface::Rock,
        }
    }
}

/// Grip identity: the world tile it is set in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GripId {
    pub tx: i32,
    pub ty: i32,
}

/// A point anchor the rope hook can catch on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grip {
    pub id: GripId,
    pub pos: Vec2,
    pub radius: f32,
    pub surface: Surface,
    /// Crumbles after one catch
    pub single_use: bool,
    pub consumed: bool,
}

/// Loot identity: the world tile it rests in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootId {
    pub tx: i32,
    pub ty: i32,
}

/// Collectible found on the mountain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LootKind {
    CrystalShard,
    IronOre,
    RopeScrap,
    OldButton,
    WolfFur,
    DarkStone,
    BirdFeather,
    Fossil,
    SnowFlower,
    AncientCoin,
}

impl LootKind {
    /// Pick a kind from a uniform roll; crystal shards get likelier higher up
    pub fn pick(roll: f32, altitude: f32) -> Self {
        let alt_factor = (altitude / 4000.0).clamp(0.0, 1.0);
        match roll {
            r if r < 0.25 + alt_factor * 0.1 => LootKind::CrystalShard,
            r if r < 0.45 => LootKind::IronOre,
            r if r < 0.60 => LootKind::RopeScrap,
            r if r < 0.70 => LootKind::OldButton,
            r if r < 0.78 => LootKind::WolfFur,
            r if r < 0.85 => LootKind::DarkStone,
            r if r < 0.90 => LootKind::BirdFeather,
            r if r < 0.94 => LootKind::Fossil,
            r if r < 0.97 => LootKind::SnowFlower,
            _ => LootKind::AncientCoin,
        }
    }
}

/// A loot pickup resting on terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loot {
    pub id: LootId,
    pub pos: Vec2,
    pub kind: LootKind,
    pub collected: bool,
}

/// Rest stop carved into the mountain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CampSite {
    pub index: u32,
    pub altitude: f32,
    /// Horizontal center of the platform
    pub x: f32,
}

impl CampSite {
    /// Tile row the platform surface is laid in
    pub fn platform_row(&self) -> i32 {
        crate::world_to_tile(self.altitude) - 1
    }
}

/// One generated block of terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub coord: ChunkCoord,
    /// Row-major, row 0 is the lowest row
    pub tiles: Vec<TileKind>,
    pub grips: Vec<Grip>,
    pub loot: Vec<Loot>,
    pub camp: Option<CampSite>,
}

impl Chunk {
    pub fn empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            tiles: vec![TileKind::Air; CHUNK_TILES],
            grips: Vec::new(),
            loot: Vec::new(),
            camp: None,
        }
    }

    pub fn contains_camp(&self) -> bool {
        self.camp.is_some()
    }

    #[inline]
    fn index(lx: i32, ly: i32) -> usize {
        (ly * CHUNK_W + lx) as usize
    }

    /// Tile at local coordinates (must be inside the chunk)
    pub fn local(&self, lx: i32, ly: i32) -> TileKind {
        self.tiles[Self::index(lx, ly)]
    }

    pub(crate) fn set_local(&mut self, lx: i32, ly: i32, kind: TileKind) {
        let idx = Self::index(lx, ly);
        self.tiles[idx] = kind;
    }

    /// Tile at world tile coordinates (must belong to this chunk)
    pub fn tile(&self, tx: i32, ty: i32) -> TileKind {
        let (ox, oy) = self.coord.origin_tile();
        self.local(tx - ox, ty - oy)
    }

    pub fn solid_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_solid()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coord_of_tile() {
        assert_eq!(ChunkCoord::of_tile(0, 0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::of_tile(-1, 31), ChunkCoord::new(-1, 0));
        assert_eq!(ChunkCoord::of_tile(64, -33), ChunkCoord::new(2, -2));
    }

    #[test]
    fn test_altitude_span() {
        let (low, high) = ChunkCoord::new(0, 1).altitude_span();
        assert_eq!(low, CHUNK_H as f32 * TILE_SIZE);
        assert_eq!(high, 2.0 * CHUNK_H as f32 * TILE_SIZE);
        assert_eq!(chunk_row(low), 1);
        assert_eq!(chunk_row(low - 0.5), 0);
    }

    #[test]
    fn test_tile_addressing() {
        let mut chunk = Chunk::empty(ChunkCoord::new(-1, 2));
        let (ox, oy) = chunk.coord.origin_tile();
        chunk.set_local(3, 5, TileKind::Rock);
        assert_eq!(chunk.tile(ox + 3, oy + 5), TileKind::Rock);
        assert_eq!(chunk.solid_count(), 1);
    }

    #[test]
    fn test_loot_pick_shifts_with_altitude() {
        assert_eq!(LootKind::pick(0.30, 0.0), LootKind::IronOre);
        assert_eq!(LootKind::pick(0.30, 4000.0), LootKind::CrystalShard);
        assert_eq!(LootKind::pick(0.99, 0.0), LootKind::AncientCoin);
    }

    #[test]
    fn test_surface_from_tile() {
        assert_eq!(Surface::from_tile(TileKind::Ice), Surface::Ice);
        assert_eq!(Surface::from_tile(TileKind::Rock), Surface::Rock);
        assert_eq!(Surface::from_tile(TileKind::Platform), Surface::Rock);
    }
}
