//! Procedural mountain: heightfield, shaft walls, tiles, grips, loot, camps
//!
//! The terrain is a pure function of the run seed. Nothing here caches or
//! mutates; `ChunkCache` decides what to keep around.
//!
//! Two views of the same ground exist:
//! - a continuous signed depth field (`solid_depth`), used by the rope hook
//!   for exact contact, and
//! - the tile grid (`tile_kind`), sampled at tile centers from that field,
//!   used for player collision and rendering.

use fastnoise_lite::FastNoiseLite;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::chunk::{
    CampSite, Chunk, ChunkCoord, Grip, GripId, Loot, LootId, LootKind, Surface, TileKind,
};
use super::noise::{self, CaveField, salt};
use super::sdf::{bisect_surface, gradient, sd_box};
use crate::consts::{CHUNK_H, CHUNK_W, TILE_SIZE};
use crate::tuning::{Layout, TerrainConfig};

/// How far (in world units) the slope search looks for a camp ledge
const CAMP_SEARCH_RANGE: f32 = 8192.0;

/// Deterministic terrain for one run
#[derive(Debug, Clone)]
pub struct Terrain {
    seed: u64,
    config: TerrainConfig,
    caves: CaveField,
    /// Sorted by altitude, strictly increasing
    camps: Vec<CampSite>,
}

impl Terrain {
    pub fn new(seed: u64, config: TerrainConfig) -> Self {
        let caves = CaveField::new(seed, config.cave_frequency);
        let mut terrain = Self {
            seed,
            config,
            caves,
            camps: Vec::new(),
        };
        terrain.camps = terrain.plan_camps();
        log::debug!(
            "Terrain seed {} ({}), {} camps planned",
            seed,
            terrain.config.layout.as_str(),
            terrain.camps.len()
        );
        terrain
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Continuous field
    // ------------------------------------------------------------------

    /// Height of the ground surface at horizontal position `x`
    ///
    /// Smooth trend away from the center line, plus fBm roughness whose
    /// amplitude grows with the baseline altitude.
    pub fn surface_elevation(&self, x: f32) -> f32 {
        let c = &self.config;
        let x = if x.is_finite() { x } else { c.center_x };
        let dx = x - c.center_x;
        let soft = c.trend_softening.max(1.0);
        let trend = c.trend * ((dx * dx + soft * soft).sqrt() - soft);
        let baseline = c.base_elevation + trend;
        if c.amplitude == 0.0 {
            return baseline;
        }
        let difficulty = (baseline.max(0.0) / c.difficulty_altitude.max(1.0)).min(c.max_difficulty);
        let rough = noise::fbm_1d(
            self.seed,
            salt::SURFACE,
            x / c.base_wavelength.max(1.0),
            c.octaves,
            c.lacunarity,
            c.persistence,
        );
        baseline + rough * c.amplitude * (1.0 + difficulty)
    }

    /// Left and right passage boundaries of the shaft at `altitude`
    pub fn walls_at(&self, altitude: f32) -> (f32, f32) {
        let c = &self.config;
        let alt = if altitude.is_finite() { altitude } else { 0.0 };
        let min_width = c.min_passage_width.max(TILE_SIZE);
        let width = (c.shaft_width - alt.max(0.0) * c.narrowing).max(min_width);
        let t = alt / c.wall_wavelength.max(1.0);
        let jitter_l = noise::fbm_1d(self.seed, salt::WALL_LEFT, t, 3, 2.0, 0.5) * c.wall_jitter;
        let jitter_r = noise::fbm_1d(self.seed, salt::WALL_RIGHT, t, 3, 2.0, 0.5) * c.wall_jitter;
        let mut left = c.center_x - width * 0.5 + jitter_l;
        let mut right = c.center_x + width * 0.5 + jitter_r;
        if right - left < min_width {
            let mid = (left + right) * 0.5;
            left = mid - min_width * 0.5;
            right = mid + min_width * 0.5;
        }
        (left, right)
    }

    /// Depth into the heightfield and shaft walls; positive inside rock
    fn ground_depth(&self, p: Vec2) -> f32 {
        let below_surface = self.surface_elevation(p.x) - p.y;
        match self.config.layout {
            Layout::Slope => below_surface,
            Layout::Shaft => {
                let (left, right) = self.walls_at(p.y);
                below_surface.max(left - p.x).max(p.x - right)
            }
        }
    }

    /// Signed depth of `p` inside solid terrain (negative in open air)
    ///
    /// Caves are not part of this field; they only exist deep below the
    /// surface where nothing thrown can reach.
    pub fn solid_depth(&self, p: Vec2) -> f32 {
        let mut depth = self.ground_depth(p);
        let clearance = self.config.camp_clearance_tiles;
        for camp in self.camps_near_altitude(p.y, (clearance + 2) as f32 * TILE_SIZE) {
            let (ledge_min, ledge_max, clear_min, clear_max) = self.camp_boxes(camp);
            depth = depth.min(sd_box(p, clear_min, clear_max));
            depth = depth.max(-sd_box(p, ledge_min, ledge_max));
        }
        depth
    }

    pub fn is_solid_point(&self, p: Vec2) -> bool {
        self.solid_depth(p) > 0.0
    }

    /// Unit normal pointing out of the terrain at (or near) `p`
    pub fn surface_normal(&self, p: Vec2) -> Vec2 {
        let n = -gradient(p, |q| self.solid_depth(q));
        if n == Vec2::ZERO { Vec2::Y } else { n }
    }

    /// Material just inside the surface at contact point `p`
    pub fn surface_kind_at(&self, p: Vec2) -> Surface {
        let inside = p - self.surface_normal(p) * (TILE_SIZE * 0.25);
        let kind = self.tile_kind(crate::world_to_tile(inside.x), crate::world_to_tile(inside.y));
        Surface::from_tile(kind)
    }

    // ------------------------------------------------------------------
    // Tiles
    // ------------------------------------------------------------------

    /// Material of tile `(tx, ty)`
    pub fn tile_kind(&self, tx: i32, ty: i32) -> TileKind {
        let sampler = self.config.caves.then(|| self.caves.sampler());
        self.classify(sampler.as_ref(), tx, ty)
    }

    pub fn is_solid(&self, tx: i32, ty: i32) -> bool {
        self.tile_kind(tx, ty).is_solid()
    }

    fn classify(&self, caves: Option<&FastNoiseLite>, tx: i32, ty: i32) -> TileKind {
        if let Some(kind) = self.camp_override(tx, ty) {
            return kind;
        }
        let center = tile_center(tx, ty);
        let depth = self.ground_depth(center);
        if depth <= 0.0 {
            return TileKind::Air;
        }
        if let Some(field) = caves {
            if depth > self.config.cave_depth
                && field.get_noise_2d(center.x, center.y) > self.config.cave_threshold
            {
                return TileKind::Air;
            }
        }
        self.material(tx, ty, center.y, depth)
    }

    fn material(&self, tx: i32, ty: i32, altitude: f32, depth: f32) -> TileKind {
        let c = &self.config;
        if depth > c.topsoil_depth {
            return TileKind::Rock;
        }
        if altitude > c.ice_line
            && noise::unit(noise::hash2(self.seed, salt::ICE, tx as i64, ty as i64)) < c.ice_chance
        {
            TileKind::Ice
        } else if altitude > c.snow_line {
            TileKind::Snow
        } else {
            TileKind::Dirt
        }
    }

    // ------------------------------------------------------------------
    // Chunks
    // ------------------------------------------------------------------

    /// Generate the full contents of chunk `(cx, cy)`
    ///
    /// Pure: the same seed and coordinates always produce the same chunk.
    pub fn generate_chunk(&self, cx: i32, cy: i32) -> Chunk {
        let coord = ChunkCoord::new(cx, cy);
        let (ox, oy) = coord.origin_tile();
        let sampler = self.config.caves.then(|| self.caves.sampler());

        // One tile of padding so exposure checks can see across the border
        let pw = CHUNK_W + 2;
        let ph = CHUNK_H + 2;
        let mut padded = Vec::with_capacity((pw * ph) as usize);
        for py in 0..ph {
            for px in 0..pw {
                padded.push(self.classify(sampler.as_ref(), ox + px - 1, oy + py - 1));
            }
        }
        let at = |lx: i32, ly: i32| padded[((ly + 1) * pw + (lx + 1)) as usize];

        let mut chunk = Chunk::empty(coord);
        for ly in 0..CHUNK_H {
            for lx in 0..CHUNK_W {
                let kind = at(lx, ly);
                chunk.set_local(lx, ly, kind);
                let (tx, ty) = (ox + lx, oy + ly);

                if kind.is_solid() {
                    let exposed = [
                        (at(lx, ly + 1), Vec2::Y),
                        (at(lx - 1, ly), Vec2::NEG_X),
                        (at(lx + 1, ly), Vec2::X),
                    ]
                    .into_iter()
                    .find(|(n, _)| !n.is_solid());
                    if let Some((_, face)) = exposed {
                        if let Some(grip) = self.roll_grip(tx, ty, kind, face) {
                            chunk.grips.push(grip);
                        }
                    }
                } else if at(lx, ly - 1).is_solid() {
                    if let Some(loot) = self.roll_loot(tx, ty) {
                        chunk.loot.push(loot);
                    }
                }
            }
        }

        let (low, high) = coord.altitude_span();
        chunk.camp = self
            .camps
            .iter()
            .find(|camp| {
                camp.altitude >= low
                    && camp.altitude < high
                    && ChunkCoord::of_point(Vec2::new(camp.x, camp.altitude)) == coord
            })
            .copied();
        chunk
    }

    fn roll_grip(&self, tx: i32, ty: i32, kind: TileKind, face: Vec2) -> Option<Grip> {
        let c = &self.config;
        let mut rng = noise::coord_rng(self.seed, salt::GRIP, tx as i64, ty as i64);
        if rng.random::<f32>() >= c.grip_chance {
            return None;
        }
        let single_use = rng.random::<f32>() < c.single_use_chance;
        let center = tile_center(tx, ty);
        let outside = center + face * TILE_SIZE;
        let depth = |p: Vec2| self.solid_depth(p);
        // Seat the grip on the true surface when the face is part of it
        let pos = if depth(center) > 0.0 && depth(outside) <= 0.0 {
            bisect_surface(outside, center, depth)
        } else {
            center + face * (TILE_SIZE * 0.5)
        };
        Some(Grip {
            id: GripId { tx, ty },
            pos,
            radius: c.grip_radius,
            surface: Surface::from_tile(kind),
            single_use,
            consumed: false,
        })
    }

    fn roll_loot(&self, tx: i32, ty: i32) -> Option<Loot> {
        let mut rng = noise::coord_rng(self.seed, salt::LOOT, tx as i64, ty as i64);
        if rng.random::<f32>() >= self.config.loot_chance {
            return None;
        }
        let pos = Vec2::new(tile_center(tx, ty).x, ty as f32 * TILE_SIZE + 4.0);
        Some(Loot {
            id: LootId { tx, ty },
            pos,
            kind: LootKind::pick(rng.random::<f32>(), pos.y),
            collected: false,
        })
    }

    // ------------------------------------------------------------------
    // Camps
    // ------------------------------------------------------------------

    fn plan_camps(&self) -> Vec<CampSite> {
        let c = &self.config;
        let jitter = c.camp_jitter.clamp(0.0, c.camp_interval * 0.45);
        let mut rng = Pcg32::seed_from_u64(noise::hash2(self.seed, salt::CAMP, 0, 0));
        (0..c.camp_count)
            .map(|index| {
                let altitude =
                    (index + 1) as f32 * c.camp_interval + rng.random_range(-jitter..=jitter);
                let on_left = rng.random::<bool>();
                CampSite {
                    index,
                    altitude,
                    x: self.camp_x(altitude, on_left),
                }
            })
            .collect()
    }

    /// Horizontal center of a camp ledge: cut into a wall (shaft) or into
    /// the slope where the surface reaches the camp altitude
    fn camp_x(&self, altitude: f32, on_left: bool) -> f32 {
        let c = &self.config;
        let half = c.camp_platform_tiles.max(1) as f32 * TILE_SIZE * 0.5;
        match c.layout {
            Layout::Shaft => {
                let (left, right) = self.walls_at(altitude);
                if on_left {
                    left + half - TILE_SIZE * 2.0
                } else {
                    right - half + TILE_SIZE * 2.0
                }
            }
            Layout::Slope => {
                let dir = if on_left { -1.0 } else { 1.0 };
                let below = |x: f32| self.surface_elevation(x) < altitude;
                let (mut lo, mut hi) = (c.center_x, c.center_x + dir * CAMP_SEARCH_RANGE);
                if !below(lo) || below(hi) {
                    return c.center_x;
                }
                for _ in 0..32 {
                    let mid = (lo + hi) * 0.5;
                    if below(mid) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                lo
            }
        }
    }

    /// Solid ledge box and the open clearance box above it
    fn camp_boxes(&self, camp: &CampSite) -> (Vec2, Vec2, Vec2, Vec2) {
        let (x0, x1) = self.camp_columns(camp);
        let row = camp.platform_row();
        let left = x0 as f32 * TILE_SIZE;
        let right = (x1 + 1) as f32 * TILE_SIZE;
        let ledge_min = Vec2::new(left, row as f32 * TILE_SIZE);
        let ledge_max = Vec2::new(right, (row + 1) as f32 * TILE_SIZE);
        let clear_max = Vec2::new(
            right,
            (row + 1 + self.config.camp_clearance_tiles) as f32 * TILE_SIZE,
        );
        (ledge_min, ledge_max, Vec2::new(left, ledge_max.y), clear_max)
    }

    fn camp_columns(&self, camp: &CampSite) -> (i32, i32) {
        let width = self.config.camp_platform_tiles.max(1);
        let x0 = crate::world_to_tile(camp.x) - width / 2;
        (x0, x0 + width - 1)
    }

    fn camp_override(&self, tx: i32, ty: i32) -> Option<TileKind> {
        let clearance = self.config.camp_clearance_tiles;
        let start = self
            .camps
            .partition_point(|camp| camp.platform_row() + clearance < ty);
        for camp in &self.camps[start..] {
            let row = camp.platform_row();
            if row > ty {
                break;
            }
            let (x0, x1) = self.camp_columns(camp);
            if tx < x0 || tx > x1 {
                continue;
            }
            return Some(if ty == row {
                TileKind::Platform
            } else {
                TileKind::Air
            });
        }
        None
    }

    fn camps_near_altitude(&self, altitude: f32, margin: f32) -> &[CampSite] {
        let start = self.camps.partition_point(|c| c.altitude < altitude - margin);
        let end = self.camps.partition_point(|c| c.altitude <= altitude + margin);
        &self.camps[start..end.max(start)]
    }

    /// All planned camps, lowest first
    pub fn camps(&self) -> &[CampSite] {
        &self.camps
    }

    /// Camp whose altitude is within `tolerance` of `altitude`
    pub fn camp_near(&self, altitude: f32, tolerance: f32) -> Option<&CampSite> {
        self.camps_near_altitude(altitude, tolerance)
            .iter()
            .min_by(|a, b| {
                (a.altitude - altitude)
                    .abs()
                    .partial_cmp(&(b.altitude - altitude).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// First camp strictly above `altitude`
    pub fn next_camp(&self, altitude: f32) -> Option<&CampSite> {
        let idx = self.camps.partition_point(|c| c.altitude <= altitude);
        self.camps.get(idx)
    }

    /// Where a fresh climb starts: on the surface at the center line
    pub fn spawn_point(&self) -> Vec2 {
        let x = self.config.center_x;
        Vec2::new(x, self.surface_elevation(x))
    }
}

/// World-space center of tile `(tx, ty)`
#[inline]
pub fn tile_center(tx: i32, ty: i32) -> Vec2 {
    Vec2::new(
        (tx as f32 + 0.5) * TILE_SIZE,
        (ty as f32 + 0.5) * TILE_SIZE,
    )
}
