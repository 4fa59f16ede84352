//! Chunk streaming cache
//!
//! Owns the terrain and every generated chunk. Chunks come into existence
//! through `ensure`, `prime` or `get` and leave only through eviction in
//! `ensure`/`prime`. Runtime changes (consumed grips, collected loot) live in
//! side sets so a chunk regenerated after eviction comes back the way the
//! player left it.

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use super::chunk::{Chunk, ChunkCoord, Grip, GripId, LootId, LootKind, chunk_row};
use super::collision::SolidGrid;
use super::terrain::Terrain;
use crate::tuning::StreamConfig;

/// Most chunk rows one streaming call will consider, lowest first
const MAX_STREAM_ROWS: i32 = 64;

/// What one streaming call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamReport {
    pub generated: usize,
    pub evicted: usize,
    /// Chunks still missing from the requested range (left for next call)
    pub pending: usize,
}

/// Terrain plus the chunks generated from it so far
#[derive(Debug, Clone)]
pub struct ChunkCache {
    terrain: Terrain,
    stream: StreamConfig,
    chunks: HashMap<ChunkCoord, Chunk>,
    consumed_grips: HashSet<GripId>,
    collected_loot: HashSet<LootId>,
    /// Chunks generated over the cache's lifetime, including regenerations
    generated_total: u64,
}

fn build_chunk(
    terrain: &Terrain,
    consumed: &HashSet<GripId>,
    collected: &HashSet<LootId>,
    coord: ChunkCoord,
) -> Chunk {
    let mut chunk = terrain.generate_chunk(coord.cx, coord.cy);
    for grip in &mut chunk.grips {
        grip.consumed = consumed.contains(&grip.id);
    }
    for loot in &mut chunk.loot {
        loot.collected = collected.contains(&loot.id);
    }
    log::trace!("Generated chunk ({}, {})", coord.cx, coord.cy);
    chunk
}

impl ChunkCache {
    pub fn new(terrain: Terrain, stream: StreamConfig) -> Self {
        Self {
            terrain,
            stream,
            chunks: HashMap::new(),
            consumed_grips: HashSet::new(),
            collected_loot: HashSet::new(),
            generated_total: 0,
        }
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn generated_total(&self) -> u64 {
        self.generated_total
    }

    /// Loaded chunks in no particular order (for renderers)
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Chunk coordinates covering `[low_y, high_y]` around `center_x`,
    /// lowest row first, nearest column first within a row
    fn wanted(&self, center_x: f32, low_y: f32, high_y: f32) -> Vec<ChunkCoord> {
        let (low_y, high_y) = if low_y <= high_y {
            (low_y, high_y)
        } else {
            (high_y, low_y)
        };
        let mid = ChunkCoord::of_point(Vec2::new(center_x, low_y)).cx;
        let half = self.stream.half_width_chunks.max(0);
        let row_lo = chunk_row(low_y);
        let mut row_hi = chunk_row(high_y);
        let row_cap = row_lo.saturating_add(MAX_STREAM_ROWS - 1);
        if row_hi > row_cap {
            log::warn!("Stream range rows {row_lo}..={row_hi} capped at {row_cap}");
            row_hi = row_cap;
        }

        let mut columns: Vec<i32> = (mid - half..=mid + half).collect();
        columns.sort_by_key(|cx| ((cx - mid).abs(), *cx));
        (row_lo..=row_hi)
            .flat_map(|cy| columns.iter().map(move |&cx| ChunkCoord::new(cx, cy)))
            .collect()
    }

    fn stream_in(&mut self, center_x: f32, low_y: f32, high_y: f32, budget: usize) -> StreamReport {
        let missing: Vec<ChunkCoord> = self
            .wanted(center_x, low_y, high_y)
            .into_iter()
            .filter(|c| !self.chunks.contains_key(c))
            .collect();

        let generated = missing.len().min(budget);
        for &coord in &missing[..generated] {
            let chunk =
                build_chunk(&self.terrain, &self.consumed_grips, &self.collected_loot, coord);
            self.chunks.insert(coord, chunk);
        }
        self.generated_total += generated as u64;

        let cutoff = chunk_row(low_y.min(high_y)) - self.stream.evict_margin.max(0);
        let before = self.chunks.len();
        self.chunks.retain(|coord, _| coord.cy >= cutoff);
        let evicted = before - self.chunks.len();

        let report = StreamReport {
            generated,
            evicted,
            pending: missing.len() - generated,
        };
        if report.generated > 0 || report.evicted > 0 {
            log::debug!(
                "Streamed rows {}..={}: +{} -{} ({} pending, {} loaded)",
                chunk_row(low_y.min(high_y)),
                chunk_row(low_y.max(high_y)),
                report.generated,
                report.evicted,
                report.pending,
                self.chunks.len()
            );
        }
        report
    }

    /// Stream the visible range `[low_y, high_y]` around the terrain center,
    /// generating at most the configured budget of chunks
    pub fn ensure(&mut self, low_y: f32, high_y: f32) -> StreamReport {
        let center_x = self.terrain.config().center_x;
        self.ensure_at(center_x, low_y, high_y)
    }

    /// `ensure`, centered on an arbitrary column position
    pub fn ensure_at(&mut self, center_x: f32, low_y: f32, high_y: f32) -> StreamReport {
        let budget = self.stream.max_chunks_per_ensure.max(1);
        self.stream_in(center_x, low_y, high_y, budget)
    }

    /// Generate the whole visible range at once (loading screens, resume)
    pub fn prime(&mut self, center_x: f32, low_y: f32, high_y: f32) -> StreamReport {
        self.stream_in(center_x, low_y, high_y, usize::MAX)
    }

    /// Chunk `(cx, cy)`, generated on demand
    pub fn get(&mut self, cx: i32, cy: i32) -> &Chunk {
        let coord = ChunkCoord::new(cx, cy);
        if !self.chunks.contains_key(&coord) {
            self.generated_total += 1;
        }
        let (terrain, consumed, collected) =
            (&self.terrain, &self.consumed_grips, &self.collected_loot);
        self.chunks
            .entry(coord)
            .or_insert_with(|| build_chunk(terrain, consumed, collected, coord))
    }

    pub fn is_solid(&mut self, tx: i32, ty: i32) -> bool {
        let coord = ChunkCoord::of_tile(tx, ty);
        self.get(coord.cx, coord.cy).tile(tx, ty).is_solid()
    }

    /// Chunk coordinates overlapping the square of half-size `radius` at `p`
    fn coords_around(p: Vec2, radius: f32) -> Vec<ChunkCoord> {
        let lo = ChunkCoord::of_point(p - Vec2::splat(radius));
        let hi = ChunkCoord::of_point(p + Vec2::splat(radius));
        (lo.cy..=hi.cy)
            .flat_map(|cy| (lo.cx..=hi.cx).map(move |cx| ChunkCoord::new(cx, cy)))
            .collect()
    }

    /// Closest unconsumed grip whose catch radius (plus `slack`) covers `p`
    pub fn grip_near(&mut self, p: Vec2, slack: f32) -> Option<Grip> {
        let reach = self.terrain.config().grip_radius + slack;
        if !reach.is_finite() || !p.is_finite() {
            return None;
        }
        let mut best: Option<(f32, Grip)> = None;
        for coord in Self::coords_around(p, reach) {
            for grip in &self.get(coord.cx, coord.cy).grips {
                if grip.consumed {
                    continue;
                }
                let d = grip.pos.distance(p);
                if d <= grip.radius + slack && best.as_ref().is_none_or(|(bd, _)| d < *bd) {
                    best = Some((d, grip.clone()));
                }
            }
        }
        best.map(|(_, grip)| grip)
    }

    /// Best unconsumed grip to grab from `p` within `range`
    ///
    /// Grips above `p` have their distance scaled by `above_weight`, so a
    /// slightly farther grip overhead beats one underfoot.
    pub fn grip_to_grab(&mut self, p: Vec2, range: f32, above_weight: f32) -> Option<Grip> {
        if !range.is_finite() || range <= 0.0 || !p.is_finite() {
            return None;
        }
        let mut best: Option<(f32, Grip)> = None;
        for coord in Self::coords_around(p, range) {
            for grip in &self.get(coord.cx, coord.cy).grips {
                if grip.consumed {
                    continue;
                }
                let d = grip.pos.distance(p);
                if d > range {
                    continue;
                }
                let score = if grip.pos.y > p.y { d * above_weight } else { d };
                if best.as_ref().is_none_or(|(bs, _)| score < *bs) {
                    best = Some((score, grip.clone()));
                }
            }
        }
        best.map(|(_, grip)| grip)
    }

    /// Mark a grip used up. Returns false if it already was.
    pub fn consume_grip(&mut self, id: GripId) -> bool {
        if !self.consumed_grips.insert(id) {
            return false;
        }
        if let Some(chunk) = self.chunks.get_mut(&ChunkCoord::of_tile(id.tx, id.ty)) {
            if let Some(grip) = chunk.grips.iter_mut().find(|g| g.id == id) {
                grip.consumed = true;
            }
        }
        true
    }

    pub fn is_grip_consumed(&self, id: GripId) -> bool {
        self.consumed_grips.contains(&id)
    }

    /// Uncollected loot within `radius` of `p`
    pub fn loot_near(&mut self, p: Vec2, radius: f32) -> Vec<(LootId, LootKind)> {
        if !radius.is_finite() || !p.is_finite() {
            return Vec::new();
        }
        let mut found = Vec::new();
        for coord in Self::coords_around(p, radius) {
            for loot in &self.get(coord.cx, coord.cy).loot {
                if !loot.collected && loot.pos.distance(p) <= radius {
                    found.push((loot.id, loot.kind));
                }
            }
        }
        found
    }

    /// Mark loot picked up. Returns false if it already was.
    pub fn collect_loot(&mut self, id: LootId) -> bool {
        if !self.collected_loot.insert(id) {
            return false;
        }
        if let Some(chunk) = self.chunks.get_mut(&ChunkCoord::of_tile(id.tx, id.ty)) {
            if let Some(loot) = chunk.loot.iter_mut().find(|l| l.id == id) {
                loot.collected = true;
            }
        }
        true
    }
}

impl SolidGrid for ChunkCache {
    fn solid(&mut self, tx: i32, ty: i32) -> bool {
        self.is_solid(tx, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CHUNK_H, TILE_SIZE};
    use crate::tuning::TerrainConfig;

    fn cache(seed: u64) -> ChunkCache {
        ChunkCache::new(
            Terrain::new(seed, TerrainConfig::default()),
            StreamConfig::default(),
        )
    }

    fn row_y(cy: i32) -> f32 {
        cy as f32 * CHUNK_H as f32 * TILE_SIZE
    }

    #[test]
    fn test_ensure_does_not_regenerate() {
        let mut cache = cache(1);
        cache.prime(0.0, 0.0, row_y(2));
        let total = cache.generated_total();
        let report = cache.ensure(0.0, row_y(2));
        assert_eq!(report.generated, 0);
        assert_eq!(report.pending, 0);
        assert_eq!(cache.generated_total(), total);
    }

    #[test]
    fn test_ensure_respects_budget() {
        let mut cache = cache(2);
        let budget = StreamConfig::default().max_chunks_per_ensure;
        let first = cache.ensure(0.0, row_y(3));
        assert_eq!(first.generated, budget);
        assert!(first.pending > 0);

        let mut rounds = 1;
        while cache.ensure(0.0, row_y(3)).pending > 0 {
            rounds += 1;
            assert!(rounds < 100);
        }
        let columns = (2 * StreamConfig::default().half_width_chunks + 1) as usize;
        assert_eq!(cache.len(), columns * 4);
    }

    #[test]
    fn test_unbounded_range_stays_within_budget() {
        let mut cache = cache(7);
        let budget = StreamConfig::default().max_chunks_per_ensure;
        let columns = (2 * StreamConfig::default().half_width_chunks + 1) as usize;

        let report = cache.ensure(f32::MIN, f32::MAX);
        assert_eq!(report.generated, budget);
        assert_eq!(report.pending, columns * MAX_STREAM_ROWS as usize - budget);
        assert_eq!(cache.len(), budget);

        let report = cache.ensure(f32::NEG_INFINITY, f32::INFINITY);
        assert!(report.generated <= budget);
    }

    #[test]
    fn test_get_far_away_generates_lazily() {
        let mut cache = cache(3);
        assert!(cache.is_empty());
        let chunk = cache.get(500, 9_000).clone();
        assert_eq!(chunk.coord, ChunkCoord::new(500, 9_000));
        assert_eq!(cache.len(), 1);
        assert_eq!(&chunk, cache.get(500, 9_000));
        assert_eq!(cache.generated_total(), 1);
    }

    #[test]
    fn test_eviction_then_requery_matches_fresh_generation() {
        let mut cache = cache(4);
        cache.prime(0.0, row_y(0), row_y(9));
        assert!(cache.contains(ChunkCoord::new(0, 3)));

        // Lowest visible row 7, margin 2: rows below 5 go away
        let report = cache.prime(0.0, row_y(7), row_y(9));
        assert!(report.evicted > 0);
        for cy in 0..5 {
            assert!(!cache.contains(ChunkCoord::new(0, cy)), "row {cy} kept");
        }
        assert!(cache.contains(ChunkCoord::new(0, 5)));

        let fresh = cache.terrain().generate_chunk(0, 3);
        assert_eq!(cache.get(0, 3).tiles, fresh.tiles);
        assert_eq!(cache.get(0, 3), &fresh);
    }

    #[test]
    fn test_consumed_grip_survives_eviction() {
        let mut config = TerrainConfig::default();
        config.grip_chance = 0.5;
        let mut cache = ChunkCache::new(Terrain::new(5, config), StreamConfig::default());

        let grip = (-2..=2)
            .find_map(|cx| cache.get(cx, 0).grips.first().cloned())
            .expect("some grip near the origin");
        assert!(cache.consume_grip(grip.id));
        assert!(!cache.consume_grip(grip.id));

        cache.prime(0.0, row_y(10), row_y(11));
        assert!(!cache.contains(ChunkCoord::of_tile(grip.id.tx, grip.id.ty)));

        let coord = ChunkCoord::of_tile(grip.id.tx, grip.id.ty);
        let again = cache.get(coord.cx, coord.cy);
        let regenerated = again.grips.iter().find(|g| g.id == grip.id).unwrap();
        assert!(regenerated.consumed);
        assert!(cache.grip_near(grip.pos, 0.0).is_none_or(|g| g.id != grip.id));
    }

    #[test]
    fn test_collect_loot_once() {
        let mut config = TerrainConfig::default();
        config.loot_chance = 0.5;
        let mut cache = ChunkCache::new(Terrain::new(6, config), StreamConfig::default());
        let loot = (-2..=2)
            .flat_map(|cx| (-1..=1).map(move |cy| (cx, cy)))
            .find_map(|(cx, cy)| cache.get(cx, cy).loot.first().cloned())
            .expect("some loot near the origin");

        let near = cache.loot_near(loot.pos, 1.0);
        assert!(near.iter().any(|(id, _)| *id == loot.id));
        assert!(cache.collect_loot(loot.id));
        assert!(!cache.collect_loot(loot.id));
        assert!(cache.loot_near(loot.pos, 1.0).iter().all(|(id, _)| *id != loot.id));
    }

    #[test]
    fn test_is_solid_matches_terrain() {
        let mut cache = cache(7);
        for ty in (-40..40).step_by(7) {
            for tx in (-40..40).step_by(5) {
                assert_eq!(cache.is_solid(tx, ty), cache.terrain().is_solid(tx, ty));
            }
        }
    }
}
