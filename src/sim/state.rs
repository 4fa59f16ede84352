//! Climb state and events
//!
//! Everything one run needs lives here; nothing is global. The mountain is
//! rebuilt from the seed, so a save only needs the seed and the altitude.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cache::ChunkCache;
use super::camera::Camera;
use super::chunk::{GripId, LootId, LootKind, Surface};
use super::collision;
use super::player::{Player, PlayerSnapshot};
use super::rope::{Rope, RopeSnapshot};
use super::terrain::Terrain;
use super::wind::Wind;
use crate::consts::TILE_SIZE;
use crate::persistence::SaveRecord;
use crate::tuning::Tuning;

/// Something that happened during the last tick, for UI, audio and the
/// economy layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClimbEvent {
    HookAnchored { point: Vec2, on_grip: bool },
    /// Rope snapped onto a grip by a grab; the economy layer charges the
    /// stamina cost (non-zero for ice)
    GripGrabbed {
        id: GripId,
        surface: Surface,
        stamina_cost: f32,
    },
    HookOutOfRange,
    RopeReleased,
    StaminaDrained,
    Landed { impact: f32 },
    FallDamage { amount: f32, health: f32 },
    Died,
    /// Player was found inside solid ground and moved up
    Unstuck { from: Vec2, to: Vec2 },
    LootCollected { id: LootId, kind: LootKind },
    ReachedCamp { index: u32, altitude: f32 },
}

/// One climb in progress
#[derive(Debug, Clone)]
pub struct ClimbState {
    /// Run seed; the whole mountain derives from it
    pub seed: u64,
    pub tuning: Tuning,
    pub cache: ChunkCache,
    pub rope: Rope,
    pub player: Player,
    pub wind: Wind,
    pub camera: Camera,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events from the most recent tick (and construction, until the first tick)
    pub events: Vec<ClimbEvent>,
}

impl ClimbState {
    /// Start a fresh climb at the foot of the mountain
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let mut state = Self::empty(seed, tuning);
        let spawn = state.cache.terrain().spawn_point();
        state.place_player(spawn, false);
        log::info!(
            "New climb, seed {} ({} layout), spawn at ({:.0}, {:.0})",
            seed,
            state.tuning.terrain.layout.as_str(),
            state.player.pos.x,
            state.player.pos.y
        );
        state
    }

    /// Start a fresh climb with a random seed
    pub fn new_random(tuning: Tuning) -> Self {
        let seed: u64 = rand::rng().random();
        Self::new(seed, tuning)
    }

    /// Rebuild a saved climb. The player restarts on the highest camp at or
    /// below the saved altitude, or at the foot of the mountain.
    pub fn resume(record: &SaveRecord, tuning: Tuning) -> Self {
        let mut state = Self::empty(record.seed, tuning);
        let tolerance = state.tuning.player.camp_tolerance;
        let camp = state
            .cache
            .terrain()
            .camps()
            .iter()
            .rev()
            .find(|camp| camp.altitude <= record.player_altitude + tolerance)
            .copied();

        match camp {
            Some(camp) => {
                let top = (camp.platform_row() + 1) as f32 * TILE_SIZE;
                state.place_player(Vec2::new(camp.x, top), true);
                state.player.last_camp = Some(camp.index);
            }
            None => {
                let spawn = state.cache.terrain().spawn_point();
                state.place_player(spawn, false);
            }
        }
        state.player.best_altitude = state.player.best_altitude.max(record.best_altitude);
        log::info!(
            "Resumed climb, seed {} at altitude {:.0} (saved {:.0})",
            record.seed,
            state.player.pos.y,
            record.player_altitude
        );
        state
    }

    fn empty(seed: u64, tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        let terrain = Terrain::new(seed, tuning.terrain.clone());
        Self {
            seed,
            cache: ChunkCache::new(terrain, tuning.stream.clone()),
            rope: Rope::new(tuning.rope.clone()),
            player: Player::new(Vec2::ZERO, &tuning.player),
            wind: Wind::new(seed),
            camera: Camera::default(),
            time_ticks: 0,
            events: Vec::new(),
            tuning,
        }
    }

    /// Put the player at `feet`, load the area around it and make sure the
    /// box is free. `report` turns a forced move into an `Unstuck` event.
    fn place_player(&mut self, feet: Vec2, report: bool) {
        let config = self.tuning.player.clone();
        let (low, high) = (
            feet.y - self.tuning.camera.view_half_height,
            feet.y + self.tuning.camera.view_half_height,
        );
        self.cache.prime(feet.x, low, high);

        self.player = Player::new(feet, &config);
        if report {
            self.events.extend(self.player.unstick(&config, &mut self.cache));
        } else if let Some(free) = collision::free_spot_above(
            &mut self.cache,
            feet,
            config.half_width,
            config.height,
            config.unstuck_max_tiles.max(1) as u32,
        ) {
            self.player.pos = free;
        }
        self.player.best_altitude = self.player.pos.y;
        self.camera = Camera::new(self.player.rope_origin(&config));
    }

    pub fn terrain(&self) -> &Terrain {
        self.cache.terrain()
    }

    /// Record to persist for this climb
    pub fn save_record(&self) -> SaveRecord {
        SaveRecord::new(self.seed, self.player.altitude(), self.player.best_altitude)
    }

    pub fn player_snapshot(&self) -> PlayerSnapshot {
        self.player.snapshot()
    }

    pub fn rope_snapshot(&self) -> RopeSnapshot {
        self.rope.snapshot()
    }

    /// Altitude range currently on screen
    pub fn visible_range(&self) -> (f32, f32) {
        self.camera.visible_range(&self.tuning.camera)
    }

    /// Set stamina from the economy layer
    pub fn set_stamina(&mut self, stamina: f32) {
        self.player.set_stamina(stamina, &self.tuning.player);
    }

    pub fn is_over(&self) -> bool {
        self.player.dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::TerrainConfig;

    #[test]
    fn test_new_spawns_in_free_space() {
        let state = ClimbState::new(42, Tuning::default());
        let mut cache = state.cache.clone();
        let aabb = state.player.aabb(&state.tuning.player);
        assert!(!collision::overlaps_solid(&mut cache, aabb));
        assert!(state.events.is_empty());
        assert!(!state.cache.is_empty());
    }

    #[test]
    fn test_same_seed_same_spawn() {
        let a = ClimbState::new(7, Tuning::default());
        let b = ClimbState::new(7, Tuning::default());
        assert_eq!(a.player.pos, b.player.pos);
    }

    #[test]
    fn test_save_record() {
        let mut state = ClimbState::new(5, Tuning::default());
        state.player.best_altitude = 1234.0;
        let record = state.save_record();
        assert_eq!(record.seed, 5);
        assert_eq!(record.player_altitude, state.player.altitude());
        assert_eq!(record.best_altitude, 1234.0);
    }

    #[test]
    fn test_resume_on_camp() {
        let tuning = Tuning::default();
        let fresh = ClimbState::new(42, tuning.clone());
        let camps = fresh.terrain().camps().to_vec();
        let record = SaveRecord::new(42, camps[1].altitude + 50.0, 2000.0);

        let state = ClimbState::resume(&record, tuning);
        assert_eq!(state.seed, 42);
        assert_eq!(state.player.last_camp, Some(camps[1].index));
        assert!((state.player.pos.y - camps[1].altitude).abs() <= TILE_SIZE);
        assert_eq!(state.player.best_altitude, 2000.0);
        let mut cache = state.cache.clone();
        assert!(!collision::overlaps_solid(&mut cache, state.player.aabb(&state.tuning.player)));
    }

    #[test]
    fn test_resume_below_first_camp_uses_spawn() {
        let tuning = Tuning::default();
        let fresh = ClimbState::new(3, tuning.clone());
        let record = SaveRecord::new(3, 10.0, 10.0);
        let state = ClimbState::resume(&record, tuning);
        assert_eq!(state.player.pos, fresh.player.pos);
        assert_eq!(state.player.last_camp, None);
    }

    #[test]
    fn test_embedded_resume_reports_unstuck() {
        // A camp buried deep under flat ground, with too little headroom
        let mut tuning = Tuning::default();
        tuning.terrain = TerrainConfig::flat(5000.0);
        tuning.terrain.camp_count = 1;
        tuning.terrain.camp_interval = 400.0;
        tuning.terrain.camp_jitter = 0.0;
        tuning.terrain.camp_clearance_tiles = 1;
        let record = SaveRecord::new(1, 400.0, 400.0);

        let state = ClimbState::resume(&record, tuning);
        assert!(
            state
                .events
                .iter()
                .any(|e| matches!(e, ClimbEvent::Unstuck { .. }))
        );
        assert_eq!(state.player.pos.y, 4992.0);
    }
}
