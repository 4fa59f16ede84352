//! Data-driven game balance
//!
//! Every constant the simulation reads lives in one of these structs so a
//! run can be re-tuned from a JSON file without recompiling. Missing fields
//! fall back to defaults.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::consts::TILE_SIZE;

/// Terrain layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Layout {
    /// Open mountainside: only the surface heightfield is solid ground
    Slope,
    /// Vertical shaft: heightfield floor plus narrowing side walls
    #[default]
    Shaft,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Slope => "Slope",
            Layout::Shaft => "Shaft",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "slope" => Some(Layout::Slope),
            "shaft" => Some(Layout::Shaft),
            _ => None,
        }
    }
}

/// Terrain generator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub layout: Layout,

    // === Heightfield ===
    /// Surface elevation at the center line before noise
    pub base_elevation: f32,
    /// Horizontal position of the valley center line
    pub center_x: f32,
    /// Rise per unit of horizontal distance from the center line
    pub trend: f32,
    /// Radius over which the trend is rounded off near the center
    pub trend_softening: f32,
    /// Amplitude of the fBm term (world units)
    pub amplitude: f32,
    pub octaves: u32,
    /// Distance between noise control points in the first octave
    pub base_wavelength: f32,
    pub lacunarity: f32,
    pub persistence: f32,
    /// Altitude at which the roughness has gained one full amplitude
    pub difficulty_altitude: f32,
    /// Cap on the altitude-driven roughness gain
    pub max_difficulty: f32,

    // === Shaft walls ===
    /// Passage width at altitude zero
    pub shaft_width: f32,
    /// Width lost per unit of altitude
    pub narrowing: f32,
    pub min_passage_width: f32,
    /// Maximum per-side wall offset from noise
    pub wall_jitter: f32,
    /// Distance between wall noise control points along the altitude axis
    pub wall_wavelength: f32,

    // === Material bands ===
    /// Depth of the surface band (dirt/snow/ice) above rock
    pub topsoil_depth: f32,
    pub snow_line: f32,
    pub ice_line: f32,
    pub ice_chance: f32,

    // === Caves ===
    pub caves: bool,
    /// Minimum depth below the surface before caves are carved
    pub cave_depth: f32,
    /// Cave field value (in [-1, 1]) above which rock becomes air
    pub cave_threshold: f32,
    pub cave_frequency: f32,

    // === Grips and loot ===
    pub grip_chance: f32,
    pub grip_radius: f32,
    pub single_use_chance: f32,
    pub loot_chance: f32,

    // === Camps ===
    pub camp_interval: f32,
    pub camp_jitter: f32,
    pub camp_count: u32,
    pub camp_platform_tiles: i32,
    pub camp_clearance_tiles: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Shaft,

            base_elevation: 0.0,
            center_x: 0.0,
            trend: 0.35,
            trend_softening: 64.0,
            amplitude: 48.0,
            octaves: 5,
            base_wavelength: 256.0,
            lacunarity: 2.0,
            persistence: 0.5,
            difficulty_altitude: 2000.0,
            max_difficulty: 3.0,

            shaft_width: 640.0,
            narrowing: 0.02,
            min_passage_width: 192.0,
            wall_jitter: 48.0,
            wall_wavelength: 96.0,

            topsoil_depth: 2.0 * TILE_SIZE,
            snow_line: 300.0,
            ice_line: 800.0,
            ice_chance: 0.15,

            caves: true,
            cave_depth: 6.0 * TILE_SIZE,
            cave_threshold: 0.45,
            cave_frequency: 0.02,

            grip_chance: 0.06,
            grip_radius: 10.0,
            single_use_chance: 0.2,
            loot_chance: 0.02,

            camp_interval: 400.0,
            camp_jitter: 20.0,
            camp_count: 64,
            camp_platform_tiles: 8,
            camp_clearance_tiles: 4,
        }
    }
}

impl TerrainConfig {
    /// Featureless ground at a fixed elevation (tests, tutorials)
    pub fn flat(elevation: f32) -> Self {
        Self {
            layout: Layout::Slope,
            base_elevation: elevation,
            trend: 0.0,
            amplitude: 0.0,
            caves: false,
            grip_chance: 0.0,
            loot_chance: 0.0,
            camp_count: 0,
            ..Self::default()
        }
    }
}

/// Chunk streaming parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Chunk columns kept on each side of the center column
    pub half_width_chunks: i32,
    /// Rows below the lowest visible row kept before eviction
    pub evict_margin: i32,
    /// Generation budget for one `ensure` call
    pub max_chunks_per_ensure: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            half_width_chunks: 2,
            evict_margin: 2,
            max_chunks_per_ensure: 4,
        }
    }
}

/// Rope and hook parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RopeConfig {
    pub segment_count: usize,
    pub segment_length: f32,
    /// Velocity retained per step by Verlet points
    pub damping: f32,
    /// Fraction of world gravity felt by rope points
    pub gravity_scale: f32,
    pub relaxation_passes: u32,
    /// Hook launch speed at zero power
    pub base_speed: f32,
    /// Extra launch speed at full power
    pub power_scale: f32,
    /// Fraction of world gravity felt by the flying hook
    pub hook_gravity_scale: f32,
    /// Horizontal velocity retained per step while flying
    pub hook_drag: f32,
    pub hook_radius: f32,
    /// Wind acceleration on the flying hook per unit of wind speed
    pub hook_wind: f32,
    /// Throw aborts past `max_length * max_range_factor`
    pub max_range_factor: f32,
    /// Lateral acceleration on rope points per unit of wind speed
    pub wind_sway: f32,
    /// Reach when grabbing the nearest grip, before gear bonuses
    pub grab_range: f32,
    /// Distance weight for grips above the player (below 1.0 favours them)
    pub grab_above_weight: f32,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            segment_count: 18,
            segment_length: 12.0,
            damping: 0.98,
            gravity_scale: 0.3,
            relaxation_passes: 6,
            base_speed: 840.0,
            power_scale: 480.0,
            hook_gravity_scale: 0.7,
            hook_drag: 0.99,
            hook_radius: 4.0,
            hook_wind: 0.2,
            max_range_factor: 1.1,
            wind_sway: 0.5,
            grab_range: 160.0,
            grab_above_weight: 0.7,
        }
    }
}

impl RopeConfig {
    /// Fully paid-out rope length
    pub fn max_length(&self) -> f32 {
        self.segment_count as f32 * self.segment_length
    }
}

/// Player movement parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub half_width: f32,
    pub height: f32,
    pub ground_accel: f32,
    pub air_accel: f32,
    pub swing_accel: f32,
    /// Horizontal velocity retained per step on the ground without input
    pub ground_friction: f32,
    /// Horizontal velocity retained per step in the air
    pub air_drag: f32,
    pub max_horizontal_speed: f32,
    pub max_fall_speed: f32,
    pub jump_speed: f32,
    /// Upward kick when jumping off a swinging rope
    pub rope_release_boost: f32,
    pub safe_landing_speed: f32,
    /// Health lost per unit of impact speed above the safe threshold
    pub damage_per_speed: f32,
    pub max_health: f32,
    pub max_stamina: f32,
    /// Fraction of horizontal speed kept (reversed) when hitting a wall
    pub wall_bounce: f32,
    /// 1.0 removes outward radial velocity at the rope limit, above 1.0 reflects it
    pub radial_damping: f32,
    /// Horizontal acceleration per unit of wind speed while swinging
    pub wind_coupling: f32,
    /// Swing force multiplier when anchored to ice
    pub ice_grip_factor: f32,
    /// Stamina an ice grip costs to grab, divided by the grip multiplier
    pub ice_grab_stamina: f32,
    pub collect_radius: f32,
    pub camp_tolerance: f32,
    /// Input magnitude below which the player counts as idle
    pub move_deadzone: f32,
    /// Search limit (in tiles) when freeing an embedded player
    pub unstuck_max_tiles: i32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            half_width: 6.0,
            height: 24.0,
            ground_accel: 1800.0,
            air_accel: 600.0,
            swing_accel: 900.0,
            ground_friction: 0.82,
            air_drag: 0.98,
            max_horizontal_speed: 480.0,
            max_fall_speed: 540.0,
            jump_speed: 360.0,
            rope_release_boost: 240.0,
            safe_landing_speed: 420.0,
            damage_per_speed: 0.25,
            max_health: 100.0,
            max_stamina: 100.0,
            wall_bounce: 0.3,
            radial_damping: 1.0,
            wind_coupling: 0.5,
            ice_grip_factor: 0.6,
            ice_grab_stamina: 8.0,
            collect_radius: 24.0,
            camp_tolerance: 15.0,
            move_deadzone: 0.1,
            unstuck_max_tiles: 512,
        }
    }
}

/// Wind parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    /// Peak wind speed at altitude zero
    pub max_speed: f32,
    /// Altitude over which the peak speed doubles
    pub altitude_scale: f32,
    /// Fraction of the gap to the target closed per tick
    pub ease: f32,
    pub min_hold_ticks: u32,
    pub max_hold_ticks: u32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            max_speed: 60.0,
            altitude_scale: 2000.0,
            ease: 0.01,
            min_hold_ticks: 60,
            max_hold_ticks: 180,
        }
    }
}

impl WindConfig {
    /// No wind at all
    pub fn calm() -> Self {
        Self {
            max_speed: 0.0,
            ..Self::default()
        }
    }
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Fraction of the gap to the player closed per tick
    pub follow_rate: f32,
    /// Half the visible height in world units
    pub view_half_height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_rate: 0.08,
            view_half_height: 400.0,
        }
    }
}

/// Complete balance sheet for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// World gravity (units/s², pointing down)
    pub gravity: f32,
    pub terrain: TerrainConfig,
    pub stream: StreamConfig,
    pub rope: RopeConfig,
    pub player: PlayerConfig,
    pub wind: WindConfig,
    pub camera: CameraConfig,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 900.0,
            terrain: TerrainConfig::default(),
            stream: StreamConfig::default(),
            rope: RopeConfig::default(),
            player: PlayerConfig::default(),
            wind: WindConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl Tuning {
    /// Parse a tuning file; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp values that would otherwise divide by zero, break camp
    /// ordering, or let the player tunnel through a tile in one step.
    pub fn sanitized(mut self) -> Self {
        let t = &mut self.terrain;
        t.octaves = t.octaves.clamp(1, 12);
        t.base_wavelength = t.base_wavelength.max(1.0);
        t.lacunarity = t.lacunarity.max(1.0);
        t.persistence = t.persistence.clamp(0.0, 1.0);
        t.trend_softening = t.trend_softening.max(1.0);
        t.difficulty_altitude = t.difficulty_altitude.max(1.0);
        t.max_difficulty = t.max_difficulty.max(0.0);
        t.min_passage_width = t.min_passage_width.max(TILE_SIZE * 2.0);
        t.shaft_width = t.shaft_width.max(t.min_passage_width);
        t.narrowing = t.narrowing.max(0.0);
        t.wall_wavelength = t.wall_wavelength.max(1.0);
        t.camp_interval = t.camp_interval.max(TILE_SIZE);
        t.camp_jitter = t.camp_jitter.clamp(0.0, t.camp_interval * 0.45);
        t.camp_platform_tiles = t.camp_platform_tiles.max(1);
        t.camp_clearance_tiles = t.camp_clearance_tiles.max(0);
        t.cave_frequency = t.cave_frequency.max(0.0);

        self.stream.half_width_chunks = self.stream.half_width_chunks.clamp(0, 32);
        self.stream.evict_margin = self.stream.evict_margin.max(0);
        self.stream.max_chunks_per_ensure = self.stream.max_chunks_per_ensure.max(1);

        let r = &mut self.rope;
        r.segment_count = r.segment_count.max(2);
        r.segment_length = r.segment_length.max(1.0);
        r.damping = r.damping.clamp(0.0, 1.0);
        r.relaxation_passes = r.relaxation_passes.max(1);
        r.base_speed = r.base_speed.max(0.0);
        r.power_scale = r.power_scale.max(0.0);
        r.hook_drag = r.hook_drag.clamp(0.0, 1.0);
        r.max_range_factor = r.max_range_factor.max(1.0);
        r.grab_range = r.grab_range.max(0.0);
        r.grab_above_weight = r.grab_above_weight.clamp(0.1, 1.0);

        // One step of fall must stay below one tile
        let tunnel_limit = TILE_SIZE / crate::consts::SIM_DT * 0.9;
        let p = &mut self.player;
        p.max_fall_speed = p.max_fall_speed.clamp(1.0, tunnel_limit);
        p.max_horizontal_speed = p.max_horizontal_speed.clamp(1.0, tunnel_limit);
        p.half_width = p.half_width.clamp(1.0, TILE_SIZE);
        p.height = p.height.max(1.0);
        p.max_health = p.max_health.max(1.0);
        p.max_stamina = p.max_stamina.max(1.0);
        p.unstuck_max_tiles = p.unstuck_max_tiles.max(1);

        self.wind.altitude_scale = self.wind.altitude_scale.max(1.0);
        self.wind.ease = self.wind.ease.clamp(0.0, 1.0);
        self.wind.min_hold_ticks = self.wind.min_hold_ticks.max(1);
        self.wind.max_hold_ticks = self.wind.max_hold_ticks.max(self.wind.min_hold_ticks);

        self.camera.follow_rate = self.camera.follow_rate.clamp(0.0, 1.0);
        self.camera.view_half_height = self.camera.view_half_height.max(TILE_SIZE);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "terrain": { "camp_interval": 250.0 } }"#).unwrap();
        assert_eq!(tuning.terrain.camp_interval, 250.0);
        assert_eq!(tuning.rope, RopeConfig::default());
        assert_eq!(tuning.gravity, 900.0);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(Tuning::from_json("{ not json").is_err());
    }

    #[test]
    fn test_sanitize_clamps_jitter() {
        let mut tuning = Tuning::default();
        tuning.terrain.camp_interval = 100.0;
        tuning.terrain.camp_jitter = 80.0;
        let tuning = tuning.sanitized();
        assert!(tuning.terrain.camp_jitter < 50.0);
    }

    #[test]
    fn test_sanitize_prevents_tunneling_speeds() {
        let mut tuning = Tuning::default();
        tuning.player.max_fall_speed = 10_000.0;
        let tuning = tuning.sanitized();
        assert!(tuning.player.max_fall_speed * crate::consts::SIM_DT < TILE_SIZE);
    }

    #[test]
    fn test_json_roundtrip() {
        let tuning = Tuning::default();
        let json = tuning.to_json().unwrap();
        let back = Tuning::from_json(&json).unwrap();
        assert_eq!(back, tuning);
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!(Layout::from_str("SHAFT"), Some(Layout::Shaft));
        assert_eq!(Layout::from_str("slope"), Some(Layout::Slope));
        assert_eq!(Layout::from_str("cave"), None);
        assert_eq!(Layout::Shaft.as_str(), "Shaft");
    }

    #[test]
    fn test_max_length() {
        let rope = RopeConfig::default();
        assert_eq!(rope.max_length(), 18.0 * 12.0);
    }
}
