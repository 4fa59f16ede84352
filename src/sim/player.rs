//! Climber kinematics
//!
//! Per step: input acceleration, gravity, rope coupling and length limit,
//! axis-separated tile collision, then fall speed clamp and fall damage.
//! The position is the bottom center of the collision box.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cache::ChunkCache;
use super::chunk::Surface;
use super::collision::{self, Aabb};
use super::rope::Rope;
use super::state::ClimbEvent;
use crate::consts::TILE_SIZE;
use crate::tuning::PlayerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Idle,
    Walk,
    Fall,
    Swing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Control intent for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    /// -1 (left) to 1 (right)
    pub move_x: f32,
    pub jump: bool,
    /// Grip strength bonus from gear (1.0 = none)
    pub grip_multiplier: f32,
}

impl PlayerInput {
    /// Grip multiplier clamped to a sane range (1.0 when not a number)
    pub fn grip_strength(&self) -> f32 {
        if self.grip_multiplier.is_finite() {
            self.grip_multiplier.clamp(0.0, 4.0)
        } else {
            1.0
        }
    }
}

impl Default for PlayerInput {
    fn default() -> Self {
        Self {
            move_x: 0.0,
            jump: false,
            grip_multiplier: 1.0,
        }
    }
}

/// World forces for one step
#[derive(Debug, Clone, Copy)]
pub struct Forces {
    pub gravity: f32,
    pub wind: f32,
    pub dt: f32,
}

/// Read-only view for renderers and UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
    pub state: PlayerState,
    pub facing: Facing,
    pub health: f32,
    pub stamina: f32,
    pub altitude: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Feet (bottom center)
    pub pos: Vec2,
    pub vel: Vec2,
    pub grounded: bool,
    pub facing: Facing,
    pub state: PlayerState,
    pub health: f32,
    pub stamina: f32,
    pub best_altitude: f32,
    pub dead: bool,
    /// Index of the last camp the player stood at
    pub last_camp: Option<u32>,
}

impl Player {
    pub fn new(pos: Vec2, config: &PlayerConfig) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            grounded: false,
            facing: Facing::Right,
            state: PlayerState::Fall,
            health: config.max_health,
            stamina: config.max_stamina,
            best_altitude: pos.y,
            dead: false,
            last_camp: None,
        }
    }

    pub fn altitude(&self) -> f32 {
        self.pos.y
    }

    /// Where the rope attaches (box center)
    pub fn rope_origin(&self, config: &PlayerConfig) -> Vec2 {
        self.pos + Vec2::new(0.0, config.height * 0.5)
    }

    pub fn aabb(&self, config: &PlayerConfig) -> Aabb {
        Aabb::from_feet(self.pos, config.half_width, config.height)
    }

    /// Stamina is spent and restored by the economy layer
    pub fn set_stamina(&mut self, stamina: f32, config: &PlayerConfig) {
        self.stamina = if stamina.is_finite() {
            stamina.clamp(0.0, config.max_stamina)
        } else {
            0.0
        };
    }

    /// Move straight up out of solid tiles, if embedded.
    ///
    /// Returns the event to report when the player had to be moved.
    pub fn unstick(&mut self, config: &PlayerConfig, cache: &mut ChunkCache) -> Option<ClimbEvent> {
        let from = self.pos;
        let max_tiles = config.unstuck_max_tiles.max(1) as u32;
        match collision::free_spot_above(cache, from, config.half_width, config.height, max_tiles) {
            Some(to) if to != from => {
                log::warn!(
                    "Player embedded at ({:.1}, {:.1}), moved up to {:.1}",
                    from.x,
                    from.y,
                    to.y
                );
                self.pos = to;
                self.vel = Vec2::ZERO;
                Some(ClimbEvent::Unstuck { from, to })
            }
            Some(_) => None,
            None => {
                log::warn!(
                    "Player embedded at ({:.1}, {:.1}) with no free spot within {} tiles",
                    from.x,
                    from.y,
                    max_tiles
                );
                None
            }
        }
    }

    /// Advance one step. The rope must already have been updated this step.
    pub fn update(
        &mut self,
        config: &PlayerConfig,
        input: &PlayerInput,
        forces: Forces,
        rope: &mut Rope,
        cache: &mut ChunkCache,
        events: &mut Vec<ClimbEvent>,
    ) {
        if self.dead {
            return;
        }
        let dt = forces.dt;
        if !self.pos.is_finite() || !self.vel.is_finite() {
            self.vel = Vec2::ZERO;
            if !self.pos.is_finite() {
                self.pos = cache.terrain().spawn_point();
            }
            events.extend(self.unstick(config, cache));
        }

        if rope.anchor().is_some() && self.stamina <= 0.0 {
            log::info!("Out of stamina, letting go of the rope");
            rope.retract();
            events.push(ClimbEvent::StaminaDrained);
        }

        if input.jump {
            if rope.anchor().is_some() {
                rope.retract();
                self.vel.y = self.vel.y.max(0.0) + config.rope_release_boost;
                events.push(ClimbEvent::RopeReleased);
            } else if self.grounded {
                self.vel.y = config.jump_speed;
                self.grounded = false;
            }
        }
        let anchor = rope.anchor().copied();

        // Input acceleration
        let mut move_x = if input.move_x.is_finite() {
            input.move_x.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        if move_x.abs() < config.move_deadzone {
            move_x = 0.0;
        }
        let grip = input.grip_strength();
        let stamina_factor = if config.max_stamina > 0.0 {
            0.5 + 0.5 * (self.stamina / config.max_stamina).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let accel = match anchor {
            Some(a) if a.surface == Surface::Ice => config.swing_accel * config.ice_grip_factor,
            Some(_) => config.swing_accel,
            None if self.grounded => config.ground_accel,
            None => config.air_accel,
        };
        self.vel.x += move_x * accel * grip * stamina_factor * dt;
        if anchor.is_none() {
            if self.grounded {
                if move_x == 0.0 {
                    self.vel.x *= config.ground_friction;
                }
            } else {
                self.vel.x *= config.air_drag;
            }
        }
        self.vel.x = self
            .vel
            .x
            .clamp(-config.max_horizontal_speed, config.max_horizontal_speed);

        self.vel.y -= forces.gravity * dt;

        // Rope: wind pushes the swing, length is a hard limit
        let mut correction = Vec2::ZERO;
        if let Some(anchor) = anchor {
            self.vel.x += forces.wind * config.wind_coupling * dt;
            let max_len = rope.max_length();
            let origin = self.rope_origin(config);
            let offset = origin - anchor.point;
            let dist = offset.length();
            if dist > max_len {
                correction = anchor.point + offset / dist * max_len - origin;
            }
            let predicted = origin + correction + self.vel * dt - anchor.point;
            if predicted.length() > max_len {
                let radial = predicted.normalize_or_zero();
                let outward = self.vel.dot(radial);
                if outward > 0.0 {
                    self.vel -= radial * outward * config.radial_damping;
                }
            }
        }

        let was_grounded = self.grounded;
        let fall_speed = -self.vel.y;
        let landed = self.integrate(config, self.vel * dt + correction, cache);
        self.grounded = self.vel.y <= 0.0
            && (landed || collision::on_ground(cache, self.pos, config.half_width));

        self.vel.y = self.vel.y.max(-config.max_fall_speed);

        if landed && !was_grounded {
            self.land(config, fall_speed, rope, events);
        }

        self.update_state(move_x, anchor.is_some() && rope.anchor().is_some());
        self.best_altitude = self.best_altitude.max(self.pos.y);
        self.collect(config, cache, events);
        self.check_camp(config, cache, events);
    }

    /// Move by `disp` in sub-steps under half a tile, one axis at a time.
    /// Returns true when a floor stopped the fall.
    fn integrate(&mut self, config: &PlayerConfig, disp: Vec2, cache: &mut ChunkCache) -> bool {
        let (hw, h) = (config.half_width, config.height);
        let longest = disp.x.abs().max(disp.y.abs());
        let steps = ((longest / (TILE_SIZE * 0.5)).ceil() as usize).clamp(1, 64);
        let mut step = disp / steps as f32;
        let mut landed = false;

        for _ in 0..steps {
            if step.x != 0.0 {
                let moved = collision::move_x(cache, self.pos, hw, h, step.x);
                self.pos.x = moved.value;
                if moved.blocked {
                    self.vel.x = -self.vel.x * config.wall_bounce;
                    step.x = 0.0;
                }
            }
            if step.y != 0.0 {
                let moved = collision::move_y(cache, self.pos, hw, h, step.y);
                self.pos.y = moved.value;
                if moved.blocked {
                    if step.y < 0.0 {
                        landed = true;
                    }
                    self.vel.y = 0.0;
                    step.y = 0.0;
                }
            }
            if step == Vec2::ZERO {
                break;
            }
        }
        landed
    }

    fn land(
        &mut self,
        config: &PlayerConfig,
        impact: f32,
        rope: &mut Rope,
        events: &mut Vec<ClimbEvent>,
    ) {
        events.push(ClimbEvent::Landed { impact });
        if impact <= config.safe_landing_speed {
            return;
        }
        let amount = (impact - config.safe_landing_speed) * config.damage_per_speed;
        self.health = (self.health - amount).max(0.0);
        log::info!(
            "Hard landing at {:.0} u/s: -{:.1} health ({:.1} left)",
            impact,
            amount,
            self.health
        );
        events.push(ClimbEvent::FallDamage {
            amount,
            health: self.health,
        });
        if self.health <= 0.0 {
            log::info!("Climber died at altitude {:.0}", self.pos.y);
            self.dead = true;
            self.vel = Vec2::ZERO;
            rope.retract();
            events.push(ClimbEvent::Died);
        }
    }

    fn update_state(&mut self, move_x: f32, swinging: bool) {
        if move_x > 0.0 {
            self.facing = Facing::Right;
        } else if move_x < 0.0 {
            self.facing = Facing::Left;
        } else if swinging && self.vel.x.abs() > 1.0 {
            self.facing = if self.vel.x > 0.0 {
                Facing::Right
            } else {
                Facing::Left
            };
        }
        self.state = if swinging {
            PlayerState::Swing
        } else if !self.grounded {
            PlayerState::Fall
        } else if move_x != 0.0 {
            PlayerState::Walk
        } else {
            PlayerState::Idle
        };
    }

    fn collect(
        &mut self,
        config: &PlayerConfig,
        cache: &mut ChunkCache,
        events: &mut Vec<ClimbEvent>,
    ) {
        let center = self.rope_origin(config);
        for (id, kind) in cache.loot_near(center, config.collect_radius) {
            if cache.collect_loot(id) {
                log::debug!("Collected {:?}", kind);
                events.push(ClimbEvent::LootCollected { id, kind });
            }
        }
    }

    fn check_camp(
        &mut self,
        config: &PlayerConfig,
        cache: &ChunkCache,
        events: &mut Vec<ClimbEvent>,
    ) {
        if !self.grounded {
            return;
        }
        let Some(camp) = cache.terrain().camp_near(self.pos.y, config.camp_tolerance) else {
            return;
        };
        if self.last_camp == Some(camp.index) {
            return;
        }
        self.last_camp = Some(camp.index);
        log::info!("Reached camp {} at altitude {:.0}", camp.index + 1, camp.altitude);
        events.push(ClimbEvent::ReachedCamp {
            index: camp.index,
            altitude: camp.altitude,
        });
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            x: self.pos.x,
            y: self.pos.y,
            vx: self.vel.x,
            vy: self.vel.y,
            grounded: self.grounded,
            state: self.state,
            facing: self.facing,
            health: self.health,
            stamina: self.stamina,
            altitude: self.altitude(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::rope::{Anchor, RopeStep};
    use crate::sim::terrain::Terrain;
    use crate::tuning::{Layout, RopeConfig, StreamConfig, TerrainConfig};
    use proptest::prelude::*;

    /// Top of the first solid tile row for a flat surface at -150
    const FLOOR_TOP: f32 = -144.0;
    const GRAVITY: f32 = 900.0;

    struct Rig {
        config: PlayerConfig,
        player: Player,
        rope: Rope,
        cache: ChunkCache,
        events: Vec<ClimbEvent>,
    }

    impl Rig {
        fn new(terrain: TerrainConfig, pos: Vec2) -> Self {
            let config = PlayerConfig::default();
            Self {
                player: Player::new(pos, &config),
                config,
                rope: Rope::new(RopeConfig::default()),
                cache: ChunkCache::new(Terrain::new(1, terrain), StreamConfig::default()),
                events: Vec::new(),
            }
        }

        fn flat(pos: Vec2) -> Self {
            Self::new(TerrainConfig::flat(-150.0), pos)
        }

        fn step(&mut self, input: PlayerInput) {
            let origin = self.player.rope_origin(&self.config);
            let rope_step = RopeStep {
                origin,
                gravity: GRAVITY,
                wind: 0.0,
                dt: SIM_DT,
            };
            self.rope.update(rope_step, &mut self.cache);
            let forces = Forces {
                gravity: GRAVITY,
                wind: 0.0,
                dt: SIM_DT,
            };
            self.player.update(
                &self.config,
                &input,
                forces,
                &mut self.rope,
                &mut self.cache,
                &mut self.events,
            );
        }

        fn settle(&mut self) {
            for _ in 0..120 {
                self.step(PlayerInput::default());
            }
        }
    }

    fn anchor_at(point: Vec2) -> Anchor {
        Anchor {
            point,
            normal: Vec2::NEG_Y,
            surface: Surface::Rock,
            grip: None,
        }
    }

    #[test]
    fn test_falls_and_lands_on_floor() {
        let mut rig = Rig::flat(Vec2::new(0.0, -100.0));
        rig.step(PlayerInput::default());
        assert_eq!(rig.player.state, PlayerState::Fall);
        rig.settle();
        assert!(rig.player.grounded);
        assert_eq!(rig.player.pos.y, FLOOR_TOP);
        assert_eq!(rig.player.state, PlayerState::Idle);
        assert!(rig.events.iter().any(|e| matches!(e, ClimbEvent::Landed { .. })));
    }

    #[test]
    fn test_walk_and_facing() {
        let mut rig = Rig::flat(Vec2::new(0.0, FLOOR_TOP));
        rig.settle();
        rig.step(PlayerInput {
            move_x: -1.0,
            ..Default::default()
        });
        assert_eq!(rig.player.state, PlayerState::Walk);
        assert_eq!(rig.player.facing, Facing::Left);
        assert!(rig.player.vel.x < 0.0);

        // Deadzone input counts as idle and friction bleeds speed
        for _ in 0..60 {
            rig.step(PlayerInput {
                move_x: 0.05,
                ..Default::default()
            });
        }
        assert_eq!(rig.player.state, PlayerState::Idle);
        assert!(rig.player.vel.x.abs() < 1.0);
    }

    #[test]
    fn test_jump_from_ground() {
        let mut rig = Rig::flat(Vec2::new(0.0, FLOOR_TOP));
        rig.settle();
        rig.step(PlayerInput {
            jump: true,
            ..Default::default()
        });
        assert!(rig.player.pos.y > FLOOR_TOP);
        assert_eq!(rig.player.state, PlayerState::Fall);

        // No double jump
        let vy = rig.player.vel.y;
        rig.step(PlayerInput {
            jump: true,
            ..Default::default()
        });
        assert!(rig.player.vel.y < vy);
    }

    #[test]
    fn test_swing_state_and_release_boost() {
        let mut rig = Rig::flat(Vec2::new(100.0, 0.0));
        let origin = rig.player.rope_origin(&rig.config);
        rig.rope.attach(origin, anchor_at(Vec2::new(0.0, 150.0)));
        rig.step(PlayerInput::default());
        assert_eq!(rig.player.state, PlayerState::Swing);

        let vy = rig.player.vel.y;
        rig.step(PlayerInput {
            jump: true,
            ..Default::default()
        });
        assert!(rig.player.vel.y > vy);
        assert!(rig.rope.anchor().is_none());
        assert!(rig.events.contains(&ClimbEvent::RopeReleased));
        assert_eq!(rig.player.state, PlayerState::Fall);
    }

    #[test]
    fn test_rope_length_bound_over_long_swing() {
        let mut rig = Rig::new(TerrainConfig::flat(-5000.0), Vec2::new(180.0, 0.0));
        let anchor = Vec2::new(0.0, 150.0);
        let origin = rig.player.rope_origin(&rig.config);
        rig.rope.attach(origin, anchor_at(anchor));
        let limit = rig.rope.max_length() * 1.02;

        for i in 0..600 {
            let move_x = if (i / 90) % 2 == 0 { 1.0 } else { -1.0 };
            rig.step(PlayerInput {
                move_x,
                ..Default::default()
            });
            let d = rig.player.rope_origin(&rig.config).distance(anchor);
            assert!(d <= limit, "tick {i}: {d} > {limit}");
        }
        assert_eq!(rig.player.state, PlayerState::Swing);
    }

    #[test]
    fn test_stamina_drained_lets_go() {
        let mut rig = Rig::flat(Vec2::new(50.0, 0.0));
        let origin = rig.player.rope_origin(&rig.config);
        rig.rope.attach(origin, anchor_at(Vec2::new(0.0, 150.0)));
        rig.player.set_stamina(0.0, &rig.config);
        rig.step(PlayerInput::default());
        assert!(rig.events.contains(&ClimbEvent::StaminaDrained));
        assert!(rig.rope.anchor().is_none());
        assert_ne!(rig.player.state, PlayerState::Swing);
    }

    #[test]
    fn test_fall_damage() {
        let mut rig = Rig::flat(Vec2::new(0.0, 2000.0));
        for _ in 0..600 {
            rig.step(PlayerInput::default());
        }
        let max = rig.config.max_health;
        assert!(rig.player.health < max);
        assert!(rig.events.iter().any(|e| matches!(e, ClimbEvent::FallDamage { .. })));

        let mut gentle = Rig::flat(Vec2::new(0.0, FLOOR_TOP + 40.0));
        gentle.settle();
        assert_eq!(gentle.player.health, max);
    }

    #[test]
    fn test_death_freezes_player() {
        let mut rig = Rig::flat(Vec2::new(0.0, 3000.0));
        rig.player.health = 1.0;
        for _ in 0..600 {
            rig.step(PlayerInput::default());
        }
        assert!(rig.player.dead);
        assert!(rig.events.contains(&ClimbEvent::Died));
        let pos = rig.player.pos;
        rig.step(PlayerInput {
            move_x: 1.0,
            jump: true,
            ..Default::default()
        });
        assert_eq!(rig.player.pos, pos);
    }

    #[test]
    fn test_embedded_spawn_snaps_up() {
        let mut rig = Rig::flat(Vec2::new(0.0, -400.0));
        let event = rig.player.unstick(&rig.config, &mut rig.cache);
        assert!(matches!(event, Some(ClimbEvent::Unstuck { .. })));
        assert_eq!(rig.player.pos.y, FLOOR_TOP);
        assert!(rig.player.unstick(&rig.config, &mut rig.cache).is_none());
    }

    #[test]
    fn test_wall_bounce() {
        let mut terrain = TerrainConfig::flat(-150.0);
        terrain.layout = Layout::Shaft;
        terrain.shaft_width = 320.0;
        terrain.narrowing = 0.0;
        terrain.wall_jitter = 0.0;
        terrain.min_passage_width = 192.0;
        let mut rig = Rig::new(terrain, Vec2::new(150.0, -60.0));
        rig.player.vel.x = 400.0;
        rig.step(PlayerInput::default());
        let expected = -400.0 * rig.config.air_drag * rig.config.wall_bounce;
        assert!((rig.player.vel.x - expected).abs() < 1e-2, "vx {}", rig.player.vel.x);
        assert!(rig.player.pos.x + rig.config.half_width <= 160.0);
    }

    #[test]
    fn test_snapshot() {
        let mut rig = Rig::flat(Vec2::new(3.0, FLOOR_TOP));
        rig.settle();
        let snap = rig.player.snapshot();
        assert_eq!(snap.x, 3.0);
        assert_eq!(snap.altitude, FLOOR_TOP);
        assert!(snap.grounded);
        assert_eq!(snap.state, PlayerState::Idle);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// However fast the player is thrown at the floor, it never ends up inside it
        #[test]
        fn prop_no_tunneling(
            x in -200.0f32..200.0,
            height in 0.0f32..400.0,
            vx in -2000.0f32..2000.0,
            vy in -5000.0f32..0.0,
        ) {
            let mut rig = Rig::flat(Vec2::new(x, FLOOR_TOP + height));
            rig.player.vel = Vec2::new(vx, vy);
            for _ in 0..120 {
                rig.step(PlayerInput::default());
                prop_assert!(rig.player.pos.y >= FLOOR_TOP - 1e-3, "sank to {}", rig.player.pos.y);
                let aabb = rig.player.aabb(&rig.config);
                prop_assert!(!collision::overlaps_solid(&mut rig.cache, aabb));
            }
        }

        /// A swinging player never drifts past the rope length (2% slack)
        #[test]
        fn prop_rope_length_bound(
            start_x in -150.0f32..150.0,
            start_y in -60.0f32..60.0,
            vx in -600.0f32..600.0,
            vy in -600.0f32..600.0,
            wind in -120.0f32..120.0,
        ) {
            let mut rig = Rig::new(TerrainConfig::flat(-5000.0), Vec2::new(start_x, start_y));
            let anchor = Vec2::new(0.0, 150.0);
            let origin = rig.player.rope_origin(&rig.config);
            rig.rope.attach(origin, anchor_at(anchor));
            rig.player.vel = Vec2::new(vx, vy);
            let limit = rig.rope.max_length() * 1.02;
            for _ in 0..300 {
                let origin = rig.player.rope_origin(&rig.config);
                let rope_step = RopeStep {
                    origin,
                    gravity: GRAVITY,
                    wind,
                    dt: SIM_DT,
                };
                rig.rope.update(rope_step, &mut rig.cache);
                let forces = Forces {
                    gravity: GRAVITY,
                    wind,
                    dt: SIM_DT,
                };
                rig.player.update(
                    &rig.config,
                    &PlayerInput::default(),
                    forces,
                    &mut rig.rope,
                    &mut rig.cache,
                    &mut rig.events,
                );
                let d = rig.player.rope_origin(&rig.config).distance(anchor);
                prop_assert!(d <= limit, "{} > {}", d, limit);
            }
        }
    }
}
