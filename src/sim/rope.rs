//! Grappling rope: hook ballistics, anchoring and Verlet swing
//!
//! The rope is a chain of `segment_count + 1` points. Point 0 follows the
//! player, the last point follows the hook (or the anchor once it sticks).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cache::ChunkCache;
use super::chunk::{GripId, Surface};
use super::sdf::{SurfaceContact, escape_surface, find_contact};
use crate::consts::{DIST_EPSILON, TILE_SIZE};
use crate::tuning::RopeConfig;

/// Player-to-anchor span, as a fraction of the full length, above which the
/// rope is laid straight
const TAUT_FRACTION: f32 = 0.97;
/// Segment error (fraction of rest length) the last segment must close to
const CLOSE_TOLERANCE: f32 = 0.01;
/// Upper bound on sweeps, as a multiple of `relaxation_passes`
const MAX_PASS_FACTOR: usize = 8;

/// Unit direction `from -> to`; hangs straight down when the points coincide
fn toward(from: Vec2, to: Vec2) -> Vec2 {
    let delta = to - from;
    if delta.length() < DIST_EPSILON {
        Vec2::NEG_Y
    } else {
        delta.normalize()
    }
}

/// One Verlet point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RopePoint {
    pub pos: Vec2,
    /// Position last step; velocity is implied by `pos - prev`
    pub prev: Vec2,
    pub pinned: bool,
}

impl RopePoint {
    fn at(pos: Vec2) -> Self {
        Self {
            pos,
            prev: pos,
            pinned: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hook {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Where the hook stuck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub point: Vec2,
    /// Out of the surface
    pub normal: Vec2,
    pub surface: Surface,
    /// Set when the hook caught on a grip rather than bare rock
    pub grip: Option<GripId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RopeState {
    Idle,
    Thrown,
    Anchored(Anchor),
    /// Released; goes back to `Idle` on the next update
    Retracting,
}

/// Tag-only view of `RopeState` for snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RopePhase {
    Idle,
    Thrown,
    Anchored,
    Retracting,
}

/// Something notable that happened during `Rope::update`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RopeEvent {
    Anchored(Anchor),
    /// The hook flew past its range and was pulled back
    OutOfRange,
}

/// Per-step inputs from the rest of the simulation
#[derive(Debug, Clone, Copy)]
pub struct RopeStep {
    /// Where the rope leaves the player
    pub origin: Vec2,
    pub gravity: f32,
    pub wind: f32,
    pub dt: f32,
}

/// Read-only view for renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RopeSnapshot {
    pub phase: RopePhase,
    pub hook: Vec2,
    pub anchor: Option<Anchor>,
    pub points: Vec<Vec2>,
}

#[derive(Debug, Clone)]
pub struct Rope {
    config: RopeConfig,
    state: RopeState,
    hook: Hook,
    points: Vec<RopePoint>,
}

impl Rope {
    pub fn new(config: RopeConfig) -> Self {
        let count = config.segment_count.max(1) + 1;
        Self {
            config,
            state: RopeState::Idle,
            hook: Hook::default(),
            points: vec![RopePoint::at(Vec2::ZERO); count],
        }
    }

    pub fn state(&self) -> RopeState {
        self.state
    }

    pub fn hook(&self) -> Hook {
        self.hook
    }

    pub fn points(&self) -> &[RopePoint] {
        &self.points
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        match &self.state {
            RopeState::Anchored(anchor) => Some(anchor),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == RopeState::Idle
    }

    /// Fully paid-out length
    pub fn max_length(&self) -> f32 {
        self.config.max_length()
    }

    fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    fn reset_points(&mut self, at: Vec2) {
        for p in &mut self.points {
            *p = RopePoint::at(at);
        }
    }

    /// Launch the hook from `origin`. Ignored unless the rope is idle.
    ///
    /// `angle` is in radians counter-clockwise from +x; `power` is clamped
    /// to `[0, 1]`.
    pub fn throw(&mut self, origin: Vec2, angle: f32, power: f32) -> bool {
        if !self.is_idle() || !origin.is_finite() || !angle.is_finite() {
            return false;
        }
        let power = if power.is_finite() { power.clamp(0.0, 1.0) } else { 0.0 };
        let speed = self.config.base_speed + power * self.config.power_scale;
        self.hook = Hook {
            pos: origin,
            vel: crate::angle_to_dir(angle) * speed,
        };
        self.reset_points(origin);
        self.state = RopeState::Thrown;
        log::debug!(
            "Hook thrown from ({:.1}, {:.1}) at {:.1}° speed {:.0}",
            origin.x,
            origin.y,
            angle.to_degrees(),
            speed
        );
        true
    }

    /// Snap the rope straight onto the best grip within `range` of `origin`,
    /// without a throw. Only from idle; the reach never exceeds the rope.
    pub fn grab_nearest_grip(
        &mut self,
        origin: Vec2,
        cache: &mut ChunkCache,
        range: f32,
    ) -> Option<Anchor> {
        if !self.is_idle() || !origin.is_finite() {
            return None;
        }
        let range = if range.is_finite() { range } else { 0.0 };
        let reach = range.min(self.max_length());
        let grip = cache.grip_to_grab(origin, reach, self.config.grab_above_weight)?;
        if grip.single_use {
            cache.consume_grip(grip.id);
        }
        let anchor = Anchor {
            point: grip.pos,
            normal: cache.terrain().surface_normal(grip.pos),
            surface: grip.surface,
            grip: Some(grip.id),
        };
        self.hook = Hook {
            pos: anchor.point,
            vel: Vec2::ZERO,
        };
        self.state = RopeState::Anchored(anchor);
        self.lay_out(origin, anchor.point);
        log::debug!(
            "Grabbed {:?} grip at ({:.1}, {:.1})",
            anchor.surface,
            anchor.point.x,
            anchor.point.y
        );
        Some(anchor)
    }

    /// Let go: pins are released and the rope reels in next step
    pub fn retract(&mut self) {
        if self.is_idle() {
            return;
        }
        for p in &mut self.points {
            p.pinned = false;
        }
        self.state = RopeState::Retracting;
    }

    /// Advance one step
    pub fn update(&mut self, step: RopeStep, cache: &mut ChunkCache) -> Option<RopeEvent> {
        match self.state {
            RopeState::Idle => {
                self.reset_points(step.origin);
                None
            }
            RopeState::Retracting => {
                self.state = RopeState::Idle;
                self.reset_points(step.origin);
                None
            }
            RopeState::Thrown => self.fly(step, cache),
            RopeState::Anchored(anchor) => {
                self.swing(step, anchor.point);
                None
            }
        }
    }

    fn fly(&mut self, step: RopeStep, cache: &mut ChunkCache) -> Option<RopeEvent> {
        let c = &self.config;
        let dt = step.dt;
        let terrain = cache.terrain();
        let depth = |p: Vec2| terrain.solid_depth(p);

        self.hook.vel.y -= step.gravity * c.hook_gravity_scale * dt;
        self.hook.vel.x += step.wind * c.hook_wind * dt;
        self.hook.vel.x *= c.hook_drag;

        // A climber pressed against rock can throw from just inside it:
        // into the rock sticks right there, away from it starts at the face
        let mut from = self.hook.pos;
        let mut contact = None;
        if depth(from) > 0.0 {
            let normal = terrain.surface_normal(from);
            if let Some(surface) = escape_surface(from, normal, TILE_SIZE * 2.0, &depth) {
                if self.hook.vel.dot(normal) < 0.0 {
                    contact = Some(SurfaceContact {
                        point: surface,
                        normal,
                    });
                } else {
                    from = surface;
                }
            }
        }

        let to = from + self.hook.vel * dt;
        if !to.is_finite() {
            self.abort_throw(step.origin);
            return Some(RopeEvent::OutOfRange);
        }
        if contact.is_none() {
            contact = find_contact(from, to, TILE_SIZE * 0.5, &depth);
        }
        let path_end = contact.map_or(to, |hit| hit.point);

        // Grips along the path win over bare rock
        let reach = c.hook_radius.max(0.0);
        let samples = ((from.distance(path_end) / reach.max(1.0)).ceil() as usize).clamp(1, 64);
        let grip = (1..=samples)
            .map(|i| from.lerp(path_end, i as f32 / samples as f32))
            .find_map(|p| cache.grip_near(p, reach));

        let anchor = if let Some(grip) = grip {
            if grip.single_use {
                cache.consume_grip(grip.id);
            }
            Some(Anchor {
                point: grip.pos,
                normal: cache.terrain().surface_normal(grip.pos),
                surface: grip.surface,
                grip: Some(grip.id),
            })
        } else {
            contact.map(|hit| Anchor {
                point: hit.point,
                normal: hit.normal,
                surface: cache.terrain().surface_kind_at(hit.point),
                grip: None,
            })
        };

        if let Some(anchor) = anchor {
            self.hook = Hook {
                pos: anchor.point,
                vel: Vec2::ZERO,
            };
            self.state = RopeState::Anchored(anchor);
            self.lay_out(step.origin, anchor.point);
            log::debug!(
                "Hook anchored at ({:.1}, {:.1}) on {:?}{}",
                anchor.point.x,
                anchor.point.y,
                anchor.surface,
                if anchor.grip.is_some() { " grip" } else { "" }
            );
            return Some(RopeEvent::Anchored(anchor));
        }

        self.hook.pos = to;
        let range = self.max_length() * self.config.max_range_factor;
        if to.distance(step.origin) > range {
            log::debug!(
                "Hook out of range ({:.0} > {:.0}), retracting",
                to.distance(step.origin),
                range
            );
            self.abort_throw(step.origin);
            return Some(RopeEvent::OutOfRange);
        }
        self.lay_out(step.origin, to);
        None
    }

    /// Stick the rope to `anchor` without a throw
    #[cfg(test)]
    pub(crate) fn attach(&mut self, origin: Vec2, anchor: Anchor) {
        self.hook = Hook {
            pos: anchor.point,
            vel: Vec2::ZERO,
        };
        self.state = RopeState::Anchored(anchor);
        self.lay_out(origin, anchor.point);
    }

    fn abort_throw(&mut self, origin: Vec2) {
        self.state = RopeState::Idle;
        self.hook = Hook {
            pos: origin,
            vel: Vec2::ZERO,
        };
        self.reset_points(origin);
    }

    /// Spread the points on the straight line `from -> to`, at rest
    fn lay_out(&mut self, from: Vec2, to: Vec2) {
        let n = self.segment_count() as f32;
        for (i, p) in self.points.iter_mut().enumerate() {
            *p = RopePoint::at(from.lerp(to, i as f32 / n));
        }
    }

    fn pin_ends(&mut self, origin: Vec2, anchor: Vec2) {
        let last = self.segment_count();
        self.points[0] = RopePoint {
            pos: origin,
            prev: origin,
            pinned: true,
        };
        self.points[last] = RopePoint {
            pos: anchor,
            prev: anchor,
            pinned: true,
        };
    }

    fn swing(&mut self, step: RopeStep, anchor: Vec2) {
        let c = &self.config;
        let n = self.segment_count();
        let dt2 = step.dt * step.dt;
        let rest = c.segment_length;
        let gravity = Vec2::new(0.0, -step.gravity * c.gravity_scale);
        let sway = step.wind * c.wind_sway;
        let damping = c.damping;
        let passes = c.relaxation_passes.max(1) as usize;

        self.pin_ends(step.origin, anchor);

        for (i, p) in self.points.iter_mut().enumerate() {
            if p.pinned {
                continue;
            }
            let from_anchor = (n - i) as f32 / n as f32;
            let accel = gravity + Vec2::new(sway * from_anchor, 0.0);
            let vel = (p.pos - p.prev) * damping;
            p.prev = p.pos;
            p.pos += vel + accel * dt2;
        }

        // Nearly taut: any bend would stretch a segment, lay it straight
        let span = step.origin.distance(anchor);
        if span >= rest * n as f32 * TAUT_FRACTION {
            for i in 1..n {
                self.points[i].pos = step.origin.lerp(anchor, i as f32 / n as f32);
            }
            return;
        }

        // Sweep in from the anchor, then out from the player. The player
        // end can move a long way in one step, so keep sweeping until the
        // last segment closes as well.
        for pass in 0..passes * MAX_PASS_FACTOR {
            for i in (1..n).rev() {
                let next = self.points[i + 1].pos;
                self.points[i].pos = next + toward(next, self.points[i].pos) * rest;
            }
            for i in 1..n {
                let prev = self.points[i - 1].pos;
                self.points[i].pos = prev + toward(prev, self.points[i].pos) * rest;
            }
            let gap = (self.points[n - 1].pos.distance(anchor) - rest).abs();
            if gap <= rest * CLOSE_TOLERANCE {
                if pass + 1 >= passes {
                    break;
                }
            } else if pass + 1 == passes * MAX_PASS_FACTOR {
                self.hang_in_v(step.origin, anchor);
            }
        }
        self.pin_ends(step.origin, anchor);
    }

    /// Two straight legs meeting below the chord, every segment at rest
    /// length
    fn hang_in_v(&mut self, origin: Vec2, anchor: Vec2) {
        let n = self.segment_count();
        let k = n / 2;
        if k == 0 {
            return;
        }
        let rest = self.config.segment_length;
        let (a, b) = (k as f32 * rest, (n - k) as f32 * rest);
        let span = origin.distance(anchor).max(DIST_EPSILON);
        // Law of cosines: where the apex projects onto the chord
        let along = ((a * a - b * b + span * span) / (2.0 * span)).clamp(-a, a);
        let height = (a * a - along * along).max(0.0).sqrt();
        let axis = toward(origin, anchor);
        let side = if axis.perp().y > 0.0 { -axis.perp() } else { axis.perp() };
        let apex = origin + axis * along + side * height;
        for i in 1..n {
            self.points[i].pos = if i <= k {
                origin.lerp(apex, i as f32 / k as f32)
            } else {
                apex.lerp(anchor, (i - k) as f32 / (n - k) as f32)
            };
        }
    }

    pub fn snapshot(&self) -> RopeSnapshot {
        let phase = match self.state {
            RopeState::Idle => RopePhase::Idle,
            RopeState::Thrown => RopePhase::Thrown,
            RopeState::Anchored(_) => RopePhase::Anchored,
            RopeState::Retracting => RopePhase::Retracting,
        };
        RopeSnapshot {
            phase,
            hook: self.hook.pos,
            anchor: self.anchor().copied(),
            points: self.points.iter().map(|p| p.pos).collect(),
        }
    }
}
