//! Fixed timestep simulation tick
//!
//! Order per step: input, rope action, rope update, player, camera, chunk
//! streaming.

use super::chunk::Surface;
use super::player::{Forces, PlayerInput};
use super::rope::{RopeEvent, RopeState, RopeStep};
use super::state::{ClimbEvent, ClimbState};

/// A throw of the hook
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowRequest {
    /// Radians, counter-clockwise from +x
    pub angle: f32,
    /// 0 to 1
    pub power: f32,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone)]
pub struct TickInput {
    /// Horizontal intent, -1 (left) to 1 (right)
    pub move_x: f32,
    /// Jump off the ground, or let go of the rope
    pub jump: bool,
    /// Throw the hook (ignored unless the rope is idle)
    pub throw: Option<ThrowRequest>,
    /// Reel the rope in
    pub retract: bool,
    /// Grab the best grip in reach (ignored unless the rope is idle)
    pub grab: bool,
    /// Grip strength from gear, 1.0 = none
    pub grip_multiplier: f32,
    /// Idle/demo mode - autopilot climbs
    pub idle_mode: bool,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            move_x: 0.0,
            jump: false,
            throw: None,
            retract: false,
            grab: false,
            grip_multiplier: 1.0,
            idle_mode: false,
        }
    }
}

/// Advance the climb by one fixed timestep
pub fn tick(state: &mut ClimbState, input: &TickInput, dt: f32) {
    state.events.clear();
    if state.player.dead {
        return;
    }
    state.time_ticks += 1;

    let input = if input.idle_mode {
        autopilot(state)
    } else {
        input.clone()
    };

    let tuning = &state.tuning;
    state.wind.update(&tuning.wind, state.player.altitude());
    let wind = state.wind.speed();
    let origin = state.player.rope_origin(&tuning.player);

    // Rope action
    if input.retract {
        state.rope.retract();
    }
    if let Some(throw) = input.throw {
        state.rope.throw(origin, throw.angle, throw.power);
    }
    let player_input = PlayerInput {
        move_x: input.move_x,
        jump: input.jump,
        grip_multiplier: input.grip_multiplier,
    };
    let grip = player_input.grip_strength();
    if input.grab {
        let range = tuning.rope.grab_range * grip;
        if let Some(anchor) = state.rope.grab_nearest_grip(origin, &mut state.cache, range) {
            state.events.push(ClimbEvent::HookAnchored {
                point: anchor.point,
                on_grip: true,
            });
            if let Some(id) = anchor.grip {
                let stamina_cost = match anchor.surface {
                    Surface::Ice if grip > 0.0 => tuning.player.ice_grab_stamina / grip,
                    Surface::Ice => tuning.player.ice_grab_stamina,
                    Surface::Rock => 0.0,
                };
                state.events.push(ClimbEvent::GripGrabbed {
                    id,
                    surface: anchor.surface,
                    stamina_cost,
                });
            }
        }
    }

    // Rope against terrain
    let rope_step = RopeStep {
        origin,
        gravity: tuning.gravity,
        wind,
        dt,
    };
    match state.rope.update(rope_step, &mut state.cache) {
        Some(RopeEvent::Anchored(anchor)) => state.events.push(ClimbEvent::HookAnchored {
            point: anchor.point,
            on_grip: anchor.grip.is_some(),
        }),
        Some(RopeEvent::OutOfRange) => state.events.push(ClimbEvent::HookOutOfRange),
        None => {}
    }

    // Player
    let forces = Forces {
        gravity: tuning.gravity,
        wind,
        dt,
    };
    state.player.update(
        &tuning.player,
        &player_input,
        forces,
        &mut state.rope,
        &mut state.cache,
        &mut state.events,
    );

    // Camera and streaming
    let focus = state.player.rope_origin(&tuning.player);
    state.camera.follow(focus, &tuning.camera);
    let (low, high) = state.camera.visible_range(&tuning.camera);
    state.cache.ensure_at(state.camera.pos.x, low, high);
}

/// Demo climber: throw upward toward the nearer wall, pump the swing, let
/// go near the top of the arc
fn autopilot(state: &ClimbState) -> TickInput {
    let player = &state.player;
    let config = &state.tuning.player;
    let origin = player.rope_origin(config);
    let mut input = TickInput::default();

    match state.rope.state() {
        RopeState::Idle => {
            let (left, right) = state.terrain().walls_at(origin.y);
            let toward_right = (right - origin.x) < (origin.x - left);
            let lean = if toward_right { -0.45 } else { 0.45 };
            // Alternate the lean a little so a bad anchor spot isn't retried forever
            let wobble = if (state.time_ticks / 120) % 2 == 0 { 0.0 } else { 0.2 };
            input.throw = Some(ThrowRequest {
                angle: std::f32::consts::FRAC_PI_2 + lean + wobble,
                power: 1.0,
            });
            input.move_x = if toward_right { 0.3 } else { -0.3 };
        }
        RopeState::Thrown | RopeState::Retracting => {}
        RopeState::Anchored(anchor) => {
            let above = origin.y > anchor.point.y - state.tuning.rope.segment_length * 2.0;
            if above && player.vel.y > 0.0 {
                input.jump = true;
            } else if player.vel.x.abs() > 1.0 {
                input.move_x = player.vel.x.signum();
            } else {
                input.move_x = if anchor.point.x > origin.x { 1.0 } else { -1.0 };
            }
        }
    }
    input
}
