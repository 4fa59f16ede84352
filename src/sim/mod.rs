//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG and coordinate hashing only
//! - Chunk contents depend on `(seed, cx, cy)` and nothing else
//! - No rendering or platform dependencies

pub mod cache;
pub mod camera;
pub mod chunk;
pub mod collision;
pub mod noise;
pub mod player;
pub mod rope;
pub mod sdf;
pub mod state;
pub mod terrain;
pub mod tick;
pub mod wind;

pub use cache::{ChunkCache, StreamReport};
pub use camera::Camera;
pub use chunk::{
    CampSite, Chunk, ChunkCoord, Grip, GripId, Loot, LootId, LootKind, Surface, TileKind,
};
pub use collision::{Aabb, SolidGrid};
pub use player::{Facing, Player, PlayerInput, PlayerSnapshot, PlayerState};
pub use rope::{Anchor, Rope, RopePhase, RopeSnapshot, RopeState};
pub use sdf::{SurfaceContact, find_contact};
pub use state::{ClimbEvent, ClimbState};
pub use terrain::Terrain;
pub use tick::{ThrowRequest, TickInput, tick};
pub use wind::Wind;
