//! Lane Rush - An endless-lane driving and collection game
//!
//! Core modules:
//! - `sim`: Simulation (session, track streaming, traffic AI, quests, collisions)
//! - `progression`: Persistent upgrade levels and lifetime currency
//! - `persistence`: Key-value save storage
//! - `platform`: Host services (scene transitions, input)
//! - `tuning`: Data-driven game balance

pub mod persistence;
pub mod platform;
pub mod progression;
pub mod sim;
pub mod tuning;

pub use progression::{ProgressionStore, UpgradeKind, UpgradeTrack};
pub use tuning::{Tuning, TuningError};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed physics timestep (50 Hz)
    pub const SIM_DT: f32 = 1.0 / 50.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest variable-tick delta accepted by a frame
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Downward acceleration applied to dynamic bodies (units/s²)
    pub const GRAVITY: f32 = -9.81;

    /// Where collected entities are parked while they wait for the end screen
    pub const HOLDING_AREA_Y: f32 = -1000.0;
}

/// Lateral (x) coordinate of a lane center
#[inline]
pub fn lane_to_lateral(lane: i32, lane_width: f32) -> f32 {
    lane as f32 * lane_width
}

/// World position on the road surface for a lane at a forward coordinate
#[inline]
pub fn lane_position(lane: i32, lane_width: f32, height: f32, z: f32) -> Vec3 {
    Vec3::new(lane_to_lateral(lane, lane_width), height, z)
}
