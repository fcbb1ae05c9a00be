//! Data-driven game balance
//!
//! Every gameplay constant lives here so a JSON document can override it.
//! Missing fields fall back to the defaults below.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when balance data cannot be read or breaks an invariant.
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("lane range is empty (min {min} > max {max})")]
    EmptyLaneRange { min: i32, max: i32 },
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("track.maintain_count must be at least 1")]
    ZeroMaintainCount,
    #[error("track.variant_count must be at least 1")]
    ZeroSegmentVariants,
    #[error("quest required count range invalid (min {min}, max {max})")]
    QuestRange { min: u32, max: u32 },
    #[error("quest.base_reward must be positive")]
    ZeroQuestReward,
    #[error("{field} cost multiplier must exceed 1.0 (got {value})")]
    FlatCostCurve { field: &'static str, value: f32 },
}

/// Lane geometry shared by the player, traffic, targets and the spawner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneTuning {
    pub min_lane: i32,
    pub max_lane: i32,
    pub lane_width: f32,
}

impl Default for LaneTuning {
    fn default() -> Self {
        Self {
            min_lane: -2,
            max_lane: 2,
            lane_width: 3.5,
        }
    }
}

impl LaneTuning {
    /// Clamp a lane index into the playable range
    pub fn clamp(&self, lane: i32) -> i32 {
        lane.clamp(self.min_lane, self.max_lane)
    }

    pub fn contains(&self, lane: i32) -> bool {
        (self.min_lane..=self.max_lane).contains(&lane)
    }

    /// Lateral bounds of the outermost lane centers
    pub fn lateral_bounds(&self) -> (f32, f32) {
        (
            crate::lane_to_lateral(self.min_lane, self.lane_width),
            crate::lane_to_lateral(self.max_lane, self.lane_width),
        )
    }
}

/// Session sequencing delays and screen names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Ready -> Playing delay (seconds)
    pub start_delay: f32,
    /// GameOver -> end screen delay (seconds)
    pub end_screen_delay: f32,
    /// Upper bound on waiting for a notification subscriber after reload
    pub subscriber_wait_limit: f32,
    /// Poll period while waiting for a subscriber
    pub subscriber_poll_interval: f32,
    pub game_screen: String,
    pub end_screen: String,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            start_delay: 1.0,
            end_screen_delay: 3.0,
            subscriber_wait_limit: 2.0,
            subscriber_poll_interval: 0.1,
            game_screen: "GameScene".to_string(),
            end_screen: "GameOverScene".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackTuning {
    pub segment_length: f32,
    /// Segments kept ahead of the player
    pub maintain_count: u32,
    /// Forward coordinate of the first generated segment
    pub start_z: f32,
    /// Number of interchangeable segment variants
    pub variant_count: u32,
}

impl Default for TrackTuning {
    fn default() -> Self {
        Self {
            segment_length: 20.0,
            maintain_count: 3,
            start_z: -20.0,
            variant_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Seconds between spawns while Playing
    pub interval: f32,
    /// Seconds between state polls while not Playing
    pub idle_poll: f32,
    /// Probability of choosing the obstacle catalog over the target catalog
    pub obstacle_weight: f32,
    pub spawn_height: f32,
    /// Spawn distance used when no streaming window is available
    pub fallback_ahead: f32,
    /// Unstruck entities further than this behind the player are removed
    pub cull_behind: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            interval: 1.5,
            idle_poll: 1.0,
            obstacle_weight: 0.8,
            spawn_height: 0.5,
            fallback_ahead: 50.0,
            cull_behind: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficTuning {
    pub drive_force: f32,
    pub max_drive_speed: f32,
    /// +1 drives toward +z, -1 toward -z
    pub travel_direction: f32,
    pub correction_gain: f32,
    pub damping_gain: f32,
    /// Forward sensor ray length
    pub sensor_range: f32,
    /// Sideways sensor ray length used to validate lane changes
    pub lateral_sensor_range: f32,
    pub lane_change_interval: f32,
    pub lane_change_jitter: f32,
    pub lane_change_chance: f32,
    pub mass: f32,
    pub half_extents: Vec3,
}

impl Default for TrafficTuning {
    fn default() -> Self {
        Self {
            drive_force: 50.0,
            max_drive_speed: 5.0,
            travel_direction: 1.0,
            correction_gain: 20.0,
            damping_gain: 6.0,
            sensor_range: 6.0,
            lateral_sensor_range: 1.5,
            lane_change_interval: 2.0,
            lane_change_jitter: 0.5,
            lane_change_chance: 0.25,
            mass: 1.0,
            half_extents: Vec3::new(0.9, 0.5, 1.8),
        }
    }
}

/// Collectible target ("hero") behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetTuning {
    pub wander_speed: f32,
    pub wander_interval: f32,
    pub wander_jitter: f32,
    /// Direction stays fixed this long after a random change
    pub wander_lock: f32,
    /// Lock applied after stopping at an obstruction or the road edge
    pub blocked_lock: f32,
    pub sensor_range: f32,
    pub mass: f32,
    pub half_extents: Vec3,
}

impl Default for TargetTuning {
    fn default() -> Self {
        Self {
            wander_speed: 2.0,
            wander_interval: 2.0,
            wander_jitter: 0.5,
            wander_lock: 1.0,
            blocked_lock: 0.5,
            sensor_range: 1.5,
            mass: 1.0,
            half_extents: Vec3::new(0.4, 0.5, 0.4),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub move_force: f32,
    pub max_speed: f32,
    pub lane_change_speed: f32,
    pub mass: f32,
    pub half_extents: Vec3,
    pub start_position: Vec3,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_force: 200.0,
            max_speed: 10.0,
            lane_change_speed: 15.0,
            mass: 1.0,
            half_extents: Vec3::new(1.0, 0.75, 2.0),
            start_position: Vec3::new(0.0, 0.75, 0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestTuning {
    pub base_reward: u64,
    pub min_required: u32,
    pub max_required: u32,
}

impl Default for QuestTuning {
    fn default() -> Self {
        Self {
            base_reward: 1000,
            min_required: 1,
            max_required: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    pub obstacle_damage: u32,
    /// Currency lost on every obstacle contact, invincible or not
    pub obstacle_penalty: u64,
    pub target_hit_force: f32,
    pub obstacle_hit_force: f32,
    pub hit_direction: Vec3,
    /// Seconds a struck entity stays on the road before it is collected
    pub handoff_delay: f32,
    /// Visibility toggle period during invincibility
    pub blink_interval: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            obstacle_damage: 1,
            obstacle_penalty: 100,
            target_hit_force: 15.0,
            obstacle_hit_force: 20.0,
            hit_direction: Vec3::new(0.0, 2.0, 0.5),
            handoff_delay: 1.5,
            blink_interval: 0.1,
        }
    }
}

/// Cost curve and effect of one upgrade track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeCurve {
    pub base_cost: u64,
    pub cost_multiplier: f32,
    pub base_value: f32,
    pub per_level: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeTuning {
    pub max_hp: UpgradeCurve,
    pub invincibility: UpgradeCurve,
}

impl Default for UpgradeTuning {
    fn default() -> Self {
        Self {
            max_hp: UpgradeCurve {
                base_cost: 500,
                cost_multiplier: 1.5,
                base_value: 3.0,
                per_level: 1.0,
            },
            invincibility: UpgradeCurve {
                base_cost: 300,
                cost_multiplier: 1.5,
                base_value: 1.5,
                per_level: 0.3,
            },
        }
    }
}

/// Complete balance document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub lanes: LaneTuning,
    pub session: SessionTuning,
    pub track: TrackTuning,
    pub spawn: SpawnTuning,
    pub traffic: TrafficTuning,
    pub targets: TargetTuning,
    pub player: PlayerTuning,
    pub quest: QuestTuning,
    pub collision: CollisionTuning,
    pub upgrades: UpgradeTuning,
}

fn positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(TuningError::NotPositive { field, value })
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), TuningError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            min: 0.0,
            max: 1.0,
            value,
        })
    }
}

impl Tuning {
    /// Parse and validate a JSON balance document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load balance data from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    /// Check every cross-field invariant the simulation relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        let lanes = &self.lanes;
        if lanes.min_lane > lanes.max_lane {
            return Err(TuningError::EmptyLaneRange {
                min: lanes.min_lane,
                max: lanes.max_lane,
            });
        }
        positive("lanes.lane_width", lanes.lane_width)?;

        positive("session.subscriber_poll_interval", self.session.subscriber_poll_interval)?;

        positive("track.segment_length", self.track.segment_length)?;
        if self.track.maintain_count == 0 {
            return Err(TuningError::ZeroMaintainCount);
        }
        if self.track.variant_count == 0 {
            return Err(TuningError::ZeroSegmentVariants);
        }

        positive("spawn.interval", self.spawn.interval)?;
        positive("spawn.idle_poll", self.spawn.idle_poll)?;
        unit_interval("spawn.obstacle_weight", self.spawn.obstacle_weight)?;

        positive("traffic.mass", self.traffic.mass)?;
        positive("traffic.lane_change_interval", self.traffic.lane_change_interval)?;
        unit_interval("traffic.lane_change_chance", self.traffic.lane_change_chance)?;
        positive("targets.mass", self.targets.mass)?;
        positive("targets.wander_interval", self.targets.wander_interval)?;
        positive("player.mass", self.player.mass)?;

        let quest = &self.quest;
        if quest.min_required == 0 || quest.min_required > quest.max_required {
            return Err(TuningError::QuestRange {
                min: quest.min_required,
                max: quest.max_required,
            });
        }
        if quest.base_reward == 0 {
            return Err(TuningError::ZeroQuestReward);
        }

        positive("collision.blink_interval", self.collision.blink_interval)?;

        for (field, curve) in [
            ("upgrades.max_hp", &self.upgrades.max_hp),
            ("upgrades.invincibility", &self.upgrades.invincibility),
        ] {
            if curve.cost_multiplier <= 1.0 {
                return Err(TuningError::FlatCostCurve {
                    field,
                    value: curve.cost_multiplier,
                });
            }
        }

        Ok(())
    }
}
