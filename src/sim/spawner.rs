//! Periodic traffic/target placement ahead of the player

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{Catalog, Category, SessionState};
use super::timer::Countdown;
use crate::lane_position;
use crate::tuning::{LaneTuning, SpawnTuning};

/// A placement decided by the scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub category: Category,
    pub variant_id: u32,
    pub lane: i32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Not Playing: poll the session state at low frequency
    Idle(Countdown),
    /// Playing: spawn whenever the countdown elapses
    Spawning(Countdown),
}

#[derive(Debug)]
pub struct SpawnScheduler {
    tuning: SpawnTuning,
    lanes: LaneTuning,
    phase: Phase,
    rng: Pcg32,
}

impl SpawnScheduler {
    pub fn new(tuning: &SpawnTuning, lanes: &LaneTuning, rng: Pcg32) -> Self {
        Self {
            tuning: tuning.clone(),
            lanes: lanes.clone(),
            phase: Phase::Idle(Countdown::new(0.0)),
            rng,
        }
    }

    /// Back to idle polling (scene rebuilt)
    pub fn reset(&mut self) {
        self.phase = Phase::Idle(Countdown::new(0.0));
    }

    /// Advance the schedule. `window` is the streaming window length, if a
    /// track is available.
    pub fn tick(
        &mut self,
        dt: f32,
        state: SessionState,
        player_z: f32,
        window: Option<f32>,
        catalog: &Catalog,
    ) -> Option<SpawnRequest> {
        let playing = state == SessionState::Playing;

        match self.phase {
            Phase::Idle(mut poll) => {
                if !poll.tick(dt) {
                    self.phase = Phase::Idle(poll);
                    return None;
                }
                if !playing {
                    self.phase = Phase::Idle(Countdown::new(self.tuning.idle_poll));
                    return None;
                }
                // First spawn right after Playing is observed
                self.phase = Phase::Spawning(Countdown::new(self.tuning.interval));
                self.spawn(player_z, window, catalog)
            }
            Phase::Spawning(mut next) => {
                if !playing {
                    self.phase = Phase::Idle(Countdown::new(self.tuning.idle_poll));
                    return None;
                }
                if !next.tick(dt) {
                    self.phase = Phase::Spawning(next);
                    return None;
                }
                self.phase = Phase::Spawning(Countdown::new(self.tuning.interval));
                self.spawn(player_z, window, catalog)
            }
        }
    }

    fn spawn(&mut self, player_z: f32, window: Option<f32>, catalog: &Catalog) -> Option<SpawnRequest> {
        let ahead = window.unwrap_or(self.tuning.fallback_ahead);
        let spawn_z = player_z + ahead;

        let (category, variants) = if self.rng.random_bool(self.tuning.obstacle_weight as f64) {
            (Category::Obstacle, &catalog.obstacles)
        } else {
            (Category::Target, &catalog.targets)
        };
        if variants.is_empty() {
            return None;
        }

        let lane = self.rng.random_range(self.lanes.min_lane..=self.lanes.max_lane);
        let variant = &variants[self.rng.random_range(0..variants.len())];

        Some(SpawnRequest {
            category,
            variant_id: variant.id,
            lane,
            position: lane_position(lane, self.lanes.lane_width, self.tuning.spawn_height, spawn_z),
        })
    }
}
