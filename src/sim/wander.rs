//! Sideways wandering for spawned targets
//!
//! Targets shuffle left and right across the road on the variable tick. The
//! direction is re-rolled on a jittered interval and held for a short lock
//! after every change; running into something or reaching the outer lanes
//! stops the target.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use super::physics::PhysicsWorld;
use super::state::{EntityId, SessionState};
use crate::tuning::{LaneTuning, TargetTuning};

/// Slack kept from the outer lane centers
const EDGE_MARGIN: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wanderer {
    pub entity: EntityId,
    /// -1 left, 0 standing, 1 right
    direction: i32,
    direction_timer: f32,
    lock_timer: f32,
    struck: bool,
}

impl Wanderer {
    pub fn direction(&self) -> i32 {
        self.direction
    }

    pub fn is_struck(&self) -> bool {
        self.struck
    }
}

#[derive(Debug)]
pub struct TargetWanderController {
    tuning: TargetTuning,
    bounds: (f32, f32),
    wanderers: BTreeMap<EntityId, Wanderer>,
    rng: Pcg32,
}

impl TargetWanderController {
    pub fn new(tuning: &TargetTuning, lanes: &LaneTuning, rng: Pcg32) -> Self {
        Self {
            tuning: tuning.clone(),
            bounds: lanes.lateral_bounds(),
            wanderers: BTreeMap::new(),
            rng,
        }
    }

    /// Start wandering in a random direction
    pub fn add_target(&mut self, entity: EntityId) {
        let direction = self.rng.random_range(-1..=1);
        self.wanderers.insert(
            entity,
            Wanderer {
                entity,
                direction,
                direction_timer: self.tuning.wander_interval,
                lock_timer: 0.0,
                struck: false,
            },
        );
    }

    pub fn remove_target(&mut self, entity: EntityId) {
        self.wanderers.remove(&entity);
    }

    pub fn clear(&mut self) {
        self.wanderers.clear();
    }

    pub fn wanderer(&self, entity: EntityId) -> Option<&Wanderer> {
        self.wanderers.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.wanderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wanderers.is_empty()
    }

    /// The target was hit by the player and no longer walks
    pub fn mark_struck(&mut self, entity: EntityId) {
        if let Some(w) = self.wanderers.get_mut(&entity) {
            w.struck = true;
            w.direction = 0;
        }
    }

    pub fn tick(&mut self, dt: f32, state: SessionState, world: &mut PhysicsWorld) {
        if state != SessionState::Playing {
            return;
        }
        let Self {
            tuning,
            bounds,
            wanderers,
            rng,
        } = self;
        let (min_x, max_x) = *bounds;

        for w in wanderers.values_mut() {
            if w.struck {
                continue;
            }

            if w.lock_timer > 0.0 {
                w.lock_timer -= dt;
            }
            w.direction_timer -= dt;
            if w.direction_timer <= 0.0 && w.lock_timer <= 0.0 {
                w.direction = rng.random_range(-1..=1);
                w.lock_timer = tuning.wander_lock;
                let jitter = if tuning.wander_jitter > 0.0 {
                    rng.random_range(-tuning.wander_jitter..tuning.wander_jitter)
                } else {
                    0.0
                };
                w.direction_timer = tuning.wander_interval + jitter;
            }

            if w.direction == 0 {
                continue;
            }
            let Some(body) = world.get(w.entity) else {
                continue;
            };
            let position = body.position;
            let side = Vec3::X * w.direction as f32;

            let blocked = world
                .raycast(position, side, tuning.sensor_range, w.entity)
                .is_some();
            let at_edge = (w.direction < 0 && position.x <= min_x + EDGE_MARGIN)
                || (w.direction > 0 && position.x >= max_x - EDGE_MARGIN);
            if blocked || at_edge {
                w.direction = 0;
                w.lock_timer = tuning.blocked_lock;
                continue;
            }

            if let Some(body) = world.get_mut(w.entity) {
                body.position.x += w.direction as f32 * tuning.wander_speed * dt;
            }
        }
    }
}
