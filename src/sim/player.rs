//! Player vehicle steering
//!
//! Lane changes snap the lateral target; the fixed tick chases it with a
//! clamped velocity change and pushes forward up to the speed cap.

use glam::Vec3;

use super::physics::PhysicsWorld;
use super::state::{EntityId, SessionState};
use crate::lane_to_lateral;
use crate::tuning::{LaneTuning, PlayerTuning};

#[derive(Debug, Clone)]
pub struct PlayerController {
    entity: EntityId,
    tuning: PlayerTuning,
    lanes: LaneTuning,
    lane: i32,
    target_lateral: f32,
    enabled: bool,
}

impl PlayerController {
    pub fn new(entity: EntityId, tuning: &PlayerTuning, lanes: &LaneTuning) -> Self {
        let lane = lanes.clamp(0);
        Self {
            entity,
            tuning: tuning.clone(),
            lanes: lanes.clone(),
            lane,
            target_lateral: lane_to_lateral(lane, lanes.lane_width),
            enabled: true,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn lane(&self) -> i32 {
        self.lane
    }

    pub fn target_lateral(&self) -> f32 {
        self.target_lateral
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Back to the center lane with a fresh body reference
    pub fn reset(&mut self, entity: EntityId) {
        self.entity = entity;
        self.lane = self.lanes.clamp(0);
        self.target_lateral = lane_to_lateral(self.lane, self.lanes.lane_width);
        self.enabled = true;
    }

    /// Step one lane left (negative) or right (positive), clamped to the road
    pub fn change_lane(&mut self, step: i32) -> i32 {
        self.lane = self.lanes.clamp(self.lane + step.signum());
        self.target_lateral = lane_to_lateral(self.lane, self.lanes.lane_width);
        self.lane
    }

    pub fn fixed_tick(&mut self, state: SessionState, world: &mut PhysicsWorld) {
        if !self.enabled {
            return;
        }
        let Some(body) = world.get_mut(self.entity) else {
            log::error!("Player body {:?} missing, disabling player control", self.entity);
            self.enabled = false;
            return;
        };

        if state != SessionState::Playing {
            body.velocity = Vec3::ZERO;
            return;
        }

        let speed = self.tuning.lane_change_speed;
        let desired = (self.target_lateral - body.position.x) * speed;
        let change = (desired - body.velocity.x).clamp(-speed, speed);
        body.add_velocity_change(Vec3::new(change, 0.0, 0.0));

        if body.velocity.z < self.tuning.max_speed {
            body.add_force(Vec3::new(0.0, 0.0, self.tuning.move_force));
        }
    }
}
