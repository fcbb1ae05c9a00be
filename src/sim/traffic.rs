//! Traffic agent steering
//!
//! Each agent drives forward, holds its lane with a damped spring, swerves
//! around anything blocking its forward sensor, and occasionally changes lane
//! on its own. Once struck by the player an agent is permanently inert: the
//! physics body keeps flying but the controller never touches it again.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use super::physics::PhysicsWorld;
use super::state::{EntityId, SessionState};
use crate::lane_to_lateral;
use crate::tuning::{LaneTuning, TrafficTuning};

/// Steering state for one agent. The body itself lives in the physics world.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficAgent {
    pub entity: EntityId,
    lane: i32,
    target_lateral: f32,
    hit: bool,
    lane_change_timer: f32,
}

impl TrafficAgent {
    pub fn lane(&self) -> i32 {
        self.lane
    }

    pub fn target_lateral(&self) -> f32 {
        self.target_lateral
    }

    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn lane_change_timer(&self) -> f32 {
        self.lane_change_timer
    }
}

#[derive(Debug)]
pub struct TrafficAgentController {
    tuning: TrafficTuning,
    lanes: LaneTuning,
    agents: BTreeMap<EntityId, TrafficAgent>,
    rng: Pcg32,
}

impl TrafficAgentController {
    pub fn new(tuning: &TrafficTuning, lanes: &LaneTuning, rng: Pcg32) -> Self {
        Self {
            tuning: tuning.clone(),
            lanes: lanes.clone(),
            agents: BTreeMap::new(),
            rng,
        }
    }

    /// Start steering a spawned body
    pub fn add_agent(&mut self, entity: EntityId, lane: i32) {
        let lane = self.lanes.clamp(lane);
        self.agents.insert(
            entity,
            TrafficAgent {
                entity,
                lane,
                target_lateral: lane_to_lateral(lane, self.lanes.lane_width),
                hit: false,
                lane_change_timer: self.tuning.lane_change_interval,
            },
        );
    }

    pub fn remove_agent(&mut self, entity: EntityId) -> Option<TrafficAgent> {
        self.agents.remove(&entity)
    }

    pub fn clear(&mut self) {
        self.agents.clear();
    }

    pub fn agent(&self, entity: EntityId) -> Option<&TrafficAgent> {
        self.agents.get(&entity)
    }

    pub fn agents(&self) -> impl Iterator<Item = &TrafficAgent> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Revoke AI control for good. Returns false if the agent is unknown.
    pub fn mark_hit(&mut self, entity: EntityId) -> bool {
        match self.agents.get_mut(&entity) {
            Some(agent) => {
                agent.hit = true;
                true
            }
            None => false,
        }
    }

    /// Attempt a lane change without driving (used by tests and host tools)
    pub fn request_lane_change(&mut self, entity: EntityId, direction: i32, world: &PhysicsWorld) -> bool {
        let Self {
            tuning,
            lanes,
            agents,
            ..
        } = self;
        match agents.get_mut(&entity) {
            Some(agent) if !agent.hit => try_change_lane(agent, direction, tuning, lanes, world),
            _ => false,
        }
    }

    /// Apply steering forces for one fixed physics step
    pub fn fixed_tick(&mut self, dt: f32, state: SessionState, world: &mut PhysicsWorld) {
        let Self {
            tuning,
            lanes,
            agents,
            rng,
        } = self;

        let direction = if tuning.travel_direction < 0.0 { -1.0 } else { 1.0 };
        let forward = Vec3::Z * direction;

        for agent in agents.values_mut() {
            if agent.hit {
                continue;
            }
            let Some(body) = world.get(agent.entity) else {
                continue;
            };
            let (position, velocity) = (body.position, body.velocity);

            if state != SessionState::Playing {
                // Hold still while the session is not running
                if let Some(body) = world.get_mut(agent.entity) {
                    body.velocity = Vec3::ZERO;
                }
                continue;
            }

            let forward_speed = velocity.dot(forward);
            let mut drive = forward_speed < tuning.max_drive_speed;

            // Reactive avoidance, sensing from the lane the agent is heading
            // for so a swerve in progress is not re-triggered by the same blocker
            let sensor_origin = Vec3::new(agent.target_lateral, position.y, position.z);
            let blocked = world
                .raycast(sensor_origin, forward, tuning.sensor_range, agent.entity)
                .is_some_and(|hit| hit.category.blocks_traffic());
            let mut brake = false;
            if blocked {
                let first = if rng.random_bool(0.5) { 1 } else { -1 };
                let swerved = try_change_lane(agent, first, tuning, lanes, world)
                    || try_change_lane(agent, -first, tuning, lanes, world);
                if !swerved {
                    drive = false;
                    brake = forward_speed > 0.0;
                }
            }

            // Scheduled lane change
            agent.lane_change_timer -= dt;
            if agent.lane_change_timer <= 0.0 {
                if rng.random_bool(tuning.lane_change_chance as f64) {
                    let side = if rng.random_bool(0.5) { 1 } else { -1 };
                    try_change_lane(agent, side, tuning, lanes, world);
                }
                let jitter = if tuning.lane_change_jitter > 0.0 {
                    rng.random_range(-tuning.lane_change_jitter..=tuning.lane_change_jitter)
                } else {
                    0.0
                };
                agent.lane_change_timer = tuning.lane_change_interval + jitter;
            }

            let lateral = (agent.target_lateral - position.x) * tuning.correction_gain
                - velocity.x * tuning.damping_gain;
            let longitudinal = if drive { tuning.drive_force * direction } else { 0.0 };

            if let Some(body) = world.get_mut(agent.entity) {
                body.add_force(Vec3::new(lateral, 0.0, longitudinal));
                if brake {
                    body.add_velocity_change(-forward * forward_speed);
                }
            }
        }
    }
}

/// Move an agent one lane over if the lane exists and the side sensor is clear
fn try_change_lane(
    agent: &mut TrafficAgent,
    direction: i32,
    tuning: &TrafficTuning,
    lanes: &LaneTuning,
    world: &PhysicsWorld,
) -> bool {
    let candidate = agent.lane + direction.signum();
    if direction == 0 || !lanes.contains(candidate) {
        return false;
    }
    let Some(body) = world.get(agent.entity) else {
        return false;
    };
    let side = Vec3::X * direction.signum() as f32;
    if world
        .raycast(body.position, side, tuning.lateral_sensor_range + body.half_extents.x, agent.entity)
        .is_some()
    {
        return false;
    }

    agent.lane = candidate;
    agent.target_lateral = lane_to_lateral(candidate, lanes.lane_width);
    true
}
