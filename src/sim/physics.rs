//! Minimal rigid-body world
//!
//! Just enough physics for the lane game: box bodies, accumulated forces,
//! gravity onto a flat ground plane, sensor rays and contact-enter events.
//! Bodies are stored by id so iteration order is stable.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;

use super::collision::{aabb_overlap, ray_aabb};
use super::state::{Category, EntityId};
use crate::consts::GRAVITY;

/// A physics body
#[derive(Debug, Clone)]
pub struct Body {
    pub id: EntityId,
    pub category: Category,
    pub position: Vec3,
    pub velocity: Vec3,
    pub half_extents: Vec3,
    pub mass: f32,
    /// Kinematic bodies ignore forces, gravity and contacts
    pub kinematic: bool,
    force: Vec3,
}

impl Body {
    pub fn new(id: EntityId, category: Category, position: Vec3, half_extents: Vec3, mass: f32) -> Self {
        Self {
            id,
            category,
            position,
            velocity: Vec3::ZERO,
            half_extents,
            mass,
            kinematic: false,
            force: Vec3::ZERO,
        }
    }

    /// Accumulate a force for the next integration step
    pub fn add_force(&mut self, force: Vec3) {
        if !self.kinematic {
            self.force += force;
        }
    }

    /// Instant velocity change, independent of mass
    pub fn add_velocity_change(&mut self, delta: Vec3) {
        if !self.kinematic {
            self.velocity += delta;
        }
    }

    /// Force accumulated since the last step
    pub fn pending_force(&self) -> Vec3 {
        self.force
    }

    /// Stop all motion and detach from the simulation
    pub fn make_kinematic(&mut self) {
        self.kinematic = true;
        self.velocity = Vec3::ZERO;
        self.force = Vec3::ZERO;
    }

    fn integrate(&mut self, dt: f32) {
        if self.kinematic {
            return;
        }
        let accel = self.force / self.mass.max(f32::EPSILON) + Vec3::new(0.0, GRAVITY, 0.0);
        self.velocity += accel * dt;
        self.position += self.velocity * dt;
        self.force = Vec3::ZERO;

        // Rest on the ground plane
        let floor = self.half_extents.y;
        if self.position.y < floor {
            self.position.y = floor;
            if self.velocity.y < 0.0 {
                self.velocity.y = 0.0;
            }
        }
    }
}

/// Nearest body reported by a sensor ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: EntityId,
    pub category: Category,
    pub distance: f32,
}

/// A newly begun contact between the subject and another body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub other: EntityId,
    pub category: Category,
}

#[derive(Debug, Default)]
pub struct PhysicsWorld {
    bodies: BTreeMap<EntityId, Body>,
    touching: BTreeSet<(EntityId, EntityId)>,
    steps: u64,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: Body) {
        self.bodies.insert(body.id, body);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Body> {
        self.touching.retain(|(a, b)| *a != id && *b != id);
        self.bodies.remove(&id)
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.touching.clear();
    }

    pub fn get(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.bodies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    /// Number of completed fixed steps
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Integrate every dynamic body by one fixed step
    pub fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            body.integrate(dt);
        }
        self.steps += 1;
    }

    /// Nearest non-kinematic body along a ray, ignoring `exclude`
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32, exclude: EntityId) -> Option<RayHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        self.bodies
            .values()
            .filter(|b| b.id != exclude && !b.kinematic)
            .filter_map(|b| {
                let result = ray_aabb(origin, dir, max_distance, b.position, b.half_extents);
                result.hit.then_some(RayHit {
                    entity: b.id,
                    category: b.category,
                    distance: result.distance,
                })
            })
            .min_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Bodies that started overlapping `subject` since the last call
    ///
    /// Only the enter edge is reported; a contact must separate before it
    /// can be reported again.
    pub fn begin_contacts(&mut self, subject: EntityId) -> Vec<Contact> {
        let Some(me) = self.bodies.get(&subject) else {
            return Vec::new();
        };
        let (center, half) = (me.position, me.half_extents);

        let mut began = Vec::new();
        let mut still_touching = BTreeSet::new();
        for other in self.bodies.values() {
            if other.id == subject || other.kinematic {
                continue;
            }
            if aabb_overlap(center, half, other.position, other.half_extents) {
                let pair = (subject, other.id);
                still_touching.insert(pair);
                if !self.touching.contains(&pair) {
                    began.push(Contact {
                        other: other.id,
                        category: other.category,
                    });
                }
            }
        }

        self.touching.retain(|(a, _)| *a != subject);
        self.touching.extend(still_touching);
        began
    }
}
