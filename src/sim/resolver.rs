//! Player contact resolution
//!
//! Turns collision-enter events into economy, vitals and quest updates,
//! knocks the struck entity away and, after a short delay, parks it in the
//! holding area.

use std::collections::BTreeSet;

use glam::Vec3;

use super::collision::knockback_direction;
use super::physics::{Contact, PhysicsWorld};
use super::quest::{QuestCoordinator, QuestValidation};
use super::session::SessionStateMachine;
use super::state::{Category, EntityId, EntityKind};
use super::timer::{Countdown, Repeating};
use super::traffic::TrafficAgentController;
use super::wander::TargetWanderController;
use crate::consts::HOLDING_AREA_Y;
use crate::progression::ProgressionStore;
use crate::tuning::CollisionTuning;

/// Everything a contact can touch
pub struct Collaborators<'a> {
    pub session: &'a mut SessionStateMachine,
    pub progression: &'a mut ProgressionStore,
    pub quests: &'a mut QuestCoordinator,
    pub traffic: &'a mut TrafficAgentController,
    pub wander: &'a mut TargetWanderController,
    pub world: &'a mut PhysicsWorld,
}

/// What a contact did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Not Playing, already struck, or a category the resolver ignores
    Ignored,
    TargetStruck { quest: QuestValidation },
    ObstacleStruck { damaged: bool, game_over: bool },
}

#[derive(Debug, Clone, Copy)]
struct Handoff {
    entity: EntityId,
    category: Category,
    delay: Countdown,
}

/// Damage immunity after an obstacle hit, with its blink schedule
#[derive(Debug, Clone, Copy)]
struct InvincibilityWindow {
    toggles_left: u32,
    blink: Repeating,
}

#[derive(Debug)]
pub struct CollisionResolver {
    tuning: CollisionTuning,
    forward: Vec3,
    pending: Vec<Handoff>,
    struck: BTreeSet<EntityId>,
    invincibility: Option<InvincibilityWindow>,
    player_visible: bool,
    blink_toggles: u32,
}

impl CollisionResolver {
    pub fn new(tuning: &CollisionTuning) -> Self {
        Self {
            tuning: tuning.clone(),
            forward: Vec3::Z,
            pending: Vec::new(),
            struck: BTreeSet::new(),
            invincibility: None,
            player_visible: true,
            blink_toggles: 0,
        }
    }

    /// Forget everything from the previous scene
    pub fn reset(&mut self) {
        self.pending.clear();
        self.struck.clear();
        self.invincibility = None;
        self.player_visible = true;
        self.blink_toggles = 0;
    }

    pub fn is_invincible(&self) -> bool {
        self.invincibility.is_some()
    }

    /// Blink indicator state for the player's visuals
    pub fn player_visible(&self) -> bool {
        self.player_visible
    }

    /// Blink toggles since the last hit that opened a window
    pub fn blink_toggles(&self) -> u32 {
        self.blink_toggles
    }

    pub fn pending_handoffs(&self) -> usize {
        self.pending.len()
    }

    pub fn was_struck(&self, entity: EntityId) -> bool {
        self.struck.contains(&entity)
    }

    /// React to the player starting to touch another body
    pub fn resolve(&mut self, contact: Contact, kind: Option<EntityKind>, ctx: &mut Collaborators<'_>) -> Resolution {
        if !ctx.session.is_playing() || self.struck.contains(&contact.other) {
            return Resolution::Ignored;
        }

        match (contact.category, kind) {
            (Category::Target, Some(EntityKind::Target(target))) => {
                self.struck.insert(contact.other);
                // Read the variant before the entity is relocated
                let quest = ctx.quests.validate(target.variant_id(), ctx.session);
                self.knock_back(contact.other, self.tuning.target_hit_force, ctx.world);
                ctx.wander.mark_struck(contact.other);
                self.schedule_handoff(contact.other, Category::Target);
                Resolution::TargetStruck { quest }
            }
            (Category::Obstacle, Some(EntityKind::Obstacle { .. })) => {
                self.struck.insert(contact.other);
                ctx.session.lose_money(self.tuning.obstacle_penalty);

                let damaged = !self.is_invincible();
                let mut game_over = false;
                if damaged {
                    game_over = ctx.session.take_damage(self.tuning.obstacle_damage, ctx.progression);
                    self.start_invincibility(ctx.progression.invincibility_duration());
                }

                self.knock_back(contact.other, self.tuning.obstacle_hit_force, ctx.world);
                ctx.traffic.mark_hit(contact.other);
                self.schedule_handoff(contact.other, Category::Obstacle);
                Resolution::ObstacleStruck { damaged, game_over }
            }
            _ => Resolution::Ignored,
        }
    }

    /// Advance invincibility and hand-off timers. Returns the entities moved
    /// into the holding area this tick.
    pub fn tick(&mut self, dt: f32, session: &mut SessionStateMachine, world: &mut PhysicsWorld) -> Vec<EntityId> {
        self.tick_invincibility(dt);

        let mut parked = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut handoff in self.pending.drain(..) {
            if !handoff.delay.tick(dt) {
                still_pending.push(handoff);
                continue;
            }
            let Some(body) = world.get_mut(handoff.entity) else {
                continue;
            };
            body.position.y = HOLDING_AREA_Y;
            body.make_kinematic();

            let holding = session.holding_area_mut();
            match handoff.category {
                Category::Target => holding.push_target(handoff.entity),
                _ => holding.push_obstacle(handoff.entity),
            }
            parked.push(handoff.entity);
        }
        self.pending = still_pending;
        parked
    }

    fn knock_back(&self, entity: EntityId, force: f32, world: &mut PhysicsWorld) {
        if let Some(body) = world.get_mut(entity) {
            let dir = knockback_direction(self.tuning.hit_direction, self.forward);
            body.add_velocity_change(dir * force);
        }
    }

    fn schedule_handoff(&mut self, entity: EntityId, category: Category) {
        self.pending.push(Handoff {
            entity,
            category,
            delay: Countdown::new(self.tuning.handoff_delay),
        });
    }

    fn start_invincibility(&mut self, duration: f32) {
        let toggles = (duration / self.tuning.blink_interval).round().max(1.0) as u32;
        log::debug!("Invincible for {:.1}s ({} blinks)", duration, toggles);
        self.invincibility = Some(InvincibilityWindow {
            toggles_left: toggles,
            blink: Repeating::new(self.tuning.blink_interval),
        });
        self.player_visible = true;
        self.blink_toggles = 0;
    }

    fn tick_invincibility(&mut self, dt: f32) {
        let Some(window) = self.invincibility.as_mut() else {
            return;
        };
        for _ in 0..window.blink.tick(dt) {
            window.toggles_left -= 1;
            self.blink_toggles += 1;
            self.player_visible = !self.player_visible;
            if window.toggles_left == 0 {
                self.player_visible = true;
                self.invincibility = None;
                return;
            }
        }
    }
}
