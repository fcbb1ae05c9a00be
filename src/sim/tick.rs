//! Simulation context and frame loop
//!
//! One `Simulation` owns every subsystem and the physics world. The host
//! calls [`Simulation::frame`] once per rendered frame; physics runs on a
//! fixed step behind an accumulator.

use std::collections::BTreeMap;

use glam::Vec3;

use super::physics::{Body, PhysicsWorld};
use super::player::PlayerController;
use super::quest::QuestCoordinator;
use super::resolver::{Collaborators, CollisionResolver, Resolution};
use super::session::{SessionSignal, SessionStateMachine};
use super::spawner::{SpawnRequest, SpawnScheduler};
use super::state::{Catalog, Category, EntityId, EntityKind, SessionState, TargetEntity, subsystem_rng};
use super::track::TrackStreamer;
use super::traffic::TrafficAgentController;
use super::wander::TargetWanderController;
use crate::consts::*;
use crate::lane_position;
use crate::persistence::KeyValueStore;
use crate::platform::{FrameInput, SceneLoader};
use crate::progression::{ProgressionStore, PurchaseOutcome, UpgradeKind};
use crate::tuning::{Tuning, TuningError};

// RNG streams, one per subsystem
const STREAM_TRACK: u64 = 0;
const STREAM_SPAWN: u64 = 1;
const STREAM_TRAFFIC: u64 = 2;
const STREAM_WANDER: u64 = 3;
const STREAM_QUEST: u64 = 4;

pub struct Simulation {
    tuning: Tuning,
    catalog: Catalog,
    session: SessionStateMachine,
    progression: ProgressionStore,
    track: TrackStreamer,
    spawner: SpawnScheduler,
    traffic: TrafficAgentController,
    wander: TargetWanderController,
    quests: QuestCoordinator,
    resolver: CollisionResolver,
    player: PlayerController,
    world: PhysicsWorld,
    entities: BTreeMap<EntityId, EntityKind>,
    next_entity: u32,
    scenes: Box<dyn SceneLoader>,
    accumulator: f32,
    frames: u64,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.session.state())
            .field("ledger", self.session.ledger())
            .field("entities", &self.entities.len())
            .field("frames", &self.frames)
            .finish()
    }
}

impl Simulation {
    /// Build a session in Ready with the scene laid out and the first quest
    /// issued. Fails only if the tuning does not validate.
    pub fn new(
        tuning: Tuning,
        catalog: Catalog,
        store: Box<dyn KeyValueStore>,
        scenes: Box<dyn SceneLoader>,
        seed: u64,
    ) -> Result<Self, TuningError> {
        tuning.validate()?;

        let progression = ProgressionStore::load(store, &tuning.upgrades);
        let session = SessionStateMachine::new(&tuning.session, progression.max_hp());

        let mut sim = Self {
            track: TrackStreamer::new(&tuning.track, subsystem_rng(seed, STREAM_TRACK)),
            spawner: SpawnScheduler::new(&tuning.spawn, &tuning.lanes, subsystem_rng(seed, STREAM_SPAWN)),
            traffic: TrafficAgentController::new(&tuning.traffic, &tuning.lanes, subsystem_rng(seed, STREAM_TRAFFIC)),
            wander: TargetWanderController::new(&tuning.targets, &tuning.lanes, subsystem_rng(seed, STREAM_WANDER)),
            quests: QuestCoordinator::new(&tuning.quest, subsystem_rng(seed, STREAM_QUEST)),
            resolver: CollisionResolver::new(&tuning.collision),
            player: PlayerController::new(EntityId(0), &tuning.player, &tuning.lanes),
            world: PhysicsWorld::new(),
            entities: BTreeMap::new(),
            next_entity: 0,
            session,
            progression,
            scenes,
            accumulator: 0.0,
            frames: 0,
            catalog,
            tuning,
        };
        sim.build_scene();
        log::info!(
            "Simulation ready: {} target variants, {} obstacle variants, seed {}",
            sim.catalog.targets.len(),
            sim.catalog.obstacles.len(),
            seed
        );
        Ok(sim)
    }

    // --- accessors ---

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    /// Mutable access, mainly for subscribing to notifications
    pub fn session_mut(&mut self) -> &mut SessionStateMachine {
        &mut self.session
    }

    pub fn progression(&self) -> &ProgressionStore {
        &self.progression
    }

    pub fn progression_mut(&mut self) -> &mut ProgressionStore {
        &mut self.progression
    }

    pub fn quests(&self) -> &QuestCoordinator {
        &self.quests
    }

    pub fn quests_mut(&mut self) -> &mut QuestCoordinator {
        &mut self.quests
    }

    pub fn track(&self) -> &TrackStreamer {
        &self.track
    }

    pub fn traffic(&self) -> &TrafficAgentController {
        &self.traffic
    }

    pub fn wander(&self) -> &TargetWanderController {
        &self.wander
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn player_position(&self) -> Vec3 {
        self.world
            .get(self.player.entity())
            .map(|b| b.position)
            .unwrap_or(self.tuning.player.start_position)
    }

    pub fn entity_kind(&self, id: EntityId) -> Option<EntityKind> {
        self.entities.get(&id).copied()
    }

    /// Registered entities in id order, player included
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, EntityKind)> + '_ {
        self.entities.iter().map(|(id, kind)| (*id, *kind))
    }

    /// Spawned entities currently registered, player excluded
    pub fn entity_count(&self) -> usize {
        self.entities.len().saturating_sub(1)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    // --- host commands ---

    /// Start over after GameOver. Returns false outside GameOver.
    ///
    /// Hand-offs still pending from the last run are dropped so nothing
    /// reaches the holding area after it was emptied.
    pub fn restart(&mut self) -> bool {
        if !self
            .session
            .restart(&mut self.world, &self.progression, self.scenes.as_mut())
        {
            return false;
        }
        self.resolver.reset();
        true
    }

    /// The successor screen has attached its listeners
    pub fn signal_screen_ready(&mut self) {
        self.session.signal_screen_ready();
    }

    pub fn purchase_upgrade(&mut self, kind: UpgradeKind) -> PurchaseOutcome {
        self.progression.purchase(kind)
    }

    /// Place a traffic agent or target directly. Returns None for other
    /// categories.
    pub fn spawn_entity(&mut self, category: Category, variant_id: u32, lane: i32, z: f32) -> Option<EntityId> {
        let lane = self.tuning.lanes.clamp(lane);
        let position = lane_position(lane, self.tuning.lanes.lane_width, self.tuning.spawn.spawn_height, z);
        self.spawn(SpawnRequest {
            category,
            variant_id,
            lane,
            position,
        })
    }

    // --- frame loop ---

    /// Advance one variable-rate frame, then as many fixed physics steps as
    /// the accumulated time allows.
    pub fn frame(&mut self, dt: f32, input: &FrameInput) -> Vec<SessionSignal> {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.frames += 1;

        if self.session.is_playing() {
            let step = input.lane_step();
            if step != 0 {
                self.player.change_lane(step);
            }
        }

        let signals = self.session.tick(dt, self.scenes.as_mut());
        if signals.contains(&SessionSignal::SceneReloaded) {
            self.build_scene();
        }

        let state = self.session.state();
        let player_z = self.player_position().z;

        if state == SessionState::Playing {
            self.track.tick(player_z);
        }

        let window = self.track.is_enabled().then(|| self.track.window_length());
        if let Some(request) = self.spawner.tick(dt, state, player_z, window, &self.catalog) {
            self.spawn(request);
        }

        self.wander.tick(dt, state, &mut self.world);

        for id in self.resolver.tick(dt, &mut self.session, &mut self.world) {
            self.traffic.remove_agent(id);
            self.wander.remove_target(id);
        }

        self.cull_behind(player_z);

        // Fixed timestep physics
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.physics_step();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }

        signals
    }

    fn physics_step(&mut self) {
        let state = self.session.state();
        self.player.fixed_tick(state, &mut self.world);
        self.traffic.fixed_tick(SIM_DT, state, &mut self.world);
        self.world.step(SIM_DT);

        let contacts = self.world.begin_contacts(self.player.entity());
        for contact in contacts {
            let kind = self.entities.get(&contact.other).copied();
            let mut ctx = Collaborators {
                session: &mut self.session,
                progression: &mut self.progression,
                quests: &mut self.quests,
                traffic: &mut self.traffic,
                wander: &mut self.wander,
                world: &mut self.world,
            };
            let resolution = self.resolver.resolve(contact, kind, &mut ctx);
            if resolution != Resolution::Ignored {
                log::debug!("Contact with {:?}: {:?}", contact.other, resolution);
            }
        }
    }

    /// Fresh playfield: player back at the start, track re-primed, every
    /// controller emptied and a new quest issued.
    fn build_scene(&mut self) {
        self.world.clear();
        self.entities.clear();
        self.accumulator = 0.0;

        let player = self.alloc_entity();
        let p = &self.tuning.player;
        self.world.insert(Body::new(player, Category::Player, p.start_position, p.half_extents, p.mass));
        self.entities.insert(player, EntityKind::Player);
        self.player.reset(player);

        self.track.reset();
        self.spawner.reset();
        self.traffic.clear();
        self.wander.clear();
        self.resolver.reset();
        self.quests.start(&self.catalog);
        log::debug!("Scene built, player {:?}", player);
    }

    fn alloc_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    fn spawn(&mut self, request: SpawnRequest) -> Option<EntityId> {
        let (kind, half_extents, mass) = match request.category {
            Category::Obstacle => (
                EntityKind::Obstacle {
                    variant_id: request.variant_id,
                },
                self.tuning.traffic.half_extents,
                self.tuning.traffic.mass,
            ),
            Category::Target => (
                EntityKind::Target(TargetEntity::new(request.variant_id)),
                self.tuning.targets.half_extents,
                self.tuning.targets.mass,
            ),
            other => {
                log::warn!("Cannot spawn category {:?}", other);
                return None;
            }
        };

        let id = self.alloc_entity();
        self.world
            .insert(Body::new(id, request.category, request.position, half_extents, mass));
        self.entities.insert(id, kind);
        match kind {
            EntityKind::Obstacle { .. } => self.traffic.add_agent(id, request.lane),
            _ => self.wander.add_target(id),
        }
        log::trace!("Spawned {:?} {:?} in lane {}", request.category, id, request.lane);
        Some(id)
    }

    /// Remove unstruck entities that fell too far behind the player
    fn cull_behind(&mut self, player_z: f32) {
        let limit = player_z - self.tuning.spawn.cull_behind;
        let stale: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(id, kind)| **kind != EntityKind::Player && !self.resolver.was_struck(**id))
            .filter(|(id, _)| self.world.get(**id).is_some_and(|b| b.position.z < limit))
            .map(|(id, _)| *id)
            .collect();

        for id in stale {
            self.world.remove(id);
            self.entities.remove(&id);
            self.traffic.remove_agent(id);
            self.wander.remove_target(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::platform::ScriptedSceneLoader;
    use crate::sim::state::VariantDescriptor;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn catalog() -> Catalog {
        Catalog {
            targets: vec![VariantDescriptor::new(10, "Knight"), VariantDescriptor::new(11, "Mage")],
            obstacles: vec![VariantDescriptor::new(1, "Sedan"), VariantDescriptor::new(2, "Truck")],
        }
    }

    fn sim_with(tuning: Tuning, seed: u64) -> Simulation {
        Simulation::new(
            tuning,
            catalog(),
            Box::new(MemoryStore::new()),
            Box::new(ScriptedSceneLoader::new(1)),
            seed,
        )
        .unwrap()
    }

    fn sim() -> Simulation {
        sim_with(Tuning::default(), 12345)
    }

    fn run(sim: &mut Simulation, seconds: f32) -> Vec<SessionSignal> {
        let mut signals = Vec::new();
        let frames = (seconds / SIM_DT).round() as u32;
        for _ in 0..frames {
            signals.extend(sim.frame(SIM_DT, &FrameInput::default()));
        }
        signals
    }

    fn start_playing(sim: &mut Simulation) {
        run(sim, 1.1);
        assert_eq!(sim.state(), SessionState::Playing);
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let mut tuning = Tuning::default();
        tuning.lanes.lane_width = 0.0;
        let result = Simulation::new(
            tuning,
            catalog(),
            Box::new(MemoryStore::new()),
            Box::new(ScriptedSceneLoader::new(0)),
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ready_to_playing_after_start_delay() {
        let mut sim = sim();
        assert_eq!(sim.state(), SessionState::Ready);
        assert!(sim.quests().current().is_some());
        assert_eq!(sim.track().active_count(), 3);

        let signals = run(&mut sim, 1.1);
        assert_eq!(signals, vec![SessionSignal::Started]);
        assert_eq!(sim.state(), SessionState::Playing);
    }

    #[test]
    fn test_frame_substeps_are_capped() {
        let mut sim = sim();
        sim.frame(5.0, &FrameInput::default());
        // Clamped to 0.1 s: at most five 20 ms steps
        let steps = sim.world().steps();
        assert!((4..=5).contains(&steps));
        assert!(steps <= MAX_SUBSTEPS as u64);
    }

    #[test]
    fn test_player_held_until_playing() {
        let mut sim = sim();
        sim.frame(0.1, &FrameInput::right());
        run(&mut sim, 0.5);
        assert_eq!(sim.player().lane(), 0);
        assert_eq!(sim.player_position().z, 0.0);
    }

    #[test]
    fn test_lane_input_while_playing() {
        let mut sim = sim();
        start_playing(&mut sim);
        sim.frame(SIM_DT, &FrameInput::left());
        run(&mut sim, 1.0);
        assert_eq!(sim.player().lane(), -1);
        assert!((sim.player_position().x + 3.5).abs() < 0.1);
        assert!(sim.player_position().z > 0.0);
    }

    #[test]
    fn test_driving_streams_track_and_spawns() {
        let mut tuning = Tuning::default();
        // Keep the run alive regardless of what gets hit
        tuning.upgrades.max_hp.base_value = 1000.0;
        let mut sim = sim_with(tuning, 7);
        start_playing(&mut sim);
        run(&mut sim, 20.0);

        assert!(sim.player_position().z > 100.0);
        let active = sim.track().active_count();
        assert!((3..=4).contains(&active));
        assert!(sim.track().frontier() > sim.player_position().z);
        assert!(sim.quests().current().is_some());
        // Spawns happen every 1.5 s; culling keeps only recent ones
        assert!(sim.entity_count() > 0);
        assert!(sim.entity_count() < 20);
    }

    #[test]
    fn test_obstacle_contact_costs_hp_and_money() {
        let mut sim = sim();
        start_playing(&mut sim);
        let z = sim.player_position().z;
        let car = sim.spawn_entity(Category::Obstacle, 1, 0, z + 1.0).unwrap();
        sim.frame(SIM_DT, &FrameInput::default());

        assert_eq!(sim.session().hp(), 2);
        assert!(sim.resolver().is_invincible());
        assert!(sim.traffic().agent(car).unwrap().is_hit());

        // After the hand-off delay the car is parked off the road
        run(&mut sim, 1.6);
        assert_eq!(sim.session().holding_area().obstacles(), &[car]);
        assert!(sim.traffic().agent(car).is_none());
    }

    #[test]
    fn test_target_contact_counts_toward_quest() {
        let mut sim = sim();
        start_playing(&mut sim);
        let variant = sim.quests().current().unwrap().target_variant_id;
        let z = sim.player_position().z;
        sim.spawn_entity(Category::Target, variant, 0, z + 1.0).unwrap();
        sim.frame(SIM_DT, &FrameInput::default());

        let quest = sim.quests().current().unwrap();
        assert!(quest.current_count == 1 || sim.quests().completed_count() == 1);
    }

    #[test]
    fn test_entities_far_behind_are_culled() {
        let mut sim = sim();
        start_playing(&mut sim);
        let id = sim.spawn_entity(Category::Target, 10, 2, -100.0).unwrap();
        sim.frame(SIM_DT, &FrameInput::default());
        assert!(sim.entity_kind(id).is_none());
        assert!(!sim.world().contains(id));
    }

    #[test]
    fn test_game_over_banks_session_money() {
        let mut tuning = Tuning::default();
        tuning.upgrades.max_hp.base_value = 1.0;
        let mut sim = sim_with(tuning, 99);
        start_playing(&mut sim);
        sim.session_mut().add_money(500);

        let z = sim.player_position().z;
        sim.spawn_entity(Category::Obstacle, 1, 0, z + 1.0).unwrap();
        sim.frame(SIM_DT, &FrameInput::default());

        assert_eq!(sim.state(), SessionState::GameOver);
        // Penalty lands before the fatal damage
        assert_eq!(sim.progression().lifetime_money(), 400);
        assert_eq!(sim.progression().store().get_int("lifetimeMoney", 0), 400);
    }

    #[test]
    fn test_full_restart_sequence() {
        let mut tuning = Tuning::default();
        tuning.upgrades.max_hp.base_value = 1.0;
        let mut sim = sim_with(tuning, 3);
        start_playing(&mut sim);

        let z = sim.player_position().z;
        sim.spawn_entity(Category::Obstacle, 1, 0, z + 1.0).unwrap();
        sim.frame(SIM_DT, &FrameInput::default());
        assert_eq!(sim.state(), SessionState::GameOver);

        let signals = run(&mut sim, 3.1);
        assert!(signals.contains(&SessionSignal::EndScreenRequested));

        let hp_seen = Rc::new(RefCell::new(Vec::new()));
        {
            let hp_seen = Rc::clone(&hp_seen);
            sim.session_mut().hp_changed.subscribe(move |c| hp_seen.borrow_mut().push(c.hp));
        }

        assert!(sim.restart());
        assert!(!sim.restart()); // already Ready
        assert_eq!(sim.state(), SessionState::Ready);
        assert!(sim.session().holding_area().is_empty());

        let signals = run(&mut sim, 0.1);
        assert!(signals.contains(&SessionSignal::SceneReloaded));
        assert_eq!(sim.player_position(), sim.tuning().player.start_position);
        assert_eq!(sim.entity_count(), 0);

        sim.signal_screen_ready();
        run(&mut sim, 1.2);
        assert_eq!(sim.state(), SessionState::Playing);
        assert_eq!(sim.session().hp(), 1);
        assert!(!hp_seen.borrow().is_empty());
    }

    #[test]
    fn test_restart_drops_pending_handoffs() {
        let mut tuning = Tuning::default();
        tuning.upgrades.max_hp.base_value = 1.0;
        let mut sim = Simulation::new(
            tuning,
            catalog(),
            Box::new(MemoryStore::new()),
            Box::new(ScriptedSceneLoader::new(100)),
            8,
        )
        .unwrap();
        run(&mut sim, 1.1);
        assert_eq!(sim.state(), SessionState::Playing);

        let z = sim.player_position().z;
        let car = sim.spawn_entity(Category::Obstacle, 1, 0, z + 1.0).unwrap();
        sim.frame(SIM_DT, &FrameInput::default());
        assert_eq!(sim.state(), SessionState::GameOver);
        assert_eq!(sim.resolver().pending_handoffs(), 1);

        // Restart well before the hand-off delay; the reload outlasts it
        assert!(sim.restart());
        assert_eq!(sim.resolver().pending_handoffs(), 0);

        let mut reloaded = false;
        for _ in 0..200 {
            if sim.frame(SIM_DT, &FrameInput::default()).contains(&SessionSignal::SceneReloaded) {
                reloaded = true;
                break;
            }
        }
        assert!(reloaded);
        assert!(sim.session().holding_area().is_empty());
        assert!(!sim.world().contains(car));
        assert!(sim.entity_kind(car).is_none());
    }

    #[test]
    fn test_purchase_leaves_running_session_alone() {
        let mut sim = Simulation::new(
            Tuning::default(),
            catalog(),
            Box::new(MemoryStore::with_values([("lifetimeMoney", 600)])),
            Box::new(ScriptedSceneLoader::new(0)),
            5,
        )
        .unwrap();
        assert!(sim.purchase_upgrade(UpgradeKind::MaxHp).succeeded());
        assert_eq!(sim.progression().lifetime_money(), 100);
        assert_eq!(sim.progression().max_hp(), 4);
        // The running session keeps its max hp
        assert_eq!(sim.session().ledger().max_hp, 3);
    }

    #[test]
    fn test_determinism() {
        let mut a = sim_with(Tuning::default(), 4242);
        let mut b = sim_with(Tuning::default(), 4242);
        let inputs = [
            FrameInput::default(),
            FrameInput::left(),
            FrameInput::default(),
            FrameInput::right(),
        ];

        for frame in 0..600 {
            let input = inputs[(frame / 50) % inputs.len()];
            a.frame(SIM_DT, &input);
            b.frame(SIM_DT, &input);
        }

        assert_eq!(a.state(), b.state());
        assert_eq!(a.entity_count(), b.entity_count());
        assert_eq!(a.session().ledger(), b.session().ledger());
        assert_eq!(a.player_position(), b.player_position());
    }
}
