//! Property tests for the simulation invariants

use glam::Vec3;
use proptest::prelude::*;

use lane_rush::persistence::MemoryStore;
use lane_rush::platform::ScriptedSceneLoader;
use lane_rush::progression::{ProgressionStore, PurchaseOutcome, UpgradeTrack};
use lane_rush::sim::{
    Body, Catalog, Category, EntityId, PhysicsWorld, QuestCoordinator, QuestValidation,
    SessionState, SessionStateMachine, TrackStreamer, TrafficAgentController, VariantDescriptor,
    subsystem_rng,
};
use lane_rush::tuning::{
    LaneTuning, QuestTuning, SessionTuning, TrackTuning, TrafficTuning, UpgradeCurve, UpgradeTuning,
};
use lane_rush::{UpgradeKind, lane_to_lateral};

#[derive(Debug, Clone)]
enum LedgerOp {
    Add(u64),
    Lose(u64),
    Damage(u32),
}

fn ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (0u64..5_000).prop_map(LedgerOp::Add),
        (0u64..5_000).prop_map(LedgerOp::Lose),
        (0u32..4).prop_map(LedgerOp::Damage),
    ]
}

/// A session past its start delay
fn playing_session(max_hp: u32) -> SessionStateMachine {
    let tuning = SessionTuning::default();
    let mut session = SessionStateMachine::new(&tuning, max_hp);
    session.tick(tuning.start_delay, &mut ScriptedSceneLoader::new(0));
    assert_eq!(session.state(), SessionState::Playing);
    session
}

fn progression_with(money: i64) -> ProgressionStore {
    ProgressionStore::load(
        Box::new(MemoryStore::with_values([("lifetimeMoney", money)])),
        &UpgradeTuning::default(),
    )
}

proptest! {
    #[test]
    fn ledger_never_negative_and_game_over_once(
        max_hp in 1u32..8,
        ops in prop::collection::vec(ledger_op(), 0..60),
    ) {
        let mut progression = progression_with(0);
        let mut session = playing_session(max_hp);

        let mut game_overs = 0;
        for op in ops {
            match op {
                LedgerOp::Add(n) => session.add_money(n),
                LedgerOp::Lose(n) => session.lose_money(n),
                LedgerOp::Damage(n) => {
                    if session.take_damage(n, &mut progression) {
                        game_overs += 1;
                    }
                }
            }
            prop_assert!(session.hp() <= max_hp);
            prop_assert_eq!(session.state() == SessionState::GameOver, session.hp() == 0);
        }
        prop_assert!(game_overs <= 1);
    }

    #[test]
    fn active_segments_stay_in_band(
        maintain in 1u32..6,
        variants in 1u32..5,
        seed in any::<u64>(),
        advances in prop::collection::vec(0.0f32..15.0, 1..200),
    ) {
        let tuning = TrackTuning {
            maintain_count: maintain,
            variant_count: variants,
            ..TrackTuning::default()
        };
        let mut track = TrackStreamer::new(&tuning, subsystem_rng(seed, 0));
        let maintain = maintain as usize;
        let mut z = 0.0;
        for step in advances {
            z += step;
            track.tick(z);
            prop_assert!(track.active_count() >= maintain);
            prop_assert!(track.active_count() <= maintain + 1);
        }
    }

    #[test]
    fn recycled_segments_keep_their_variant(
        seed in any::<u64>(),
        steps in 10usize..200,
    ) {
        let tuning = TrackTuning {
            maintain_count: 2,
            variant_count: 4,
            ..TrackTuning::default()
        };
        let mut track = TrackStreamer::new(&tuning, subsystem_rng(seed, 0));
        let mut first_variant = std::collections::HashMap::new();
        for step in 0..steps {
            track.tick(step as f32 * 10.0);
            for (id, seg) in track.active_segments() {
                let recorded = *first_variant.entry(id).or_insert(seg.variant_id);
                prop_assert_eq!(recorded, seg.variant_id);
            }
        }
    }

    #[test]
    fn hit_agent_never_steers_again(
        seed in any::<u64>(),
        lane in -2i32..=2,
        ticks in 1usize..300,
    ) {
        let tuning = TrafficTuning {
            lane_change_chance: 1.0,
            lane_change_interval: 0.05,
            ..TrafficTuning::default()
        };
        let lanes = LaneTuning::default();
        let mut traffic = TrafficAgentController::new(&tuning, &lanes, subsystem_rng(seed, 2));
        let mut world = PhysicsWorld::new();
        let car = EntityId(1);
        world.insert(Body::new(
            car,
            Category::Obstacle,
            Vec3::new(lane_to_lateral(lane, lanes.lane_width), 0.5, 0.0),
            Vec3::new(0.9, 0.5, 1.8),
            1.0,
        ));
        traffic.add_agent(car, lane);
        traffic.mark_hit(car);

        for _ in 0..ticks {
            traffic.fixed_tick(0.02, SessionState::Playing, &mut world);
            prop_assert_eq!(world.get(car).unwrap().pending_force(), Vec3::ZERO);
            world.step(0.02);
        }
        prop_assert_eq!(traffic.agent(car).unwrap().lane(), lane);
    }

    #[test]
    fn lane_changes_stay_on_the_road(
        seed in any::<u64>(),
        lane in -2i32..=2,
        requests in prop::collection::vec(prop_oneof![Just(-1i32), Just(1i32)], 0..40),
        ticks in 0usize..400,
    ) {
        let tuning = TrafficTuning {
            lane_change_chance: 1.0,
            lane_change_interval: 0.02,
            lane_change_jitter: 0.0,
            ..TrafficTuning::default()
        };
        let lanes = LaneTuning::default();
        let mut traffic = TrafficAgentController::new(&tuning, &lanes, subsystem_rng(seed, 2));
        let mut world = PhysicsWorld::new();
        let car = EntityId(1);
        world.insert(Body::new(
            car,
            Category::Obstacle,
            Vec3::new(lane_to_lateral(lane, lanes.lane_width), 0.5, 0.0),
            Vec3::new(0.9, 0.5, 1.8),
            1.0,
        ));
        traffic.add_agent(car, lane);

        for direction in requests {
            traffic.request_lane_change(car, direction, &world);
            prop_assert!(lanes.contains(traffic.agent(car).unwrap().lane()));
        }
        for _ in 0..ticks {
            traffic.fixed_tick(0.02, SessionState::Playing, &mut world);
            world.step(0.02);
            let agent = traffic.agent(car).unwrap();
            prop_assert!(lanes.contains(agent.lane()));
            prop_assert_eq!(agent.target_lateral(), lane_to_lateral(agent.lane(), lanes.lane_width));
        }
    }

    #[test]
    fn upgrade_cost_strictly_increases(
        base_cost in 100u64..10_000,
        multiplier in 1.05f32..3.0,
        level in 0u32..20,
    ) {
        let track = UpgradeTrack::from_curve(
            &UpgradeCurve {
                base_cost,
                cost_multiplier: multiplier,
                base_value: 1.0,
                per_level: 1.0,
            },
            0,
        );
        prop_assert!(track.cost_at(level + 1) > track.cost_at(level));
    }

    #[test]
    fn purchase_charges_exact_cost(
        money in 0i64..5_000,
        hp_first in any::<bool>(),
    ) {
        let mut progression = progression_with(money);
        let kind = if hp_first { UpgradeKind::MaxHp } else { UpgradeKind::Invincibility };
        let cost = progression.cost(kind);
        let level = progression.level(kind);

        match progression.purchase(kind) {
            PurchaseOutcome::Purchased { new_level, cost: charged } => {
                prop_assert!(money as u64 >= cost);
                prop_assert_eq!(charged, cost);
                prop_assert_eq!(new_level, level + 1);
                prop_assert_eq!(progression.lifetime_money(), money as u64 - cost);
            }
            PurchaseOutcome::InsufficientFunds { .. } => {
                prop_assert!((money as u64) < cost);
                prop_assert_eq!(progression.lifetime_money(), money as u64);
                prop_assert_eq!(progression.level(kind), level);
            }
        }
    }

    #[test]
    fn quest_pays_once_and_never_overflows(
        seed in any::<u64>(),
        strikes in prop::collection::vec(0u32..3, 0..50),
    ) {
        let catalog = Catalog {
            targets: vec![
                VariantDescriptor::new(0, "Knight"),
                VariantDescriptor::new(1, "Mage"),
                VariantDescriptor::new(2, "Archer"),
            ],
            obstacles: Vec::new(),
        };
        let mut quests = QuestCoordinator::new(&QuestTuning::default(), subsystem_rng(seed, 4));
        let mut session = playing_session(3);
        quests.start(&catalog);

        let mut paid = 0u64;
        for variant in strikes {
            let before = quests.current().cloned();
            let result = quests.validate(variant, &mut session);
            let quest = quests.current().unwrap();
            prop_assert!(quest.current_count <= quest.required_count);
            if let QuestValidation::Completed { reward } = result {
                let finished = before.unwrap();
                prop_assert_eq!(reward, finished.reward);
                prop_assert_eq!(finished.current_count + 1, finished.required_count);
                paid += reward;
            }
        }
        prop_assert_eq!(session.session_money(), paid);
    }
}
