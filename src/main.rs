//! Lane Rush entry point
//!
//! Runs the simulation headless with an autopilot driver and logs a summary
//! of each run. Usage: `lane-rush [tuning.json] [seconds]`

use lane_rush::consts::SIM_DT;
use lane_rush::persistence::KeyValueStore;
use lane_rush::platform::{FrameInput, ScriptedSceneLoader};
use lane_rush::sim::{Catalog, EntityKind, SessionSignal, SessionState, Simulation, VariantDescriptor};
use lane_rush::{Tuning, UpgradeKind};

/// Look-ahead distance for the autopilot
const AUTOPILOT_RANGE: f32 = 30.0;
/// Runs to play before stopping
const MAX_RUNS: u32 = 3;

fn demo_catalog() -> Catalog {
    Catalog {
        targets: vec![
            VariantDescriptor::new(100, "Knight"),
            VariantDescriptor::new(101, "Mage"),
            VariantDescriptor::new(102, "Archer"),
        ],
        obstacles: vec![
            VariantDescriptor::new(1, "Sedan"),
            VariantDescriptor::new(2, "Truck"),
            VariantDescriptor::new(3, "Bus"),
        ],
    }
}

/// Pick a lane step: dodge traffic ahead, steer toward quest targets
fn autopilot(sim: &Simulation) -> FrameInput {
    let lanes = &sim.tuning().lanes;
    let player = sim.player_position();
    let current = sim.player().lane();

    let mut scores = vec![0.0f32; (lanes.max_lane - lanes.min_lane + 1) as usize];
    for (id, kind) in sim.entities() {
        let Some(body) = sim.world().get(id) else {
            continue;
        };
        let ahead = body.position.z - player.z;
        if body.kinematic || !(0.0..AUTOPILOT_RANGE).contains(&ahead) {
            continue;
        }
        let lane = lanes.clamp((body.position.x / lanes.lane_width).round() as i32);
        let urgency = 1.0 - ahead / AUTOPILOT_RANGE;
        let score = match kind {
            EntityKind::Obstacle { .. } => -10.0 * urgency,
            EntityKind::Target(t) if sim.quests().is_quest_target(t.variant_id()) => 3.0 * urgency,
            EntityKind::Target(_) => 0.5 * urgency,
            EntityKind::Player => 0.0,
        };
        scores[(lane - lanes.min_lane) as usize] += score;
    }

    let score_of = |lane: i32| scores[(lane - lanes.min_lane) as usize];
    let mut best = current;
    for lane in lanes.min_lane..=lanes.max_lane {
        // Prefer staying put on ties
        if score_of(lane) > score_of(best) + 0.1 {
            best = lane;
        }
    }

    match best.cmp(&current) {
        std::cmp::Ordering::Less => FrameInput::left(),
        std::cmp::Ordering::Greater => FrameInput::right(),
        std::cmp::Ordering::Equal => FrameInput::default(),
    }
}

/// Spend lifetime money on whatever is affordable, cheapest first
fn shop(sim: &mut Simulation) {
    loop {
        let Some(kind) = UpgradeKind::ALL
            .into_iter()
            .filter(|k| sim.progression().cost(*k) <= sim.progression().lifetime_money())
            .min_by_key(|k| sim.progression().cost(*k))
        else {
            break;
        };
        if !sim.purchase_upgrade(kind).succeeded() {
            break;
        }
        log::info!("Bought {:?} Lv.{}", kind, sim.progression().level(kind));
    }
}

fn run(sim: &mut Simulation, seconds: f32) {
    let frames = (seconds / SIM_DT) as u64;
    let mut runs = 1;
    let mut lane_cooldown = 0u32;

    for _ in 0..frames {
        // Autopilot taps at most every few frames, like a human would
        let input = if lane_cooldown == 0 && sim.state() == SessionState::Playing {
            let input = autopilot(sim);
            if input.lane_step() != 0 {
                lane_cooldown = 10;
            }
            input
        } else {
            lane_cooldown = lane_cooldown.saturating_sub(1);
            FrameInput::default()
        };

        for signal in sim.frame(SIM_DT, &input) {
            match signal {
                SessionSignal::Started => log::info!("Run {} started", runs),
                SessionSignal::EndScreenRequested => {
                    let ledger = *sim.session().ledger();
                    log::info!(
                        "Run {} over: {}G earned, {} collected, {}G lifetime",
                        runs,
                        ledger.session_money,
                        sim.session().holding_area().len(),
                        sim.progression().lifetime_money()
                    );
                    if runs >= MAX_RUNS {
                        return;
                    }
                    shop(sim);
                    if sim.restart() {
                        runs += 1;
                    }
                }
                SessionSignal::SceneReloaded => sim.signal_screen_ready(),
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Lane Rush (native) starting...");

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => match Tuning::load(&path) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("Failed to load tuning from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => Tuning::default(),
    };
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(300.0);

    let store: Box<dyn KeyValueStore> = match lane_rush::persistence::JsonFileStore::open("lane_rush_save.json") {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("Save file unreadable ({}), progress will not persist", e);
            Box::new(lane_rush::persistence::MemoryStore::new())
        }
    };

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut sim = match Simulation::new(tuning, demo_catalog(), store, Box::new(ScriptedSceneLoader::new(3)), seed) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Invalid tuning: {}", e);
            std::process::exit(1);
        }
    };

    run(&mut sim, seconds);
    log::info!(
        "Done after {} frames: {}G lifetime, HP Lv.{}, invincibility Lv.{}",
        sim.frames(),
        sim.progression().lifetime_money(),
        sim.progression().level(UpgradeKind::MaxHp),
        sim.progression().level(UpgradeKind::Invincibility)
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }
    log::info!("Lane Rush (web) starting...");

    let store = Box::new(lane_rush::persistence::LocalStorageStore::load("lane_rush_save"));
    let seed = (js_seed() * 1_000.0) as u64;
    match Simulation::new(Tuning::default(), demo_catalog(), store, Box::new(ScriptedSceneLoader::new(3)), seed) {
        Ok(mut sim) => run(&mut sim, 300.0),
        Err(e) => log::error!("Invalid tuning: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn js_seed() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
