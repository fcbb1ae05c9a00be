//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Variable frame tick for timers, spawning and sequencing
//! - Fixed timestep for forces and contacts
//! - Seeded RNG per subsystem
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies beyond the injected services

pub mod collision;
pub mod events;
pub mod physics;
pub mod player;
pub mod quest;
pub mod resolver;
pub mod session;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod timer;
pub mod track;
pub mod traffic;
pub mod wander;

pub use collision::{RayResult, aabb_overlap, knockback_direction, ray_aabb};
pub use events::{Channel, SubscriptionId};
pub use physics::{Body, Contact, PhysicsWorld, RayHit};
pub use player::PlayerController;
pub use quest::{Quest, QuestCoordinator, QuestValidation};
pub use resolver::{Collaborators, CollisionResolver, Resolution};
pub use session::{HpChange, Ledger, SessionSignal, SessionStateMachine};
pub use spawner::{SpawnRequest, SpawnScheduler};
pub use state::{
    Catalog, Category, CollectedHoldingArea, EntityId, EntityKind, SessionState, TargetEntity,
    VariantDescriptor, subsystem_rng,
};
pub use tick::Simulation;
pub use timer::{Countdown, Repeating};
pub use track::{SegmentId, TrackSegment, TrackStreamer};
pub use traffic::{TrafficAgent, TrafficAgentController};
pub use wander::{TargetWanderController, Wanderer};
