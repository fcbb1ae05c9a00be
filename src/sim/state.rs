//! Shared simulation types
//!
//! Entity identities, categories, spawn catalogs and the holding area for
//! struck entities.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Scene loaded, waiting for the start delay
    Ready,
    /// Active gameplay
    Playing,
    /// Run ended, waiting for the end screen or a restart
    GameOver,
}

/// Stable entity identifier (allocation order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Closed set of collision categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Player,
    /// Collectible ("hero") entity
    Target,
    /// Traffic agent
    Obstacle,
    Other,
}

impl Category {
    /// Whether a forward sensor treats this category as blocking
    pub fn blocks_traffic(self) -> bool {
        matches!(self, Category::Player | Category::Obstacle)
    }
}

/// One spawnable template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    /// Stable id used for quest matching
    pub id: u32,
    pub name: String,
}

impl VariantDescriptor {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Target and obstacle spawn catalogs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub targets: Vec<VariantDescriptor>,
    pub obstacles: Vec<VariantDescriptor>,
}

impl Catalog {
    pub fn target(&self, id: u32) -> Option<&VariantDescriptor> {
        self.targets.iter().find(|v| v.id == id)
    }
}

/// A spawned collectible. The variant never changes after spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntity {
    variant_id: u32,
}

impl TargetEntity {
    pub fn new(variant_id: u32) -> Self {
        Self { variant_id }
    }

    pub fn variant_id(&self) -> u32 {
        self.variant_id
    }
}

/// What a spawned entity is, beyond its physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Target(TargetEntity),
    Obstacle { variant_id: u32 },
}

impl EntityKind {
    pub fn category(&self) -> Category {
        match self {
            EntityKind::Player => Category::Player,
            EntityKind::Target(_) => Category::Target,
            EntityKind::Obstacle { .. } => Category::Obstacle,
        }
    }
}

/// Struck entities parked off the playfield for the end screen.
///
/// Append-only during a session; cleared only by a full restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectedHoldingArea {
    targets: Vec<EntityId>,
    obstacles: Vec<EntityId>,
}

impl CollectedHoldingArea {
    pub fn push_target(&mut self, id: EntityId) {
        self.targets.push(id);
    }

    pub fn push_obstacle(&mut self, id: EntityId) {
        self.obstacles.push(id);
    }

    pub fn targets(&self) -> &[EntityId] {
        &self.targets
    }

    pub fn obstacles(&self) -> &[EntityId] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.targets.len() + self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the area, returning everything it held
    pub fn drain(&mut self) -> Vec<EntityId> {
        let mut all = std::mem::take(&mut self.targets);
        all.append(&mut self.obstacles);
        all
    }
}

/// Seeded RNG for one subsystem. Each subsystem gets its own stream so adding
/// draws in one never perturbs another.
pub fn subsystem_rng(seed: u64, stream: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
}
