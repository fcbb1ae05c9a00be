//! Persistent upgrades and lifetime currency
//!
//! Survives across sessions. Levels and the lifetime total are loaded once
//! from the injected store and written back on every change. Derived stats
//! (max HP, invincibility duration) are always computed from the level.

use serde::{Deserialize, Serialize};

use crate::persistence::{KeyValueStore, keys};
use crate::sim::events::Channel;
use crate::tuning::{UpgradeCurve, UpgradeTuning};

/// The two independent upgrade tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    MaxHp,
    Invincibility,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 2] = [UpgradeKind::MaxHp, UpgradeKind::Invincibility];

    fn storage_key(self) -> &'static str {
        match self {
            UpgradeKind::MaxHp => keys::HP_LEVEL,
            UpgradeKind::Invincibility => keys::INVINCIBILITY_LEVEL,
        }
    }
}

/// A leveled upgrade with a geometric cost curve and linear effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeTrack {
    pub level: u32,
    pub base_cost: u64,
    pub cost_multiplier: f32,
    pub base_value: f32,
    pub per_level: f32,
}

impl UpgradeTrack {
    pub fn from_curve(curve: &UpgradeCurve, level: u32) -> Self {
        Self {
            level,
            base_cost: curve.base_cost,
            cost_multiplier: curve.cost_multiplier,
            base_value: curve.base_value,
            per_level: curve.per_level,
        }
    }

    /// `round(base_cost * multiplier^level)`
    pub fn cost_at(&self, level: u32) -> u64 {
        let cost = self.base_cost as f64 * (self.cost_multiplier as f64).powi(level as i32);
        cost.round() as u64
    }

    /// Price of the next level
    pub fn cost(&self) -> u64 {
        self.cost_at(self.level)
    }

    pub fn value_at(&self, level: u32) -> f32 {
        self.base_value + level as f32 * self.per_level
    }

    pub fn value(&self) -> f32 {
        self.value_at(self.level)
    }
}

/// Why a purchase was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased { new_level: u32, cost: u64 },
    InsufficientFunds { cost: u64, available: u64 },
}

impl PurchaseOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased { .. })
    }
}

pub struct ProgressionStore {
    store: Box<dyn KeyValueStore>,
    lifetime_money: u64,
    max_hp: UpgradeTrack,
    invincibility: UpgradeTrack,
    /// Fires after every successful purchase
    pub upgrade_changed: Channel<()>,
}

impl std::fmt::Debug for ProgressionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionStore")
            .field("lifetime_money", &self.lifetime_money)
            .field("max_hp", &self.max_hp)
            .field("invincibility", &self.invincibility)
            .finish()
    }
}

fn stored_count(store: &dyn KeyValueStore, key: &str) -> i64 {
    store.get_int(key, 0).max(0)
}

impl ProgressionStore {
    /// Load levels and lifetime money (missing keys default to 0)
    pub fn load(store: Box<dyn KeyValueStore>, tuning: &UpgradeTuning) -> Self {
        let lifetime_money = stored_count(store.as_ref(), keys::LIFETIME_MONEY) as u64;
        let hp_level = stored_count(store.as_ref(), keys::HP_LEVEL) as u32;
        let inv_level = stored_count(store.as_ref(), keys::INVINCIBILITY_LEVEL) as u32;

        log::info!(
            "Progression loaded: {}G lifetime, HP Lv.{}, invincibility Lv.{}",
            lifetime_money,
            hp_level,
            inv_level
        );

        Self {
            store,
            lifetime_money,
            max_hp: UpgradeTrack::from_curve(&tuning.max_hp, hp_level),
            invincibility: UpgradeTrack::from_curve(&tuning.invincibility, inv_level),
            upgrade_changed: Channel::new(),
        }
    }

    pub fn lifetime_money(&self) -> u64 {
        self.lifetime_money
    }

    pub fn track(&self, kind: UpgradeKind) -> &UpgradeTrack {
        match kind {
            UpgradeKind::MaxHp => &self.max_hp,
            UpgradeKind::Invincibility => &self.invincibility,
        }
    }

    fn track_mut(&mut self, kind: UpgradeKind) -> &mut UpgradeTrack {
        match kind {
            UpgradeKind::MaxHp => &mut self.max_hp,
            UpgradeKind::Invincibility => &mut self.invincibility,
        }
    }

    pub fn level(&self, kind: UpgradeKind) -> u32 {
        self.track(kind).level
    }

    pub fn cost(&self, kind: UpgradeKind) -> u64 {
        self.track(kind).cost()
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp.value().round().max(1.0) as u32
    }

    /// Invincibility window length in seconds
    pub fn invincibility_duration(&self) -> f32 {
        self.invincibility.value().max(0.0)
    }

    /// Read access to the backing store
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Add session earnings to the lifetime total and persist it
    pub fn deposit(&mut self, amount: u64) {
        self.lifetime_money = self.lifetime_money.saturating_add(amount);
        self.persist_money();
    }

    /// Buy the next level of an upgrade track
    pub fn purchase(&mut self, kind: UpgradeKind) -> PurchaseOutcome {
        let cost = self.cost(kind);
        if self.lifetime_money < cost {
            log::info!(
                "Cannot afford {:?} upgrade: {}G needed, {}G available",
                kind,
                cost,
                self.lifetime_money
            );
            return PurchaseOutcome::InsufficientFunds {
                cost,
                available: self.lifetime_money,
            };
        }

        self.lifetime_money -= cost;
        let track = self.track_mut(kind);
        track.level += 1;
        let new_level = track.level;

        self.store.set_int(keys::LIFETIME_MONEY, self.lifetime_money as i64);
        self.store.set_int(kind.storage_key(), new_level as i64);
        self.flush();

        log::info!("{:?} upgraded to Lv.{} for {}G", kind, new_level, cost);
        self.upgrade_changed.emit(&());
        PurchaseOutcome::Purchased { new_level, cost }
    }

    fn persist_money(&mut self) {
        self.store.set_int(keys::LIFETIME_MONEY, self.lifetime_money as i64);
        self.flush();
        log::info!("Lifetime money saved: {}G", self.lifetime_money);
    }

    fn flush(&mut self) {
        if let Err(e) = self.store.flush() {
            log::warn!("Failed to persist progression: {}", e);
        }
    }
}
