//! Fetch quests: "deliver N targets of variant X"

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::Channel;
use super::session::SessionStateMachine;
use super::state::{Catalog, VariantDescriptor};
use crate::tuning::QuestTuning;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub target_variant_id: u32,
    pub target_name: String,
    pub required_count: u32,
    pub current_count: u32,
    pub reward: u64,
}

impl Quest {
    pub fn is_complete(&self) -> bool {
        self.current_count >= self.required_count
    }

    /// e.g. "(1/3)"
    pub fn progress_text(&self) -> String {
        format!("({}/{})", self.current_count, self.required_count)
    }

    pub fn description(&self) -> String {
        format!("Send {} x{} to the other world", self.target_name, self.required_count)
    }

    fn add_progress(&mut self) {
        if !self.is_complete() {
            self.current_count += 1;
        }
    }
}

/// Result of checking a struck target against the active quest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestValidation {
    NotQuestTarget,
    Counted,
    /// The quest finished and its reward was paid
    Completed { reward: u64 },
}

#[derive(Debug)]
pub struct QuestCoordinator {
    tuning: QuestTuning,
    variants: Vec<VariantDescriptor>,
    current: Option<Quest>,
    completed: u32,
    rng: Pcg32,
    pub quest_started: Channel<Quest>,
    pub quest_updated: Channel<Quest>,
    pub quest_completed: Channel<Quest>,
}

impl QuestCoordinator {
    pub fn new(tuning: &QuestTuning, rng: Pcg32) -> Self {
        Self {
            tuning: tuning.clone(),
            variants: Vec::new(),
            current: None,
            completed: 0,
            rng,
            quest_started: Channel::new(),
            quest_updated: Channel::new(),
            quest_completed: Channel::new(),
        }
    }

    /// Take the target catalog and issue the first quest.
    /// Returns false (with a warning) when there is nothing to hunt.
    pub fn start(&mut self, catalog: &Catalog) -> bool {
        self.variants = catalog.targets.clone();
        self.current = None;
        if self.variants.is_empty() {
            log::warn!("No target variants available, quests disabled");
            return false;
        }
        self.generate();
        true
    }

    pub fn current(&self) -> Option<&Quest> {
        self.current.as_ref()
    }

    /// Quests completed since construction
    pub fn completed_count(&self) -> u32 {
        self.completed
    }

    /// Would striking this variant count toward the active quest?
    pub fn is_quest_target(&self, variant_id: u32) -> bool {
        self.current
            .as_ref()
            .is_some_and(|q| !q.is_complete() && q.target_variant_id == variant_id)
    }

    /// Record a struck target. Completion pays the reward into the session
    /// and immediately issues the next quest.
    pub fn validate(&mut self, variant_id: u32, session: &mut SessionStateMachine) -> QuestValidation {
        if !self.is_quest_target(variant_id) {
            return QuestValidation::NotQuestTarget;
        }
        let Some(quest) = self.current.as_mut() else {
            return QuestValidation::NotQuestTarget;
        };

        quest.add_progress();
        log::debug!("Quest progress {}", quest.progress_text());
        let snapshot = quest.clone();
        self.quest_updated.emit(&snapshot);

        if !snapshot.is_complete() {
            return QuestValidation::Counted;
        }

        log::info!("Quest complete! Reward {}G", snapshot.reward);
        session.add_money(snapshot.reward);
        self.completed += 1;
        self.quest_completed.emit(&snapshot);
        self.generate();

        QuestValidation::Completed {
            reward: snapshot.reward,
        }
    }

    fn generate(&mut self) {
        if self.variants.is_empty() {
            return;
        }
        let variant = &self.variants[self.rng.random_range(0..self.variants.len())];
        let required_count = self
            .rng
            .random_range(self.tuning.min_required..=self.tuning.max_required.max(self.tuning.min_required))
            .max(1);

        let quest = Quest {
            target_variant_id: variant.id,
            target_name: variant.name.clone(),
            required_count,
            current_count: 0,
            reward: self.tuning.base_reward.saturating_mul(required_count as u64),
        };
        log::info!("New quest: {}, reward {}G", quest.description(), quest.reward);
        self.quest_started.emit(&quest);
        self.current = Some(quest);
    }
}
