//! Session state machine and per-session ledger
//!
//! Ready --(start delay)--> Playing --(hp == 0)--> GameOver --(restart)--> Ready
//!
//! All sequencing (start delay, end-screen delay, restart reload) is explicit
//! timer state advanced by [`SessionStateMachine::tick`].

use super::events::Channel;
use super::physics::PhysicsWorld;
use super::state::{CollectedHoldingArea, SessionState};
use super::timer::{Countdown, Repeating};
use crate::platform::SceneLoader;
use crate::progression::ProgressionStore;
use crate::tuning::SessionTuning;

/// Payload of the hp-changed notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpChange {
    pub hp: u32,
    pub max_hp: u32,
}

/// Per-session currency and vitals.
///
/// Lifetime currency is owned by [`ProgressionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ledger {
    pub session_money: u64,
    pub hp: u32,
    pub max_hp: u32,
}

impl Ledger {
    fn full(max_hp: u32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            session_money: 0,
            hp: max_hp,
            max_hp,
        }
    }
}

/// Host-visible effects of a session tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Start delay elapsed, state is now Playing
    Started,
    /// The game screen finished reloading after a restart
    SceneReloaded,
    /// The end screen was requested
    EndScreenRequested,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Sequence {
    Idle,
    StartDelay(Countdown),
    EndScreenDelay(Countdown),
    AwaitingReload,
    AwaitingSubscriber { poll: Repeating, polls: u32 },
}

#[derive(Debug)]
pub struct SessionStateMachine {
    tuning: SessionTuning,
    state: SessionState,
    ledger: Ledger,
    holding: CollectedHoldingArea,
    sequence: Sequence,
    screen_ready: bool,
    pub money_changed: Channel<u64>,
    pub hp_changed: Channel<HpChange>,
    pub state_changed: Channel<SessionState>,
}

impl SessionStateMachine {
    /// New session in Ready, counting down to Playing
    pub fn new(tuning: &SessionTuning, max_hp: u32) -> Self {
        Self {
            tuning: tuning.clone(),
            state: SessionState::Ready,
            ledger: Ledger::full(max_hp),
            holding: CollectedHoldingArea::default(),
            sequence: Sequence::StartDelay(Countdown::new(tuning.start_delay)),
            screen_ready: false,
            money_changed: Channel::new(),
            hp_changed: Channel::new(),
            state_changed: Channel::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn session_money(&self) -> u64 {
        self.ledger.session_money
    }

    pub fn hp(&self) -> u32 {
        self.ledger.hp
    }

    pub fn holding_area(&self) -> &CollectedHoldingArea {
        &self.holding
    }

    pub fn holding_area_mut(&mut self) -> &mut CollectedHoldingArea {
        &mut self.holding
    }

    /// True while a restart is waiting on the scene reload or a subscriber
    pub fn is_restarting(&self) -> bool {
        matches!(
            self.sequence,
            Sequence::AwaitingReload | Sequence::AwaitingSubscriber { .. }
        )
    }

    /// Change state. No-op (and no notification) if unchanged; only
    /// Ready -> Playing -> GameOver -> Ready is accepted. Returns whether the
    /// state is now `new_state`.
    fn set_state(&mut self, new_state: SessionState) -> bool {
        if self.state == new_state {
            return true;
        }
        let allowed = matches!(
            (self.state, new_state),
            (SessionState::Ready, SessionState::Playing)
                | (SessionState::Playing, SessionState::GameOver)
                | (SessionState::GameOver, SessionState::Ready)
        );
        if !allowed {
            log::warn!("Rejected session transition {:?} -> {:?}", self.state, new_state);
            return false;
        }
        log::info!("Session {:?} -> {:?}", self.state, new_state);
        self.state = new_state;
        self.state_changed.emit(&new_state);
        true
    }

    /// Skip the start delay
    #[cfg(test)]
    pub(crate) fn begin_playing(&mut self) {
        self.set_state(SessionState::Playing);
        self.sequence = Sequence::Idle;
    }

    pub fn add_money(&mut self, amount: u64) {
        if !self.is_playing() {
            return;
        }
        self.ledger.session_money = self.ledger.session_money.saturating_add(amount);
        self.money_changed.emit(&self.ledger.session_money);
    }

    /// Deduct money, clamping at zero
    pub fn lose_money(&mut self, amount: u64) {
        if !self.is_playing() {
            return;
        }
        self.ledger.session_money = self.ledger.session_money.saturating_sub(amount);
        self.money_changed.emit(&self.ledger.session_money);
    }

    /// Apply damage. Reaching zero hp ends the game; returns true if it did.
    pub fn take_damage(&mut self, amount: u32, progression: &mut ProgressionStore) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.ledger.hp = self.ledger.hp.saturating_sub(amount);
        self.emit_hp();

        if self.ledger.hp == 0 {
            self.end_game(progression);
            return true;
        }
        false
    }

    /// Enter GameOver, bank the session's money and schedule the end screen.
    /// No-op outside Playing, so repeat calls do nothing.
    pub fn end_game(&mut self, progression: &mut ProgressionStore) {
        if self.state != SessionState::Playing {
            return;
        }
        self.set_state(SessionState::GameOver);

        progression.deposit(self.ledger.session_money);
        log::info!(
            "Game over! Earned {}G this run, {}G lifetime",
            self.ledger.session_money,
            progression.lifetime_money()
        );

        self.sequence = Sequence::EndScreenDelay(Countdown::new(self.tuning.end_screen_delay));
    }

    /// Start a fresh session from GameOver.
    ///
    /// Destroys everything in the holding area, resets money and hp (max hp
    /// re-read from progression), returns to Ready and reloads the game
    /// screen. Play resumes from [`tick`](Self::tick) once the reload is done.
    /// Returns false (and does nothing) outside GameOver.
    pub fn restart(
        &mut self,
        world: &mut PhysicsWorld,
        progression: &ProgressionStore,
        scenes: &mut dyn SceneLoader,
    ) -> bool {
        if self.state != SessionState::GameOver {
            log::warn!("Restart ignored in {:?}", self.state);
            return false;
        }

        let collected = self.holding.drain();
        for id in &collected {
            world.remove(*id);
        }
        log::debug!("Destroyed {} collected entities", collected.len());

        self.ledger = Ledger::full(progression.max_hp());
        self.screen_ready = false;
        self.set_state(SessionState::Ready);

        scenes.load_screen(&self.tuning.game_screen);
        self.sequence = Sequence::AwaitingReload;
        true
    }

    /// The successor screen is attached and listening; stop waiting for it.
    pub fn signal_screen_ready(&mut self) {
        self.screen_ready = true;
    }

    /// Advance sequencing timers by one variable tick
    pub fn tick(&mut self, dt: f32, scenes: &mut dyn SceneLoader) -> Vec<SessionSignal> {
        let mut signals = Vec::new();

        let next = match self.sequence {
            Sequence::Idle => Sequence::Idle,
            Sequence::StartDelay(mut timer) => {
                if timer.tick(dt) {
                    self.set_state(SessionState::Playing);
                    self.emit_hp();
                    signals.push(SessionSignal::Started);
                    Sequence::Idle
                } else {
                    Sequence::StartDelay(timer)
                }
            }
            Sequence::EndScreenDelay(mut timer) => {
                if timer.tick(dt) {
                    scenes.load_screen(&self.tuning.end_screen);
                    signals.push(SessionSignal::EndScreenRequested);
                    Sequence::Idle
                } else {
                    Sequence::EndScreenDelay(timer)
                }
            }
            Sequence::AwaitingReload => {
                if scenes.poll_complete() {
                    signals.push(SessionSignal::SceneReloaded);
                    Sequence::AwaitingSubscriber {
                        poll: Repeating::new(self.tuning.subscriber_poll_interval),
                        polls: 0,
                    }
                } else {
                    Sequence::AwaitingReload
                }
            }
            Sequence::AwaitingSubscriber { mut poll, polls } => {
                let elapsed = poll.tick(dt);
                if elapsed == 0 {
                    Sequence::AwaitingSubscriber { poll, polls }
                } else {
                    let polls = polls + elapsed;
                    let waited = polls as f32 * self.tuning.subscriber_poll_interval;
                    let attached = self.screen_ready || self.money_changed.has_subscribers();
                    if attached || waited >= self.tuning.subscriber_wait_limit {
                        if !attached {
                            log::warn!(
                                "No money subscriber after {:.1}s, continuing restart",
                                self.tuning.subscriber_wait_limit
                            );
                        }
                        self.emit_money();
                        self.emit_hp();
                        Sequence::StartDelay(Countdown::new(self.tuning.start_delay))
                    } else {
                        Sequence::AwaitingSubscriber { poll, polls }
                    }
                }
            }
        };

        self.sequence = next;
        signals
    }

    fn emit_money(&mut self) {
        self.money_changed.emit(&self.ledger.session_money);
    }

    fn emit_hp(&mut self) {
        let change = HpChange {
            hp: self.ledger.hp,
            max_hp: self.ledger.max_hp,
        };
        self.hp_changed.emit(&change);
    }
}
