//! Cooperative timers advanced by frame delta time
//!
//! Every wait in the simulation ("wait N seconds", periodic work) is one of
//! these, stored as plain state and advanced once per tick.

use serde::{Deserialize, Serialize};

/// One-shot countdown. Fires exactly once when it reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f32,
    fired: bool,
}

impl Countdown {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
            fired: false,
        }
    }

    /// Advance by `dt`; true only on the tick the countdown elapses
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.fired {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.fired = true;
            return true;
        }
        false
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.fired
    }
}

/// Fixed-period repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Repeating {
    period: f32,
    accumulator: f32,
}

impl Repeating {
    pub fn new(period: f32) -> Self {
        Self {
            period,
            accumulator: 0.0,
        }
    }

    /// Advance by `dt`; returns the number of periods that elapsed
    pub fn tick(&mut self, dt: f32) -> u32 {
        if self.period <= 0.0 {
            return 0;
        }
        self.accumulator += dt;
        let mut fired = 0;
        while self.accumulator >= self.period {
            self.accumulator -= self.period;
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_fires_once() {
        let mut timer = Countdown::new(0.25);
        assert!(!timer.tick(0.1));
        assert!(!timer.tick(0.1));
        assert!(timer.tick(0.1));
        assert!(timer.is_finished());
        assert!(!timer.tick(0.1));
    }

    #[test]
    fn test_zero_countdown_fires_on_first_tick() {
        let mut timer = Countdown::new(0.0);
        assert!(timer.tick(0.0));
    }

    #[test]
    fn test_repeating_counts_periods() {
        let mut timer = Repeating::new(0.5);
        assert_eq!(timer.tick(0.4), 0);
        assert_eq!(timer.tick(0.2), 1);
        assert_eq!(timer.tick(1.0), 2);
    }
}
