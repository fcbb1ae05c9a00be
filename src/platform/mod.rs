//! Platform abstraction layer
//!
//! Host services the simulation depends on but never implements itself:
//! - Screen/scene transitions
//! - Input signals

/// Screen transition service.
///
/// `load_screen` is fire-and-forget; callers that need to continue after a
/// load poll `poll_complete` once per frame.
pub trait SceneLoader {
    fn load_screen(&mut self, name: &str);
    /// True once the most recent load has finished
    fn poll_complete(&mut self) -> bool;
}

/// Scene loader that finishes each load after a fixed number of polls.
/// Records every requested screen.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSceneLoader {
    polls_per_load: u32,
    pending: Option<u32>,
    history: Vec<String>,
}

impl ScriptedSceneLoader {
    pub fn new(polls_per_load: u32) -> Self {
        Self {
            polls_per_load,
            pending: None,
            history: Vec::new(),
        }
    }

    /// Every screen requested so far, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

impl SceneLoader for ScriptedSceneLoader {
    fn load_screen(&mut self, name: &str) {
        log::info!("Loading screen '{}'", name);
        self.history.push(name.to_string());
        self.pending = Some(self.polls_per_load);
    }

    fn poll_complete(&mut self) -> bool {
        match self.pending {
            None => true,
            Some(0) => {
                self.pending = None;
                true
            }
            Some(n) => {
                self.pending = Some(n - 1);
                false
            }
        }
    }
}

/// Edge-triggered input for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub lane_left: bool,
    pub lane_right: bool,
}

impl FrameInput {
    pub fn left() -> Self {
        Self {
            lane_left: true,
            lane_right: false,
        }
    }

    pub fn right() -> Self {
        Self {
            lane_left: false,
            lane_right: true,
        }
    }

    /// Net lane step requested this frame (left wins ties, like key polling order)
    pub fn lane_step(&self) -> i32 {
        if self.lane_left {
            -1
        } else if self.lane_right {
            1
        } else {
            0
        }
    }
}
