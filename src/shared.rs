//! Lock-free state shared between the engine task and its callers.
//!
//! The planner polls `is_busy`, the supervisor flips the shutdown flag from
//! `disable()`, and the engine publishes its coarse state, all without
//! taking a lock on the 1 kHz path.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Coarse externally observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// Queue empty, hold-course loop running
    Idle = 0,
    /// Executing a dequeued operation
    Running = 1,
    /// Terminal state; only `disable()`/`enable()` exits
    Halted = 2,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Halted,
            _ => Self::Idle,
        }
    }
}

/// Flags shared between the engine thread and its callers.
#[derive(Debug, Default)]
pub struct EngineShared {
    busy: AtomicBool,
    shutdown: AtomicBool,
    state: AtomicU8,
}

impl EngineShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the queue is non-empty or a maneuver is executing.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    /// Ask the engine task to unwind at the next tick boundary.
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Re-arm after a completed shutdown so the task can be restarted.
    pub fn clear_shutdown(&self) {
        self.shutdown.store(false, Ordering::Release);
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips() {
        let shared = EngineShared::new();
        assert_eq!(shared.state(), EngineState::Idle);
        shared.set_state(EngineState::Halted);
        assert_eq!(shared.state(), EngineState::Halted);
        shared.set_state(EngineState::Running);
        assert_eq!(shared.state(), EngineState::Running);
    }

    #[test]
    fn shutdown_flag_re_arms() {
        let shared = EngineShared::new();
        shared.signal_shutdown();
        assert!(shared.should_shutdown());
        shared.clear_shutdown();
        assert!(!shared.should_shutdown());
    }
}
