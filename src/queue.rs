//! Command queue between the planner and the engine.
//!
//! The planner pushes `(action, count)` operations; the engine pops them one
//! coalesced batch at a time. Adjacent operations with the same action are
//! merged by summing counts, so three queued one-cell straights execute as a
//! single three-cell segment with a higher peak-velocity profile.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Discrete navigation actions the engine executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    StartStep,
    StartInit,
    GoStraight,
    GoHalf,
    TurnLeft90,
    TurnRight90,
    TurnBack,
    Return,
    Stop,
}

impl ActionKind {
    /// Stable lowercase name used in dispatch logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartStep => "start_step",
            Self::StartInit => "start_init",
            Self::GoStraight => "go_straight",
            Self::GoHalf => "go_half",
            Self::TurnLeft90 => "turn_left_90",
            Self::TurnRight90 => "turn_right_90",
            Self::TurnBack => "turn_back",
            Self::Return => "return",
            Self::Stop => "stop",
        }
    }
}

/// One queued operation. Immutable once enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub action: ActionKind,
    /// Repeat count, at least 1.
    pub count: u32,
}

/// Single-producer/single-consumer FIFO of operations.
///
/// The planner is the only producer, the engine the only consumer; `reset`
/// may be called from either side and empties the queue atomically.
#[derive(Debug, Default)]
pub struct CommandQueue {
    ops: Mutex<VecDeque<Operation>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation. A zero count is promoted to 1.
    pub fn push(&self, action: ActionKind, count: u32) {
        let mut ops = self.ops.lock();
        ops.push_back(Operation {
            action,
            count: count.max(1),
        });
    }

    /// Pop the front operation merged with every immediately following
    /// operation of the same action.
    pub fn dequeue_coalesced(&self) -> Option<Operation> {
        let mut ops = self.ops.lock();
        let mut merged = ops.pop_front()?;
        while let Some(next) = ops.front() {
            if next.action != merged.action {
                break;
            }
            merged.count += next.count;
            ops.pop_front();
        }
        Some(merged)
    }

    /// Drain the queue unconditionally. Safe on an empty queue.
    pub fn reset(&self) {
        self.ops.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_adjacent_same_actions() {
        let q = CommandQueue::new();
        q.push(ActionKind::GoStraight, 1);
        q.push(ActionKind::GoStraight, 1);
        q.push(ActionKind::GoStraight, 1);
        q.push(ActionKind::TurnLeft90, 1);

        assert_eq!(
            q.dequeue_coalesced(),
            Some(Operation {
                action: ActionKind::GoStraight,
                count: 3
            })
        );
        assert_eq!(
            q.dequeue_coalesced(),
            Some(Operation {
                action: ActionKind::TurnLeft90,
                count: 1
            })
        );
        assert_eq!(q.dequeue_coalesced(), None);
    }

    #[test]
    fn coalescing_stops_at_action_change() {
        let q = CommandQueue::new();
        q.push(ActionKind::GoStraight, 2);
        q.push(ActionKind::TurnRight90, 1);
        q.push(ActionKind::GoStraight, 1);

        assert_eq!(q.dequeue_coalesced().unwrap().count, 2);
        assert_eq!(
            q.dequeue_coalesced().unwrap().action,
            ActionKind::TurnRight90
        );
        // The trailing straight was not merged across the turn
        assert_eq!(q.dequeue_coalesced().unwrap().count, 1);
    }

    #[test]
    fn reset_is_idempotent() {
        let q = CommandQueue::new();
        q.push(ActionKind::GoHalf, 4);
        q.reset();
        q.reset();
        assert!(q.is_empty());
        assert_eq!(q.dequeue_coalesced(), None);
    }

    #[test]
    fn zero_count_is_promoted() {
        let q = CommandQueue::new();
        q.push(ActionKind::Return, 0);
        assert_eq!(q.dequeue_coalesced().unwrap().count, 1);
    }
}
