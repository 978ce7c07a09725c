//! VyuhaNav - Search-run motion core for a maze-solving micromouse
//!
//! Converts a stream of discrete navigation commands ("go straight one
//! cell", "turn left 90°", "return", ...) into continuously updated
//! velocity setpoints for a downstream speed controller, while correcting
//! dead-reckoned drift against the maze walls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Dispatch + motion primitives
//! │   (straight, turn, trace, walls, recovery)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │               queue / shared                        │  ← Planner + supervisor surface
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    traits                           │  ← Injected hardware boundaries
//! │  (sink, walls, range, motors, profiles, clock)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (pose, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The engine runs on one dedicated task at a 1 kHz control period. The
//! central invariant is the segment-relative pose: every primitive measures
//! progress against the pose at its own start and rebases it on completion
//! (planned distance, turned angle, or a curve's net motion), so estimation
//! error never accumulates beyond one segment. Wall information supplies
//! the discrete corrections that keep each segment honest.
//!
//! `sim` provides a synthetic zero-noise world implementing every boundary
//! trait, so the whole engine is exercised in tests and the `search_sim`
//! binary without hardware.

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod queue;
pub mod shared;
pub mod sim;
pub mod traits;

pub use config::SearchConfig;
pub use core::{normalize_angle, RelativePose};
pub use engine::{EngineDeps, SearchRun};
pub use error::{NavError, Result};
pub use queue::{ActionKind, CommandQueue, Operation};
pub use shared::EngineState;
