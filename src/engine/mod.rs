//! Search-run execution engine.
//!
//! A single dedicated task pulls coalesced operations off the command queue
//! and executes them one at a time through the motion primitives, applying
//! wall-referenced corrections continuously. While the queue is empty the
//! task holds course down the corridor center; it never blocks on the
//! planner.
//!
//! Submodules implement the primitives on [`SearchEngine`]:
//! [`straight`](self::straight) (profiled segments), [`turn`](self::turn)
//! (in-place rotation), [`trace`](self::trace) (slalom transitions),
//! [`walls`](self::walls) (corrections), [`recovery`](self::recovery)
//! (fault and stall maneuvers).

mod recovery;
mod straight;
mod trace;
mod turn;
mod walls;

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::SearchConfig;
use crate::core::RelativePose;
use crate::error::{NavError, Result};
use crate::queue::{ActionKind, CommandQueue, Operation};
use crate::shared::{EngineShared, EngineState};
use crate::traits::{
    ControlClock, CurveProfile, DriveCommand, Indicator, MotorDriver, RangeFinder,
    ReferenceTracker, StraightPlanner, VelocitySink, WallSensing,
};

/// Marker for a maneuver unwound by `disable()`.
#[derive(Debug)]
pub(crate) struct Interrupted;

/// Result of one primitive or dispatch step.
pub(crate) type Step = std::result::Result<(), Interrupted>;

/// Which way a slalom transition bends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnSide {
    Left,
    Right,
}

impl TurnSide {
    /// Index of the side wall a turn in this direction pivots around.
    fn wall_index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// Everything the engine talks to, injected at construction.
pub struct EngineDeps {
    pub sink: Box<dyn VelocitySink>,
    pub walls: Box<dyn WallSensing>,
    pub range: Box<dyn RangeFinder>,
    pub motors: Box<dyn MotorDriver>,
    pub indicator: Box<dyn Indicator>,
    pub tracker: Box<dyn ReferenceTracker>,
    pub planner: Box<dyn StraightPlanner>,
    pub left_curve: Box<dyn CurveProfile>,
    pub right_curve: Box<dyn CurveProfile>,
    pub clock: Box<dyn ControlClock>,
}

/// Engine state owned by the search-run task.
pub(crate) struct SearchEngine {
    pub(crate) cfg: SearchConfig,
    pub(crate) sink: Box<dyn VelocitySink>,
    pub(crate) walls: Box<dyn WallSensing>,
    pub(crate) range: Box<dyn RangeFinder>,
    pub(crate) motors: Box<dyn MotorDriver>,
    pub(crate) indicator: Box<dyn Indicator>,
    pub(crate) tracker: Box<dyn ReferenceTracker>,
    pub(crate) planner: Box<dyn StraightPlanner>,
    left_curve: Box<dyn CurveProfile>,
    right_curve: Box<dyn CurveProfile>,
    pub(crate) clock: Box<dyn ControlClock>,
    queue: Arc<CommandQueue>,
    pub(crate) shared: Arc<EngineShared>,
    /// One-tick wall presence history for edge detection, per side.
    pub(crate) prev_wall: [bool; 2],
}

impl SearchEngine {
    pub(crate) fn new(
        cfg: SearchConfig,
        deps: EngineDeps,
        queue: Arc<CommandQueue>,
        shared: Arc<EngineShared>,
    ) -> Self {
        Self {
            cfg,
            sink: deps.sink,
            walls: deps.walls,
            range: deps.range,
            motors: deps.motors,
            indicator: deps.indicator,
            tracker: deps.tracker,
            planner: deps.planner,
            left_curve: deps.left_curve,
            right_curve: deps.right_curve,
            clock: deps.clock,
            queue,
            shared,
            prev_wall: [false; 2],
        }
    }

    /// Task body. Returns the engine to the handle on shutdown so it can be
    /// restarted by a later `enable()`.
    pub(crate) fn run(mut self) -> Self {
        self.prev_wall = [false; 2];
        self.sink.enable();
        tracing::info!("search-run task started");
        loop {
            if self.hold_course().is_err() {
                break;
            }
            let Some(op) = self.queue.dequeue_coalesced() else {
                continue;
            };
            self.shared.set_state(EngineState::Running);
            tracing::info!(action = op.action.name(), count = op.count, "dispatch");
            self.log_pose("start");
            let flow = self.dispatch(op);
            self.log_pose("end");
            if flow.is_err() {
                break;
            }
        }
        self.sink.set_target(DriveCommand::default());
        self.sink.disable();
        tracing::info!("search-run task stopped");
        self
    }

    /// Wait one control period; fails when `disable()` has been requested.
    pub(crate) fn tick(&mut self) -> Step {
        self.clock.wait_tick();
        if self.shared.should_shutdown() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Hold course down the corridor center until the queue is non-empty.
    ///
    /// Steers with a look-ahead heading correction proportional to the
    /// lateral offset; the look-ahead distance grows mildly with speed.
    fn hold_course(&mut self) -> Step {
        if !self.queue.is_empty() {
            return Ok(());
        }
        self.shared.set_state(EngineState::Idle);
        self.shared.set_busy(false);
        let v = self.cfg.speed.search_mm_s;
        let look_ahead = self.cfg.idle.look_ahead_mm + self.cfg.idle.look_ahead_gain * v;
        while self.queue.is_empty() {
            self.tick()?;
            let pose = self.sink.pose();
            let heading_error = (-pose.y).atan2(look_ahead) - pose.theta;
            self.sink.set_target(DriveCommand::velocity(
                v,
                self.cfg.idle.heading_gain * heading_error,
            ));
            self.wall_avoid(0.0);
        }
        Ok(())
    }

    fn dispatch(&mut self, op: Operation) -> Step {
        let v = self.cfg.speed.search_mm_s;
        let v_max = self.cfg.speed.peak_mm_s;
        let cell = self.cfg.geometry.cell_mm;
        let ahead = self.cfg.geometry.ahead_mm;
        match op.action {
            ActionKind::StartStep => {
                self.sink.set_pose(RelativePose::default());
                self.sink.zero_heading_reference();
                let length = self.cfg.start_step_mm();
                self.straight(length, v, v)
            }
            ActionKind::StartInit => {
                self.straight(cell / 2.0 - ahead, v, 0.0)?;
                self.wall_attach(false)?;
                self.turn(FRAC_PI_2, false)?;
                self.wall_attach(false)?;
                self.turn(FRAC_PI_2, false)?;
                self.put_back()?;
                self.motors.release();
                self.park()
            }
            ActionKind::GoStraight => {
                if self.walls.snapshot().wall[2] {
                    return self.fault_stop("front wall flagged before a straight");
                }
                let profile_max = if op.count > 1 { v_max } else { v };
                self.straight(cell * op.count as f32, profile_max, v)
            }
            ActionKind::GoHalf => self.straight(cell / 2.0 * op.count as f32, v, v),
            ActionKind::TurnLeft90 => self.turn_90(TurnSide::Left, op.count),
            ActionKind::TurnRight90 => self.turn_90(TurnSide::Right, op.count),
            ActionKind::TurnBack => {
                self.straight(cell / 2.0 - ahead, v, 0.0)?;
                self.u_turn()?;
                self.straight(cell / 2.0 + ahead, v, v)
            }
            ActionKind::Return => self.u_turn(),
            ActionKind::Stop => {
                self.straight(cell / 2.0 - ahead, v, 0.0)?;
                // Zero-angle turn flushes residual heading state
                self.turn(0.0, true)?;
                self.sink.disable();
                self.park()
            }
        }
    }

    /// Calibrate, run in, slalom, run out, repeated `count` times.
    fn turn_90(&mut self, side: TurnSide, count: u32) -> Step {
        let v = self.cfg.speed.search_mm_s;
        let ahead = self.cfg.geometry.ahead_mm;
        for _ in 0..count {
            if !self.walls.snapshot().wall[side.wall_index()] {
                return self.fault_stop("expected side wall absent before a turn");
            }
            self.wall_calib(v);
            let pre = self.curve_mut(side).pre_straight_mm();
            self.straight(pre - ahead, v, v)?;
            self.trace(side, v)?;
            let post = self.curve_mut(side).post_straight_mm();
            self.straight(post + ahead, v, v)?;
        }
        Ok(())
    }

    /// Terminal state: consume ticks until `disable()` unwinds the task.
    pub(crate) fn park(&mut self) -> Step {
        self.shared.set_state(EngineState::Halted);
        self.shared.set_busy(!self.queue.is_empty());
        tracing::warn!("engine halted; external enable() required to resume");
        loop {
            self.tick()?;
        }
    }

    pub(crate) fn curve_mut(&mut self, side: TurnSide) -> &mut dyn CurveProfile {
        match side {
            TurnSide::Left => self.left_curve.as_mut(),
            TurnSide::Right => self.right_curve.as_mut(),
        }
    }

    fn log_pose(&self, label: &str) {
        let p = self.sink.pose();
        tracing::debug!(
            x = p.x,
            y = p.y,
            theta_deg = p.theta.to_degrees(),
            "{label} pose"
        );
    }
}

/// Handle exposed to the planner and the supervisor.
///
/// `enqueue`/`is_busy` are the planner surface; `enable`/`disable` the
/// supervisor surface. The engine itself lives on a named worker thread
/// between `enable()` and `disable()` and inside the handle otherwise.
pub struct SearchRun {
    queue: Arc<CommandQueue>,
    shared: Arc<EngineShared>,
    worker: Option<JoinHandle<SearchEngine>>,
    engine: Option<SearchEngine>,
}

impl SearchRun {
    /// Build a run handle around the injected dependencies.
    pub fn new(cfg: SearchConfig, deps: EngineDeps) -> Self {
        let queue = Arc::new(CommandQueue::new());
        let shared = Arc::new(EngineShared::new());
        let engine = SearchEngine::new(cfg, deps, Arc::clone(&queue), Arc::clone(&shared));
        Self {
            queue,
            shared,
            worker: None,
            engine: Some(engine),
        }
    }

    /// Append an operation for the engine and mark the run busy.
    pub fn enqueue(&self, action: ActionKind, count: u32) {
        self.queue.push(action, count);
        self.shared.set_busy(true);
    }

    /// True while the queue is non-empty or a maneuver is executing.
    pub fn is_busy(&self) -> bool {
        self.shared.is_busy()
    }

    /// Number of operations still queued.
    pub fn pending_operations(&self) -> usize {
        self.queue.len()
    }

    /// Coarse engine state for diagnostics and tests.
    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// Start (or restart) the search-run task.
    pub fn enable(&mut self) -> Result<()> {
        if self.worker.is_some() {
            self.disable();
        }
        let engine = self
            .engine
            .take()
            .ok_or(NavError::Lifecycle("engine state lost to a panicked task"))?;
        self.shared.clear_shutdown();
        self.shared.set_state(EngineState::Idle);
        self.shared.set_busy(!self.queue.is_empty());
        let handle = std::thread::Builder::new()
            .name("search-run".into())
            .spawn(move || engine.run())?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Halt the task, drain the queue and disable the sink.
    ///
    /// Idempotent: safe to call repeatedly and while already disabled.
    pub fn disable(&mut self) {
        self.shared.signal_shutdown();
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(engine) => self.engine = Some(engine),
                Err(_) => tracing::error!("search-run task panicked"),
            }
        }
        self.queue.reset();
        self.shared.set_busy(false);
        self.shared.set_state(EngineState::Idle);
        self.shared.clear_shutdown();
    }

    /// Re-establish a known pose after an uncontrolled disturbance.
    ///
    /// Runs synchronously on the caller; the engine task must be disabled.
    pub fn position_recovery(&mut self) -> Result<()> {
        let engine = self
            .engine
            .as_mut()
            .ok_or(NavError::Lifecycle("engine task is running; disable first"))?;
        engine
            .position_recovery()
            .map_err(|_| NavError::Lifecycle("position recovery interrupted"))
    }
}

impl Drop for SearchRun {
    fn drop(&mut self) {
        self.disable();
    }
}
