//! Injected boundaries of the search-run engine.
//!
//! The engine owns no hardware. Everything it talks to (the velocity
//! tracking controller, the wall sensors, the long-range finder, the motor
//! driver, the trajectory generators) is handed in behind one of these
//! traits at construction, so the whole engine runs against synthetic
//! implementations in tests (see [`crate::sim`]).

use crate::core::RelativePose;
use std::time::{Duration, Instant};

/// Translational/rotational rate pair (mm/s, rad/s).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyRates {
    /// Translational component in mm/s
    pub tra: f32,
    /// Rotational component in rad/s
    pub rot: f32,
}

impl BodyRates {
    /// Create a new rate pair.
    #[inline]
    pub fn new(tra: f32, rot: f32) -> Self {
        Self { tra, rot }
    }
}

/// Velocity setpoint forwarded to the speed controller each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    /// Translational velocity in mm/s
    pub v: f32,
    /// Rotational velocity in rad/s
    pub w: f32,
    /// Translational acceleration feedforward in mm/s²
    pub dv: f32,
    /// Rotational acceleration feedforward in rad/s²
    pub dw: f32,
}

impl DriveCommand {
    /// Velocity-only setpoint with zero feedforward.
    #[inline]
    pub fn velocity(v: f32, w: f32) -> Self {
        Self {
            v,
            w,
            dv: 0.0,
            dw: 0.0,
        }
    }
}

/// Per-tick snapshot published by the speed controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionEstimate {
    /// Segment-relative pose estimate
    pub pose: RelativePose,
    /// Estimated body velocity
    pub velocity: BodyRates,
    /// Estimated body acceleration
    pub acceleration: BodyRates,
    /// Velocity reference the controller is currently tracking
    pub reference_velocity: BodyRates,
}

/// Per-tick wall sensor snapshot. Read-only to the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallSnapshot {
    /// Wall presence flags: [left, right, front]
    pub wall: [bool; 3],
    /// Raw side proximity readings in mm: [left, right]
    pub side: [f32; 2],
    /// Raw close-range front readings in mm: [left, right]
    pub front: [f32; 2],
}

/// Reference pose/velocity/acceleration/jerk sample fed to the tracker.
///
/// The velocity, acceleration and jerk fields reuse [`RelativePose`] as a
/// plain (x, y, θ) triple of derivatives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSample {
    pub q: RelativePose,
    pub dq: RelativePose,
    pub ddq: RelativePose,
    pub dddq: RelativePose,
}

impl ReferenceSample {
    /// Reference sample for progress along a straight segment axis.
    pub fn along_axis(x: f32, v: f32, a: f32, j: f32) -> Self {
        Self {
            q: RelativePose::new(x, 0.0, 0.0),
            dq: RelativePose::new(v, 0.0, 0.0),
            ddq: RelativePose::new(a, 0.0, 0.0),
            dddq: RelativePose::new(j, 0.0, 0.0),
        }
    }
}

/// Audible cues for the maneuvers that re-anchor the pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chime {
    /// Wall attach completed
    Short,
    /// Cell-boundary correction applied
    Cancel,
    /// Front-range calibration applied
    Select,
    /// Fault stop entered
    Error,
}

/// Downstream speed controller: accepts setpoints at the control rate and
/// publishes the fused pose/velocity estimate the engine closes its loops on.
///
/// The pose it publishes is engine-writable: the engine rebases it at segment
/// boundaries and nudges it from wall corrections.
pub trait VelocitySink: Send {
    /// Forward a velocity setpoint with acceleration feedforward.
    fn set_target(&mut self, command: DriveCommand);

    /// Enable closed-loop control.
    fn enable(&mut self);

    /// Disable closed-loop control and stop tracking.
    fn disable(&mut self);

    /// Latest published estimate.
    fn estimate(&self) -> MotionEstimate;

    /// Current segment-relative pose (shorthand for `estimate().pose`).
    fn pose(&self) -> RelativePose {
        self.estimate().pose
    }

    /// Overwrite the segment-relative pose (rebase or correction).
    fn set_pose(&mut self, pose: RelativePose);

    /// Zero the heading integrator feeding the estimate.
    fn zero_heading_reference(&mut self);
}

/// Short-range wall sensor array.
pub trait WallSensing: Send {
    /// Latest published snapshot.
    fn snapshot(&self) -> WallSnapshot;
}

/// Front-facing long-range finder.
pub trait RangeFinder: Send {
    /// Latest range in mm.
    fn distance_mm(&self) -> f32;

    /// Age of the last valid sample in ms.
    fn staleness_ms(&self) -> u32;

    /// Resume sampling.
    fn enable(&mut self);

    /// Pause sampling (readings are invalid nose-to-wall).
    fn disable(&mut self);
}

/// Open-loop motor access for the recovery primitives.
pub trait MotorDriver: Send {
    /// Drive both wheels open-loop at the given duty (-1.0..=1.0).
    fn drive(&mut self, left: f32, right: f32);

    /// Release the actuators (freewheel).
    fn release(&mut self);

    /// Unconditional actuator halt.
    fn emergency_stop(&mut self);
}

/// Audible feedback.
pub trait Indicator: Send {
    fn play(&mut self, chime: Chime);
}

/// Jerk-limited point-to-point profile over a fixed distance.
pub trait StraightProfile: Send {
    /// Total profile duration in seconds.
    fn duration(&self) -> f32;
    /// Position along the axis at time `t`, mm.
    fn position(&self, t: f32) -> f32;
    /// Velocity at time `t`, mm/s.
    fn velocity(&self, t: f32) -> f32;
    /// Acceleration at time `t`, mm/s².
    fn acceleration(&self, t: f32) -> f32;
    /// Jerk at time `t`, mm/s³.
    fn jerk(&self, t: f32) -> f32;
}

/// Factory for straight profiles.
pub trait StraightPlanner: Send {
    /// Build a profile from `v_start` through at most `v_max` to `v_end`
    /// over `distance` mm, within the given jerk/acceleration limits.
    fn plan(
        &self,
        jerk: f32,
        accel: f32,
        v_start: f32,
        v_max: f32,
        v_end: f32,
        distance: f32,
    ) -> Box<dyn StraightProfile>;
}

/// Stateful slalom shape for one turn direction.
pub trait CurveProfile: Send {
    /// Rewind the shape for a pass at the given entry velocity.
    fn reset(&mut self, velocity: f32);
    /// Advance by `dt` seconds and return the next reference sample.
    fn advance(&mut self, dt: f32) -> ReferenceSample;
    /// Total shape duration at the configured velocity, seconds.
    fn duration(&self) -> f32;
    /// Straight run-in before the arc, mm.
    fn pre_straight_mm(&self) -> f32;
    /// Straight run-out after the arc, mm.
    fn post_straight_mm(&self) -> f32;
    /// Net displacement and rotation of the completed shape.
    fn net_curve(&self) -> RelativePose;
}

/// Closed-loop reference tracker: maps (estimate, reference) to a corrected
/// velocity command for the sink.
pub trait ReferenceTracker: Send {
    /// Re-initialize tracker state at the given translational velocity.
    fn reset(&mut self, velocity: f32);

    /// One tracking step.
    fn track(&mut self, estimate: &MotionEstimate, reference: &ReferenceSample) -> DriveCommand;
}

/// Control-period pacing.
///
/// Production implementations block until the next period boundary; the
/// simulation advances virtual time instantly so tests run without delay.
pub trait ControlClock: Send {
    /// Block until the next control period boundary.
    fn wait_tick(&mut self);
}

/// Wall-clock pacer aligned to a fixed period.
///
/// Sleeps toward a running deadline rather than a fixed offset from "now",
/// so jitter does not accumulate; if the loop falls behind by more than one
/// period the deadline is re-anchored instead of replaying missed ticks.
pub struct IntervalClock {
    period: Duration,
    next: Instant,
}

impl IntervalClock {
    /// Create a pacer with the given period.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }
}

impl ControlClock for IntervalClock {
    fn wait_tick(&mut self) {
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
        }
        self.next += self.period;
        let now = Instant::now();
        if self.next < now {
            self.next = now + self.period;
        }
    }
}
