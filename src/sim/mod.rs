//! Synthetic zero-noise world for tests and the demo binary.
//!
//! Every engine boundary gets an implementation backed by one shared
//! [`SimWorld`]: the clock advances virtual time instantly and integrates
//! ideal unicycle kinematics from the last commanded target, the sink
//! publishes that state back as a perfect estimate, and the sensors report
//! whatever the scenario has staged in the world. This is the crate's
//! equivalent of a bag-player client: API-compatible stand-ins that let the
//! full engine run without hardware or real-time delay.

use parking_lot::Mutex;
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::core::{normalize_angle, RelativePose};
use crate::engine::{EngineDeps, SearchRun};
use crate::traits::{
    BodyRates, Chime, ControlClock, CurveProfile, DriveCommand, Indicator, MotionEstimate,
    MotorDriver, RangeFinder, ReferenceSample, ReferenceTracker, StraightPlanner, StraightProfile,
    VelocitySink, WallSensing, WallSnapshot,
};

/// Mutable state of the simulated robot and its surroundings.
#[derive(Debug)]
pub struct SimWorld {
    /// Segment-relative pose the sink publishes (engine-writable)
    pub pose: RelativePose,
    /// Current body velocity
    pub velocity: BodyRates,
    /// Last commanded target
    pub target: DriveCommand,
    /// Closed-loop control enabled
    pub closed_loop: bool,
    /// Heading reference was zeroed (StartStep)
    pub heading_zeroed: bool,
    /// Staged wall sensor snapshot
    pub walls: WallSnapshot,
    /// Staged long-range reading in mm
    pub range_mm: f32,
    /// Staged long-range staleness in ms
    pub staleness_ms: u32,
    /// Long-range sensor enabled
    pub range_enabled: bool,
    /// Virtual time in ms
    pub time_ms: u64,
    /// Total forward travel integrated over the run, mm
    pub travelled_mm: f32,
    /// Chimes played, in order
    pub chimes: Vec<Chime>,
    /// Open-loop motor commands issued, in order
    pub motor_drives: Vec<(f32, f32)>,
    /// Actuators released (freewheel)
    pub released: bool,
    /// Emergency stop latched
    pub emergency_stopped: bool,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self {
            pose: RelativePose::default(),
            velocity: BodyRates::default(),
            target: DriveCommand::default(),
            closed_loop: false,
            heading_zeroed: false,
            walls: WallSnapshot::default(),
            range_mm: 1000.0,
            staleness_ms: 0,
            range_enabled: true,
            time_ms: 0,
            travelled_mm: 0.0,
            chimes: Vec::new(),
            motor_drives: Vec::new(),
            released: false,
            emergency_stopped: false,
        }
    }
}

impl SimWorld {
    /// Integrate one control period of ideal unicycle kinematics.
    fn step(&mut self, dt: f32) {
        if self.closed_loop {
            self.velocity = BodyRates::new(self.target.v, self.target.w);
        } else {
            self.velocity = BodyRates::default();
        }
        let (sin_t, cos_t) = self.pose.theta.sin_cos();
        self.pose.x += self.velocity.tra * cos_t * dt;
        self.pose.y += self.velocity.tra * sin_t * dt;
        self.pose.theta = normalize_angle(self.pose.theta + self.velocity.rot * dt);
        self.travelled_mm += self.velocity.tra * dt;
        self.time_ms += 1;
    }
}

/// Shared handle to the simulated world plus dependency factory.
pub struct SimHarness {
    world: Arc<Mutex<SimWorld>>,
    period_s: f32,
}

impl Default for SimHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHarness {
    pub fn new() -> Self {
        Self {
            world: Arc::new(Mutex::new(SimWorld::default())),
            period_s: 0.001,
        }
    }

    /// Shared world handle for staging scenarios and asserting outcomes.
    pub fn world(&self) -> &Arc<Mutex<SimWorld>> {
        &self.world
    }

    /// Full set of engine dependencies backed by this world.
    pub fn deps(&self) -> EngineDeps {
        EngineDeps {
            sink: Box::new(SimSink {
                world: Arc::clone(&self.world),
            }),
            walls: Box::new(SimWalls {
                world: Arc::clone(&self.world),
            }),
            range: Box::new(SimRange {
                world: Arc::clone(&self.world),
            }),
            motors: Box::new(SimMotors {
                world: Arc::clone(&self.world),
            }),
            indicator: Box::new(SimIndicator {
                world: Arc::clone(&self.world),
            }),
            tracker: Box::new(SimTracker),
            planner: Box::new(SimStraightPlanner),
            left_curve: Box::new(SimCurveProfile::new(1.0)),
            right_curve: Box::new(SimCurveProfile::new(-1.0)),
            clock: Box::new(SimClock {
                world: Arc::clone(&self.world),
                period_s: self.period_s,
            }),
        }
    }

    /// Convenience: a ready-to-enable [`SearchRun`] over this world.
    pub fn search_run(&self, cfg: SearchConfig) -> SearchRun {
        SearchRun::new(cfg, self.deps())
    }
}

struct SimSink {
    world: Arc<Mutex<SimWorld>>,
}

impl VelocitySink for SimSink {
    fn set_target(&mut self, command: DriveCommand) {
        self.world.lock().target = command;
    }

    fn enable(&mut self) {
        self.world.lock().closed_loop = true;
    }

    fn disable(&mut self) {
        let mut world = self.world.lock();
        world.closed_loop = false;
        world.target = DriveCommand::default();
        world.velocity = BodyRates::default();
    }

    fn estimate(&self) -> MotionEstimate {
        let world = self.world.lock();
        MotionEstimate {
            pose: world.pose,
            velocity: world.velocity,
            acceleration: BodyRates::default(),
            reference_velocity: BodyRates::new(world.target.v, world.target.w),
        }
    }

    fn set_pose(&mut self, pose: RelativePose) {
        self.world.lock().pose = pose;
    }

    fn zero_heading_reference(&mut self) {
        self.world.lock().heading_zeroed = true;
    }
}

struct SimWalls {
    world: Arc<Mutex<SimWorld>>,
}

impl WallSensing for SimWalls {
    fn snapshot(&self) -> WallSnapshot {
        self.world.lock().walls
    }
}

struct SimRange {
    world: Arc<Mutex<SimWorld>>,
}

impl RangeFinder for SimRange {
    fn distance_mm(&self) -> f32 {
        self.world.lock().range_mm
    }

    fn staleness_ms(&self) -> u32 {
        self.world.lock().staleness_ms
    }

    fn enable(&mut self) {
        self.world.lock().range_enabled = true;
    }

    fn disable(&mut self) {
        self.world.lock().range_enabled = false;
    }
}

struct SimMotors {
    world: Arc<Mutex<SimWorld>>,
}

impl MotorDriver for SimMotors {
    fn drive(&mut self, left: f32, right: f32) {
        self.world.lock().motor_drives.push((left, right));
    }

    fn release(&mut self) {
        self.world.lock().released = true;
    }

    fn emergency_stop(&mut self) {
        let mut world = self.world.lock();
        world.emergency_stopped = true;
        world.velocity = BodyRates::default();
    }
}

struct SimIndicator {
    world: Arc<Mutex<SimWorld>>,
}

impl Indicator for SimIndicator {
    fn play(&mut self, chime: Chime) {
        self.world.lock().chimes.push(chime);
    }
}

/// Pure-feedforward tracker: with perfect state there is nothing to correct.
struct SimTracker;

impl ReferenceTracker for SimTracker {
    fn reset(&mut self, _velocity: f32) {}

    fn track(&mut self, _estimate: &MotionEstimate, reference: &ReferenceSample) -> DriveCommand {
        DriveCommand {
            v: (reference.dq.x * reference.dq.x + reference.dq.y * reference.dq.y).sqrt(),
            w: reference.dq.theta,
            dv: (reference.ddq.x * reference.ddq.x + reference.ddq.y * reference.ddq.y).sqrt(),
            dw: reference.ddq.theta,
        }
    }
}

/// Constant-velocity straight profile: covers the distance at `v_max`.
struct SimStraightProfile {
    cruise: f32,
    duration: f32,
}

impl StraightProfile for SimStraightProfile {
    fn duration(&self) -> f32 {
        self.duration
    }

    fn position(&self, t: f32) -> f32 {
        self.cruise * t
    }

    fn velocity(&self, _t: f32) -> f32 {
        self.cruise
    }

    fn acceleration(&self, _t: f32) -> f32 {
        0.0
    }

    fn jerk(&self, _t: f32) -> f32 {
        0.0
    }
}

struct SimStraightPlanner;

impl StraightPlanner for SimStraightPlanner {
    fn plan(
        &self,
        _jerk: f32,
        _accel: f32,
        _v_start: f32,
        v_max: f32,
        _v_end: f32,
        distance: f32,
    ) -> Box<dyn StraightProfile> {
        let cruise = v_max.max(1.0);
        let duration = if distance > 0.0 {
            distance / cruise
        } else {
            0.0
        };
        Box::new(SimStraightProfile { cruise, duration })
    }
}

/// Quarter-circle slalom stand-in with fixed radius and symmetric run-in/out.
struct SimCurveProfile {
    /// +1 for left, -1 for right
    direction: f32,
    radius_mm: f32,
    velocity: f32,
    elapsed: f32,
}

impl SimCurveProfile {
    fn new(direction: f32) -> Self {
        Self {
            direction,
            radius_mm: 40.0,
            velocity: 1.0,
            elapsed: 0.0,
        }
    }

    fn omega(&self) -> f32 {
        self.velocity / self.radius_mm
    }
}

impl CurveProfile for SimCurveProfile {
    fn reset(&mut self, velocity: f32) {
        self.velocity = velocity.max(1.0);
        self.elapsed = 0.0;
    }

    fn advance(&mut self, dt: f32) -> ReferenceSample {
        self.elapsed += dt;
        let omega = self.omega();
        let sweep = (omega * self.elapsed).min(FRAC_PI_2);
        let (sin_s, cos_s) = sweep.sin_cos();
        ReferenceSample {
            q: RelativePose::new(
                self.radius_mm * sin_s,
                self.direction * self.radius_mm * (1.0 - cos_s),
                self.direction * sweep,
            ),
            dq: RelativePose::new(
                self.velocity * cos_s,
                self.direction * self.velocity * sin_s,
                self.direction * omega,
            ),
            ddq: RelativePose::default(),
            dddq: RelativePose::default(),
        }
    }

    fn duration(&self) -> f32 {
        FRAC_PI_2 / self.omega()
    }

    fn pre_straight_mm(&self) -> f32 {
        10.0
    }

    fn post_straight_mm(&self) -> f32 {
        10.0
    }

    fn net_curve(&self) -> RelativePose {
        RelativePose::new(
            self.radius_mm,
            self.direction * self.radius_mm,
            self.direction * FRAC_PI_2,
        )
    }
}

/// Virtual-time clock: each wait advances the world by one period instantly.
struct SimClock {
    world: Arc<Mutex<SimWorld>>,
    period_s: f32,
}

impl ControlClock for SimClock {
    fn wait_tick(&mut self) {
        self.world.lock().step(self.period_s);
    }
}
