//! Search-Run Engine Scenario Tests
//!
//! Synthetic zero-noise runs through the simulated world to validate the
//! engine's externally observable contract without hardware:
//! - Full search sequence ends in the terminal state with the pose rebased
//! - Fault paths refuse to drive and halt the actuators
//! - Lifecycle calls are idempotent and restart cleanly
//!
//! | Scenario | Expectation |
//! |----------|-------------|
//! | start, 2 straights, right turn, straight, stop | Halted, not busy, ~872 mm travelled |
//! | straight with front wall flagged | Halted, zero travel, emergency stop |
//! | disable twice | no panic, not busy |
//! | fault then re-enable | engine runs again |
//!
//! Run with: `cargo test --test search_run`

use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use vyuha_nav::sim::SimHarness;
use vyuha_nav::traits::Chime;
use vyuha_nav::{ActionKind, EngineState, SearchConfig};

/// Poll until `cond` holds or the timeout elapses; returns the final value.
fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[test]
fn full_search_sequence_reaches_terminal_stop() {
    let harness = SimHarness::new();
    // The right-hand wall TurnRight90 expects to pivot around. Side
    // distances stay zero so continuous avoidance is a no-op.
    harness.world().lock().walls.wall[1] = true;

    let mut run = harness.search_run(SearchConfig::default());
    run.enqueue(ActionKind::StartStep, 1);
    run.enqueue(ActionKind::GoStraight, 1);
    run.enqueue(ActionKind::GoStraight, 1);
    run.enqueue(ActionKind::TurnRight90, 1);
    run.enqueue(ActionKind::GoStraight, 1);
    run.enqueue(ActionKind::Stop, 1);
    run.enable().unwrap();

    assert!(
        wait_until(|| run.state() == EngineState::Halted, Duration::from_secs(10)),
        "engine never reached the terminal state"
    );
    assert!(!run.is_busy());
    assert_eq!(run.pending_operations(), 0);

    let world = harness.world().lock();
    // StartStep (159) + coalesced 2-cell straight (360) + turn run-in/out
    // (2x10) + quarter arc (~62.8) + one cell (180) + stopping half cell
    // (90), each quantized up by at most one tick of travel.
    assert_relative_eq!(world.travelled_mm, 872.0, epsilon = 5.0);
    // StartStep zeroed the heading reference before driving out
    assert!(world.heading_zeroed);
    // The terminal stop disabled closed-loop control
    assert!(!world.closed_loop);
    drop(world);

    run.disable();
    assert!(!run.is_busy());
}

#[test]
fn straight_into_flagged_front_wall_faults_without_moving() {
    let harness = SimHarness::new();
    harness.world().lock().walls.wall[2] = true;

    let mut run = harness.search_run(SearchConfig::default());
    run.enqueue(ActionKind::GoStraight, 1);
    run.enable().unwrap();

    assert!(wait_until(
        || run.state() == EngineState::Halted,
        Duration::from_secs(10)
    ));

    let world = harness.world().lock();
    // The straight primitive never ran
    assert_relative_eq!(world.travelled_mm, 0.0);
    assert!(world.emergency_stopped);
    assert!(world.chimes.contains(&Chime::Error));
    drop(world);

    // Queue was fully consumed before the fault, so the run reports idle
    assert!(!run.is_busy());
}

#[test]
fn start_init_seats_against_the_wall_and_halts() {
    let harness = SimHarness::new();
    let mut run = harness.search_run(SearchConfig::default());
    run.enqueue(ActionKind::StartInit, 1);
    run.enable().unwrap();

    assert!(wait_until(
        || run.state() == EngineState::Halted,
        Duration::from_secs(10)
    ));

    let world = harness.world().lock();
    // Two open-loop reverse nudges of increasing strength, then freewheel
    assert_eq!(world.motor_drives.len(), 2);
    assert_relative_eq!(world.motor_drives[0].0, -0.1);
    assert_relative_eq!(world.motor_drives[1].0, -0.2);
    assert!(world.released);
    drop(world);
    assert!(!run.is_busy());
}

#[test]
fn return_reverses_heading_and_goes_idle() {
    let harness = SimHarness::new();
    let mut run = harness.search_run(SearchConfig::default());
    run.enqueue(ActionKind::Return, 1);
    run.enable().unwrap();

    // Both quarter turns rebase heading, so once the run is idle again the
    // reported heading offset is near zero.
    assert!(wait_until(|| !run.is_busy(), Duration::from_secs(10)));
    let theta = harness.world().lock().pose.theta;
    assert!(theta.abs() < 0.2, "heading offset after u-turn: {}", theta);
    run.disable();
}

#[test]
fn disable_is_idempotent() {
    let harness = SimHarness::new();
    let mut run = harness.search_run(SearchConfig::default());

    // Never enabled: both calls are no-ops
    run.disable();
    run.disable();
    assert!(!run.is_busy());

    // Enqueued but never executed: disable drains the queue
    run.enqueue(ActionKind::GoStraight, 3);
    assert!(run.is_busy());
    run.disable();
    run.disable();
    assert!(!run.is_busy());
    assert_eq!(run.pending_operations(), 0);
}

#[test]
fn engine_restarts_after_a_fault() {
    let harness = SimHarness::new();
    harness.world().lock().walls.wall[2] = true;

    let mut run = harness.search_run(SearchConfig::default());
    run.enqueue(ActionKind::GoStraight, 1);
    run.enable().unwrap();
    assert!(wait_until(
        || run.state() == EngineState::Halted,
        Duration::from_secs(10)
    ));

    // External reset: disable, clear the hazard, enable fresh
    run.disable();
    harness.world().lock().walls.wall[2] = false;
    run.enable().unwrap();

    run.enqueue(ActionKind::GoHalf, 1);
    assert!(wait_until(|| !run.is_busy(), Duration::from_secs(10)));
    assert_ne!(run.state(), EngineState::Halted);
    run.disable();
}

#[test]
fn position_recovery_runs_synchronously_when_disabled() {
    let harness = SimHarness::new();
    let mut run = harness.search_run(SearchConfig::default());

    run.position_recovery().unwrap();

    let world = harness.world().lock();
    // Control was released after the sweep
    assert!(!world.closed_loop);
    // Four rebased quarter turns leave no accumulated heading offset
    assert!(world.pose.theta.abs() < 0.2);
    assert!(world.time_ms > 0);
}

#[test]
fn position_recovery_is_refused_while_running() {
    let harness = SimHarness::new();
    let mut run = harness.search_run(SearchConfig::default());
    run.enable().unwrap();
    assert!(run.position_recovery().is_err());
    run.disable();
}
