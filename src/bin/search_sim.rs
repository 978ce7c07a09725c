//! Scripted search run against the synthetic world.
//!
//! Enqueues a short out-and-back command sequence, lets the engine execute
//! it in virtual time, and prints the resulting world state. Useful for
//! eyeballing dispatch logs without hardware:
//!
//! ```text
//! RUST_LOG=vyuha_nav=debug cargo run --bin search_sim
//! ```

use std::time::{Duration, Instant};

use vyuha_nav::sim::SimHarness;
use vyuha_nav::{ActionKind, EngineState, SearchConfig};

fn main() -> vyuha_nav::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vyuha_nav=info".parse().unwrap()),
        )
        .init();

    let config = SearchConfig::default();
    tracing::info!(
        "cell {:.0}mm, search {:.0}mm/s, peak {:.0}mm/s",
        config.geometry.cell_mm,
        config.speed.search_mm_s,
        config.speed.peak_mm_s
    );

    let harness = SimHarness::new();
    // The right-hand wall the scripted TurnRight90 pivots around
    harness.world().lock().walls.wall[1] = true;

    let mut run = harness.search_run(config);
    run.enqueue(ActionKind::StartStep, 1);
    run.enqueue(ActionKind::GoStraight, 1);
    run.enqueue(ActionKind::GoStraight, 1);
    run.enqueue(ActionKind::TurnRight90, 1);
    run.enqueue(ActionKind::GoStraight, 1);
    run.enqueue(ActionKind::Stop, 1);
    run.enable()?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while run.state() != EngineState::Halted {
        if Instant::now() > deadline {
            tracing::error!("run did not reach the terminal state in time");
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    run.disable();

    let world = harness.world().lock();
    tracing::info!(
        travelled_mm = world.travelled_mm,
        virtual_ms = world.time_ms,
        busy = run.is_busy(),
        "run finished"
    );
    Ok(())
}
