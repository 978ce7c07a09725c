//! In-place rotation.

use super::{SearchEngine, Step};
use crate::traits::DriveCommand;

impl SearchEngine {
    /// Rotate in place by the signed `angle`.
    ///
    /// Phase A ramps angular acceleration while servoing the lateral offset
    /// toward zero, until the estimated angular speed crosses the ceiling;
    /// `skip_align` bypasses it entirely (used as a zero-angle heading
    /// flush). Phase B follows a constant-deceleration stopping profile,
    /// `ω = √(2·decel·|remaining|)`, until both angular speed and remaining
    /// angle are inside tolerance.
    ///
    /// On exit the heading is rebased by the commanded angle and the pose
    /// vector rotated into the new frame: a frame change, not a motion.
    pub(crate) fn turn(&mut self, angle: f32, skip_align: bool) -> Step {
        let limits = self.cfg.turn.clone();
        let dt = self.cfg.period_s();

        let mut elapsed = 0.0;
        while !skip_align {
            let estimate = self.sink.estimate();
            if estimate.velocity.rot.abs() > limits.max_speed {
                break;
            }
            let offset = estimate.pose.offset_in_target_frame();
            let spin_up = elapsed * limits.accel;
            let w = if angle > 0.0 { spin_up } else { -spin_up };
            self.sink
                .set_target(DriveCommand::velocity(-offset * limits.back_gain, w));
            self.tick()?;
            elapsed += dt;
        }

        loop {
            self.tick()?;
            let estimate = self.sink.estimate();
            let remaining = angle - estimate.pose.theta;
            if estimate.velocity.rot.abs() < limits.end_speed_tol
                && remaining.abs() < limits.end_angle_tol
            {
                break;
            }
            let stopping = (2.0 * limits.decel * remaining.abs()).sqrt();
            let speed = stopping.min(limits.max_speed);
            let w = if remaining > 0.0 { speed } else { -speed };
            let offset = estimate.pose.offset_in_target_frame();
            self.sink
                .set_target(DriveCommand::velocity(-offset * limits.back_gain, w));
        }

        self.sink.set_target(DriveCommand::default());
        let mut pose = self.sink.pose();
        pose.theta -= angle;
        pose = pose.rotated(-angle);
        self.sink.set_pose(pose);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SearchConfig;
    use crate::engine::SearchEngine;
    use crate::queue::CommandQueue;
    use crate::shared::EngineShared;
    use crate::sim::SimHarness;
    use std::f32::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn engine_for(harness: &SimHarness) -> SearchEngine {
        SearchEngine::new(
            SearchConfig::default(),
            harness.deps(),
            Arc::new(CommandQueue::new()),
            Arc::new(EngineShared::new()),
        )
    }

    #[test]
    fn quarter_turn_rebases_into_the_new_frame() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        harness.world().lock().closed_loop = true;

        engine.turn(FRAC_PI_2, false).unwrap();

        let world = harness.world().lock();
        // The robot physically rotated ~90°, but the reported heading is
        // relative to the new frame and therefore near zero again.
        assert!(
            world.pose.theta.abs() < 0.12,
            "heading after rebase: {}",
            world.pose.theta
        );
        // The in-place turn produced no appreciable translation
        assert!(world.pose.x.abs() < 5.0);
        assert!(world.pose.y.abs() < 5.0);
        // The turn left the sink with a zeroed target
        assert_eq!(world.target.w, 0.0);
    }

    #[test]
    fn negative_turn_mirrors_the_positive_one() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        harness.world().lock().closed_loop = true;

        engine.turn(-FRAC_PI_2, false).unwrap();

        let world = harness.world().lock();
        assert!(world.pose.theta.abs() < 0.12);
    }

    #[test]
    fn zero_angle_flush_drives_heading_home() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        {
            let mut world = harness.world().lock();
            world.closed_loop = true;
            world.pose.theta = 0.2;
        }

        engine.turn(0.0, true).unwrap();

        // The flush servos residual heading back toward the segment axis
        assert!(harness.world().lock().pose.theta.abs() < 0.1);
    }
}
