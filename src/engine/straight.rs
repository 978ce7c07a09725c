//! Straight-line segment execution.

use super::{SearchEngine, Step};
use crate::traits::ReferenceSample;

impl SearchEngine {
    /// Drive a straight segment of `distance` mm, from the sink's current
    /// reference velocity through at most `v_max` to `v_end`.
    ///
    /// Each tick evaluates the jerk-limited profile, runs the reference
    /// through the tracker (lateral reference pinned to zero) and forwards
    /// the corrected command to the sink, then applies lateral wall
    /// avoidance. A slow integral of the lateral error is folded into
    /// heading as an anti-drift bias.
    ///
    /// On completion `pose.x` is rebased by the nominal distance, not the
    /// measured one: the engine commits to the planned motion and leaves
    /// residual drift to the wall corrections.
    pub(crate) fn straight(&mut self, distance: f32, v_max: f32, v_end: f32) -> Step {
        let v_start = self.sink.estimate().reference_velocity.tra;
        self.tracker.reset(v_start);
        let profile = self.planner.plan(
            self.cfg.speed.straight_jerk,
            self.cfg.speed.straight_accel,
            v_start,
            v_max,
            v_end,
            distance,
        );
        let dt = self.cfg.period_s();
        let drift_gain = self.cfg.correction.drift_integral_gain;
        let mut lateral_integral = 0.0;
        let mut t = 0.0;
        while t < profile.duration() {
            let estimate = self.sink.estimate();
            let reference = ReferenceSample::along_axis(
                profile.position(t),
                profile.velocity(t),
                profile.acceleration(t),
                profile.jerk(t),
            );
            let command = self.tracker.track(&estimate, &reference);
            self.sink.set_target(command);
            self.tick()?;
            self.wall_avoid(distance);
            let mut pose = self.sink.pose();
            lateral_integral += pose.y;
            pose.theta += lateral_integral * drift_gain;
            self.sink.set_pose(pose);
            t += dt;
        }
        if v_end < 1.0 {
            // Don't leave the sink chasing a stale nonzero target
            self.sink.set_target(Default::default());
        }
        let mut pose = self.sink.pose();
        pose.x -= distance;
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
    use approx::assert_relative_eq;
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
    fn commit_subtracts_the_nominal_distance() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        harness.world().lock().closed_loop = true;

        engine.straight(90.0, 240.0, 240.0).unwrap();

        let world = harness.world().lock();
        // The rebase commits the planned distance; whatever was actually
        // travelled stays in the estimate as residual error.
        assert_relative_eq!(world.pose.x, world.travelled_mm - 90.0, epsilon = 1e-3);
    }

    #[test]
    fn stopping_straight_leaves_a_zero_target() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        harness.world().lock().closed_loop = true;

        engine.straight(90.0, 240.0, 0.0).unwrap();

        let world = harness.world().lock();
        assert_relative_eq!(world.target.v, 0.0);
        assert_relative_eq!(world.target.w, 0.0);
    }

    #[test]
    fn cruising_straight_keeps_its_end_velocity() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        harness.world().lock().closed_loop = true;

        engine.straight(180.0, 240.0, 240.0).unwrap();

        // No final zero command when the segment ends at speed
        assert!(harness.world().lock().target.v > 0.0);
    }
}
