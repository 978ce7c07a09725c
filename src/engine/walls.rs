//! Wall-referenced position corrections.
//!
//! Three corrections with very different characters share this module:
//! continuous lateral avoidance (every tick of a straight), the one-shot
//! cell-boundary cut (anchored to the physical cell grid), and the
//! front-range calibration (anchored to a wall ahead). Wall attach is a
//! full closed-loop maneuver that treats a touched wall as ground truth.

use super::{SearchEngine, Step};
use crate::traits::{Chime, DriveCommand};

impl SearchEngine {
    /// Continuous lateral correction plus cell-boundary edge detection.
    ///
    /// `distance` is the nominal length of the segment being driven (zero
    /// in the idle hold-course loop, which disables the cut).
    pub(crate) fn wall_avoid(&mut self, distance: f32) {
        let snapshot = self.walls.snapshot();
        let correction = &self.cfg.correction;
        let cell = self.cfg.geometry.cell_mm;
        let mut pose = self.sink.pose();

        // Per-side nudge toward center, only while roughly axis-aligned.
        // Each detected wall corrects independently so a single wall still
        // centers the robot.
        if pose.theta.abs() < correction.avoid_heading_limit {
            if snapshot.wall[0] {
                pose.y += snapshot.side[0] * correction.avoid_gain;
            }
            if snapshot.wall[1] {
                pose.y -= snapshot.side[1] * correction.avoid_gain;
            }
        }

        // A wall-presence falling edge past the minimum travel marks a cell
        // boundary; snap x backward onto the grid. Applied only when the
        // segment is long enough to make the fix meaningful and the fix is
        // a conservative (backward) adjustment.
        for side in 0..2 {
            if self.prev_wall[side] && !snapshot.wall[side] && pose.x > correction.cut_min_travel_mm
            {
                let into_cell = (pose.x as i32 % cell as i32) as f32;
                let fix = -into_cell + correction.cut_offset_mm - self.cfg.geometry.ahead_mm;
                if distance > cell - 1.0 && fix < 0.0 {
                    let before = pose.x;
                    pose.x += fix;
                    tracing::debug!(side, before, after = pose.x, "cell boundary cut");
                    self.indicator.play(Chime::Cancel);
                }
            }
            self.prev_wall[side] = snapshot.wall[side];
        }

        self.sink.set_pose(pose);
    }

    /// One-shot longitudinal fix against a flagged front wall.
    ///
    /// The long-range reading is compensated for its sampling delay using
    /// the staleness counter and current velocity; out-of-band values are
    /// skipped (they recur on a later tick). A correction never moves the
    /// estimate forward.
    pub(crate) fn wall_calib(&mut self, velocity: f32) {
        if !self.walls.snapshot().wall[2] {
            return;
        }
        let correction = &self.cfg.correction;
        let delay_s = (correction.calib_latency_ms + self.range.staleness_ms() as f32) / 1000.0;
        let compensated = self.range.distance_mm() - delay_s * velocity;
        let mut pose = self.sink.pose();
        let before = pose.x;
        if compensated > correction.calib_min_mm && compensated < correction.calib_max_mm {
            let candidate =
                correction.calib_stop_mm - compensated - self.cfg.geometry.ahead_mm;
            pose.x = candidate.min(before);
            self.indicator.play(Chime::Select);
            self.sink.set_pose(pose);
        }
        tracing::debug!(before, after = pose.x, compensated, "front wall calibration");
    }

    /// Closed-loop wall attach: drive a PI regulator per wheel toward zero
    /// front-sensor delta, then re-zero longitudinal position and heading
    /// with the wall as ground truth.
    ///
    /// Runs only when the wall is plausibly reachable: forced attaches
    /// accept the wide long-range threshold, opportunistic ones need either
    /// a near long-range reading or contact on both close-range sensors.
    /// The iteration cap makes the maneuver self-terminating under sensor
    /// failure.
    pub(crate) fn wall_attach(&mut self, force: bool) -> Step {
        let attach = self.cfg.attach.clone();
        let snapshot = self.walls.snapshot();
        let range = self.range.distance_mm();
        let triggered = (force && range < attach.force_range_mm)
            || range < attach.near_range_mm
            || (snapshot.front[0] > attach.contact_mm && snapshot.front[1] > attach.contact_mm);
        if !triggered {
            return Ok(());
        }

        // Long-range readings are meaningless nose-to-wall
        self.range.disable();
        let dt = self.cfg.period_s();
        let wheel_base = self.cfg.geometry.wheel_base_mm;
        let mut integral = [0.0f32; 2];
        for _ in 0..attach.max_ticks {
            let snapshot = self.walls.snapshot();
            let mut wheel = [0.0f32; 2];
            for side in 0..2 {
                let error = -snapshot.front[side];
                integral[side] += error * dt;
                wheel[side] = (attach.kp * error + attach.ki * integral[side])
                    .clamp(-attach.saturation_mm_s, attach.saturation_mm_s);
            }
            if wheel[0].abs() + wheel[1].abs() < attach.settle_threshold {
                break;
            }
            let tra = (wheel[0] + wheel[1]) / 2.0;
            let rot = (wheel[1] - wheel[0]) / wheel_base;
            self.sink.set_target(DriveCommand::velocity(tra, rot));
            if self.tick().is_err() {
                self.range.enable();
                return Err(super::Interrupted);
            }
        }
        self.sink.set_target(DriveCommand::default());

        let mut pose = self.sink.pose();
        pose.x = 0.0;
        pose.theta = 0.0;
        self.sink.set_pose(pose);
        self.range.enable();
        self.indicator.play(Chime::Short);
        tracing::debug!("wall attach complete");
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
    use crate::traits::Chime;
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
    fn wall_cut_only_moves_backward() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);

        // Establish wall-present history on the left, then drop it past the
        // minimum travel with a variety of positions in the cell.
        for x in [31.0_f32, 67.0, 100.0, 150.0, 179.0, 200.0, 300.0] {
            harness.world().lock().walls.wall[0] = true;
            engine.wall_avoid(360.0);
            let mut world = harness.world().lock();
            world.walls.wall[0] = false;
            world.pose.x = x;
            drop(world);
            engine.wall_avoid(360.0);
            let after = harness.world().lock().pose.x;
            assert!(
                after <= x,
                "cut moved pose forward: {} -> {} at x={}",
                x,
                after,
                x
            );
        }
    }

    #[test]
    fn wall_cut_requires_falling_edge_and_travel() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);

        // No previous wall: nothing happens
        harness.world().lock().pose.x = 100.0;
        engine.wall_avoid(360.0);
        assert_relative_eq!(harness.world().lock().pose.x, 100.0);

        // Falling edge but under the travel threshold: nothing happens
        harness.world().lock().walls.wall[1] = true;
        engine.wall_avoid(360.0);
        let mut world = harness.world().lock();
        world.walls.wall[1] = false;
        world.pose.x = 20.0;
        drop(world);
        engine.wall_avoid(360.0);
        assert_relative_eq!(harness.world().lock().pose.x, 20.0);
    }

    #[test]
    fn avoidance_suppressed_at_large_heading() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        {
            let mut world = harness.world().lock();
            world.walls.wall[0] = true;
            world.walls.side[0] = 5.0;
            world.pose.theta = 0.3; // well past 0.05π
        }
        engine.wall_avoid(0.0);
        assert_relative_eq!(harness.world().lock().pose.y, 0.0);

        harness.world().lock().pose.theta = 0.0;
        engine.wall_avoid(0.0);
        assert!(harness.world().lock().pose.y > 0.0);
    }

    #[test]
    fn calibration_never_moves_estimate_forward() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        {
            let mut world = harness.world().lock();
            world.walls.wall[2] = true;
            world.range_mm = 80.0;
            world.staleness_ms = 0;
            // Estimate already behind the candidate correction
            world.pose.x = -60.0;
        }
        engine.wall_calib(0.0);
        let world = harness.world().lock();
        assert!(world.pose.x <= -60.0);
        assert!(world.chimes.contains(&Chime::Select));
    }

    #[test]
    fn calibration_skips_out_of_band_readings() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        {
            let mut world = harness.world().lock();
            world.walls.wall[2] = true;
            world.range_mm = 400.0;
            world.pose.x = -10.0;
        }
        engine.wall_calib(240.0);
        let world = harness.world().lock();
        assert_relative_eq!(world.pose.x, -10.0);
        assert!(world.chimes.is_empty());
    }

    #[test]
    fn attach_rezeroes_pose_against_contact() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        {
            let mut world = harness.world().lock();
            // Both close-range sensors report contact
            world.walls.front = [12.0, 12.0];
            world.pose.x = -4.0;
            world.pose.theta = 0.05;
        }
        engine.wall_attach(false).unwrap();
        let world = harness.world().lock();
        assert_relative_eq!(world.pose.x, 0.0);
        assert_relative_eq!(world.pose.theta, 0.0);
        assert!(world.chimes.contains(&Chime::Short));
        assert!(world.range_enabled);
    }

    #[test]
    fn attach_skips_without_a_trigger() {
        let harness = SimHarness::new();
        let mut engine = engine_for(&harness);
        harness.world().lock().pose.x = -7.0;
        engine.wall_attach(false).unwrap();
        let world = harness.world().lock();
        assert_relative_eq!(world.pose.x, -7.0);
        assert!(world.chimes.is_empty());
    }
}
