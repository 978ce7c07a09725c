//! Recovery and fault maneuvers.

use std::f32::consts::FRAC_PI_2;

use super::{SearchEngine, Step};
use crate::traits::{Chime, DriveCommand};

impl SearchEngine {
    /// Reseat the robot against the wall behind it.
    ///
    /// Ramps a backward velocity from zero while cancelling heading error,
    /// then drops to open loop for two short reverse nudges of increasing
    /// strength, and re-enables closed-loop control.
    pub(crate) fn put_back(&mut self) -> Step {
        let recovery = self.cfg.recovery.clone();
        let ramp_ticks = recovery.backoff_peak_mm_s as u32;
        for i in 0..ramp_ticks {
            let theta = self.sink.pose().theta;
            self.sink.set_target(DriveCommand::velocity(
                -(i as f32),
                -theta * recovery.heading_gain,
            ));
            self.tick()?;
        }
        for _ in 0..recovery.backoff_hold_ticks {
            let theta = self.sink.pose().theta;
            self.sink.set_target(DriveCommand::velocity(
                -recovery.backoff_peak_mm_s,
                -theta * recovery.heading_gain,
            ));
            self.tick()?;
        }
        self.sink.disable();
        self.motors
            .drive(-recovery.first_nudge_duty, -recovery.first_nudge_duty);
        self.wait_ms(recovery.nudge_ms)?;
        self.motors
            .drive(-recovery.second_nudge_duty, -recovery.second_nudge_duty);
        self.wait_ms(recovery.nudge_ms)?;
        self.sink.enable();
        tracing::debug!("put-back complete");
        Ok(())
    }

    /// Reverse heading by two attach-then-turn quarter rotations.
    ///
    /// The rotation direction favors the side with more clearance, and each
    /// quarter is preceded by a wall attach so heading error cannot compound
    /// across the full reversal.
    pub(crate) fn u_turn(&mut self) -> Step {
        let snapshot = self.walls.snapshot();
        let angle = if snapshot.side[0] < snapshot.side[1] {
            -FRAC_PI_2
        } else {
            FRAC_PI_2
        };
        for _ in 0..2 {
            self.wall_attach(false)?;
            self.turn(angle, false)?;
        }
        Ok(())
    }

    /// Terminal fault path: ramp to zero, kill closed-loop control, halt the
    /// actuators and park. Requires an external `enable()` to resume.
    pub(crate) fn fault_stop(&mut self, reason: &'static str) -> Step {
        tracing::error!(reason, "fault stop");
        self.indicator.play(Chime::Error);
        let step = self.cfg.recovery.stop_decel_step;
        let mut v = self.sink.estimate().velocity.tra;
        while v > 0.0 {
            self.sink.set_target(DriveCommand::velocity(v, 0.0));
            v -= step;
            self.tick()?;
        }
        self.sink.disable();
        self.motors.emergency_stop();
        self.park()
    }

    /// Re-establish a known pose after an uncontrolled disturbance.
    ///
    /// Four quarter turns attaching to any front wall encountered confirm
    /// the cell orientation; the engine then rotates back until it faces an
    /// opening, attaching once more on the way.
    pub(crate) fn position_recovery(&mut self) -> Step {
        self.sink.enable();
        let outcome = self.recovery_sweep();
        self.sink.disable();
        outcome
    }

    fn recovery_sweep(&mut self) -> Step {
        for _ in 0..4 {
            if self.walls.snapshot().wall[2] {
                self.wall_attach(true)?;
            }
            self.turn(FRAC_PI_2, false)?;
        }
        while self.walls.snapshot().wall[2] {
            self.wall_attach(false)?;
            self.turn(-FRAC_PI_2, false)?;
        }
        Ok(())
    }

    /// Consume `ms` control ticks.
    fn wait_ms(&mut self, ms: u32) -> Step {
        for _ in 0..ms {
            self.tick()?;
        }
        Ok(())
    }
}
