//! Slalom transition execution.

use super::{SearchEngine, Step, TurnSide};
use crate::traits::DriveCommand;

impl SearchEngine {
    /// Track one slalom shape at the given entry velocity.
    ///
    /// The curve generator is advanced by the control period each tick and
    /// its reference tracked exactly as in straight execution. On completion
    /// the sink is handed a plain straight command at the entry velocity
    /// (cancelling any residual angular target) and the pose is rebased by
    /// the shape's net curve: subtract the known net displacement, then
    /// rotate into the post-curve frame.
    pub(crate) fn trace(&mut self, side: TurnSide, velocity: f32) -> Step {
        self.tracker.reset(velocity);
        self.curve_mut(side).reset(velocity);
        let duration = self.curve_mut(side).duration();
        let dt = self.cfg.period_s();
        let mut t = 0.0;
        while t < duration {
            let reference = self.curve_mut(side).advance(dt);
            let estimate = self.sink.estimate();
            let command = self.tracker.track(&estimate, &reference);
            self.sink.set_target(command);
            self.tick()?;
            t += dt;
        }
        self.sink.set_target(DriveCommand::velocity(velocity, 0.0));
        let net = self.curve_mut(side).net_curve();
        let pose = (self.sink.pose() - net).rotated(-net.theta);
        self.sink.set_pose(pose);
        Ok(())
    }
}
