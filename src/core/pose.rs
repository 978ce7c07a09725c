//! Segment-relative pose.
//!
//! The engine never tracks absolute maze coordinates. `RelativePose` is the
//! position and heading accumulated since the last rebasing event (segment
//! start, turn completion, wall attach); every motion primitive measures its
//! own progress against it and rebases it on completion, so estimation error
//! can only accumulate within one segment.

use std::ops::Sub;

/// Position (mm) along/across the current segment and heading (rad) relative
/// to the last rebasing event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelativePose {
    /// Distance along the segment axis in millimeters
    pub x: f32,
    /// Lateral offset from the segment axis in millimeters
    pub y: f32,
    /// Heading relative to the segment axis in radians
    pub theta: f32,
}

impl RelativePose {
    /// Create a new pose.
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self { x, y, theta }
    }

    /// Rotate the translation components by `angle`, leaving heading as is.
    ///
    /// Used when rebasing into a new segment frame: heading is adjusted by
    /// subtraction first, then the position vector is rotated to match.
    #[inline]
    pub fn rotated(self, angle: f32) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self {
            x: self.x * cos_a - self.y * sin_a,
            y: self.x * sin_a + self.y * cos_a,
            theta: self.theta,
        }
    }

    /// Lateral offset measured in the frame of the target heading.
    ///
    /// Rotates the position into the frame `theta` away from the current one
    /// and returns its along-axis component; the turn primitives servo this
    /// toward zero while rotating.
    #[inline]
    pub fn offset_in_target_frame(&self) -> f32 {
        let (sin_t, cos_t) = (-self.theta).sin_cos();
        self.x * cos_t - self.y * sin_t
    }
}

impl Sub for RelativePose {
    type Output = RelativePose;

    /// Componentwise difference, used to strip a curve's net motion before
    /// rotating into the post-curve frame.
    #[inline]
    fn sub(self, rhs: RelativePose) -> RelativePose {
        RelativePose {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            theta: self.theta - rhs.theta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rotation_moves_translation_only() {
        let p = RelativePose::new(10.0, 0.0, 0.3);
        let r = p.rotated(FRAC_PI_2);
        assert_relative_eq!(r.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(r.y, 10.0, epsilon = 1e-4);
        assert_relative_eq!(r.theta, 0.3);
    }

    #[test]
    fn subtract_is_componentwise() {
        let a = RelativePose::new(5.0, 2.0, 0.5);
        let b = RelativePose::new(1.0, 1.0, 0.2);
        let d = a - b;
        assert_relative_eq!(d.x, 4.0);
        assert_relative_eq!(d.y, 1.0);
        assert_relative_eq!(d.theta, 0.3);
    }
}
