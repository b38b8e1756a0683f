//! Gaze solving: look-at point → head joint goals.

use animatron_types::{AnimError, GazePoint, GoalMap, JointId};

/// Maps a 3D look-at point to per-joint goal positions.
///
/// # Errors
///
/// Returns [`AnimError::Unreachable`] when the head cannot physically point
/// at `point`.
pub trait GazeSolver: Send + Sync {
    fn solve(&self, point: GazePoint) -> Result<GoalMap, AnimError>;
}

/// Reference solver for a pan/tilt neck with a passive roll axis.
///
/// Yaw follows the target's bearing, pitch its elevation (positive pitch
/// looks down).  Points behind the head or outside the joint limits are
/// unreachable.
#[derive(Debug, Clone)]
pub struct PanTiltGaze {
    pub yaw: JointId,
    pub pitch: JointId,
    pub roll: JointId,
    pub yaw_limit_deg: f64,
    pub pitch_limit_deg: f64,
}

impl Default for PanTiltGaze {
    fn default() -> Self {
        Self {
            yaw: "neck_yaw".into(),
            pitch: "neck_pitch".into(),
            roll: "neck_roll".into(),
            yaw_limit_deg: 80.0,
            pitch_limit_deg: 45.0,
        }
    }
}

impl GazeSolver for PanTiltGaze {
    fn solve(&self, point: GazePoint) -> Result<GoalMap, AnimError> {
        if point.x <= 0.0 {
            return Err(AnimError::Unreachable { point });
        }
        let yaw = point.y.atan2(point.x).to_degrees();
        let pitch = -point.z.atan2(point.x.hypot(point.y)).to_degrees();
        if yaw.abs() > self.yaw_limit_deg || pitch.abs() > self.pitch_limit_deg {
            return Err(AnimError::Unreachable { point });
        }

        let mut goals = GoalMap::new();
        goals.insert(self.yaw.clone(), yaw);
        goals.insert(self.pitch.clone(), pitch);
        goals.insert(self.roll.clone(), 0.0);
        Ok(goals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_ahead_is_neutral() {
        let goals = PanTiltGaze::default().solve(GazePoint::new(0.5, 0.0, 0.0)).unwrap();
        assert_eq!(goals[&JointId::from("neck_yaw")], 0.0);
        assert_eq!(goals[&JointId::from("neck_pitch")], 0.0);
        assert_eq!(goals[&JointId::from("neck_roll")], 0.0);
    }

    #[test]
    fn left_and_down_have_expected_signs() {
        let goals = PanTiltGaze::default().solve(GazePoint::new(0.5, 0.5, -0.3)).unwrap();
        assert!((goals[&JointId::from("neck_yaw")] - 45.0).abs() < 1e-9);
        assert!(goals[&JointId::from("neck_pitch")] > 0.0);
    }

    #[test]
    fn point_behind_the_head_is_unreachable() {
        let err = PanTiltGaze::default().solve(GazePoint::new(0.0, 0.1, 0.0)).unwrap_err();
        assert!(matches!(err, AnimError::Unreachable { .. }));
    }

    #[test]
    fn point_outside_the_limits_is_unreachable() {
        let solver = PanTiltGaze::default();
        assert!(solver.solve(GazePoint::new(0.5, 5.0, 0.0)).is_err());
        assert!(solver.solve(GazePoint::new(0.5, 0.0, -2.0)).is_err());
    }
}
