//! Named joint groups of the robot body.

use animatron_types::{GoalMap, JointId};
use serde::{Deserialize, Serialize};

/// Right arm rest pose (shoulder pitch → gripper), in degrees.  Keeps the
/// hand low and clear of the camera's field of view.
const RIGHT_ARM_REST: [f64; 8] = [-1.73, -3.67, -0.57, -68.44, 4.0, -29.67, -4.84, -47.14];

const ARM_JOINTS: [&str; 8] = [
    "shoulder_pitch",
    "shoulder_roll",
    "arm_yaw",
    "elbow_pitch",
    "forearm_yaw",
    "wrist_pitch",
    "wrist_roll",
    "gripper",
];

/// Joint groups the behaviors address by role rather than by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyLayout {
    pub head: Vec<JointId>,
    pub antennas: Vec<JointId>,
    pub right_arm: Vec<JointId>,
    pub left_arm: Vec<JointId>,
    /// Pose the auxiliary (right) arm is retracted to before gaze tracking.
    pub arm_rest_pose: GoalMap,
}

impl BodyLayout {
    /// Every joint of every group, head first.
    pub fn all(&self) -> Vec<JointId> {
        self.head
            .iter()
            .chain(&self.antennas)
            .chain(&self.right_arm)
            .chain(&self.left_arm)
            .cloned()
            .collect()
    }

    /// Both arms, right first.
    pub fn arms(&self) -> Vec<JointId> {
        self.right_arm.iter().chain(&self.left_arm).cloned().collect()
    }

    /// Neutral pose (all zeros) for both arms.
    pub fn arms_neutral(&self) -> GoalMap {
        self.arms().into_iter().map(|j| (j, 0.0)).collect()
    }
}

fn arm(prefix: &str) -> Vec<JointId> {
    ARM_JOINTS
        .iter()
        .map(|name| JointId(format!("{prefix}_{name}")))
        .collect()
}

impl Default for BodyLayout {
    /// Humanoid torso with a three-axis neck, two antennas and two
    /// eight-joint arms.
    fn default() -> Self {
        let right_arm = arm("r");
        let arm_rest_pose = right_arm.iter().cloned().zip(RIGHT_ARM_REST).collect();
        Self {
            head: vec!["neck_yaw".into(), "neck_roll".into(), "neck_pitch".into()],
            antennas: vec!["l_antenna".into(), "r_antenna".into()],
            right_arm,
            left_arm: arm("l"),
            arm_rest_pose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_has_expected_groups() {
        let body = BodyLayout::default();
        assert_eq!(body.head.len(), 3);
        assert_eq!(body.antennas.len(), 2);
        assert_eq!(body.right_arm[0].as_str(), "r_shoulder_pitch");
        assert_eq!(body.left_arm[7].as_str(), "l_gripper");
        assert_eq!(body.all().len(), 3 + 2 + 8 + 8);
    }

    #[test]
    fn rest_pose_covers_the_right_arm() {
        let body = BodyLayout::default();
        assert_eq!(body.arm_rest_pose.len(), body.right_arm.len());
        assert_eq!(body.arm_rest_pose[&JointId::from("r_elbow_pitch")], -68.44);
    }

    #[test]
    fn arms_neutral_zeroes_both_arms() {
        let neutral = BodyLayout::default().arms_neutral();
        assert_eq!(neutral.len(), 16);
        assert!(neutral.values().all(|v| *v == 0.0));
    }
}
