//! Generic `ActuatorFacade` trait for the robot's position-controlled joints.
//!
//! Drivers implement this trait once for the whole body.  The runtime only
//! ever talks to the trait, so a physical robot, a network SDK, or the
//! [`SimBody`][crate::sim::SimBody] can be swapped without touching behavior
//! logic.
//!
//! Actuator faults are the facade's own business: setters do not return
//! errors, and writes to joints the facade does not know are ignored.

use std::time::Duration;

use animatron_types::{GoalMap, Interpolation, JointId};
use async_trait::async_trait;

/// Torque limit, in percent, applied by [`ActuatorFacade::stiffen`].
pub const FULL_TORQUE: f64 = 100.0;

/// Number of torque decrements used by [`ActuatorFacade::relax`].
const RELAX_STEPS: u32 = 10;

/// Shared access to every joint of the robot.
///
/// All methods take `&self`: the facade is shared between the behaviors that
/// take turns owning the body, and implementations use interior mutability.
#[async_trait]
pub trait ActuatorFacade: Send + Sync {
    /// Command `joint` toward `degrees`.
    fn set_goal_position(&self, joint: &JointId, degrees: f64);

    /// Last commanded goal of `joint`, `None` for unknown joints.
    fn goal_position(&self, joint: &JointId) -> Option<f64>;

    /// Last measured position of `joint`, `None` for unknown joints.
    fn present_position(&self, joint: &JointId) -> Option<f64>;

    /// Limit the torque of `joint` to `percent` of its maximum (0–100).
    fn set_torque_limit(&self, joint: &JointId, percent: f64);

    /// Switch `joint` between compliant (free) and stiff (position-held).
    fn set_compliant(&self, joint: &JointId, compliant: bool);

    /// Whether `joint` is currently compliant.  Unknown joints report `true`.
    fn is_compliant(&self, joint: &JointId) -> bool;

    /// Interpolate every joint in `goals` from its current goal to the target
    /// over `duration`, resolving when the motion is complete.
    ///
    /// Dropping the returned future stops the motion where it is.
    async fn move_to(&self, goals: &GoalMap, duration: Duration, profile: Interpolation);

    /// Write all of `goals` at once, without interpolation.
    fn apply(&self, goals: &GoalMap) {
        for (joint, degrees) in goals {
            self.set_goal_position(joint, *degrees);
        }
    }

    /// Make `joints` stiff at full torque.
    fn stiffen(&self, joints: &[JointId]) {
        for joint in joints {
            self.set_compliant(joint, false);
            self.set_torque_limit(joint, FULL_TORQUE);
        }
    }

    /// Smoothly turn `joints` off: ramp their torque down to zero over
    /// `duration`, make them compliant, then restore the torque limit so the
    /// next stiffening starts from full power.
    async fn relax(&self, joints: &[JointId], duration: Duration) {
        let step = duration / RELAX_STEPS;
        for k in (0..RELAX_STEPS).rev() {
            let percent = FULL_TORQUE * f64::from(k) / f64::from(RELAX_STEPS);
            for joint in joints {
                self.set_torque_limit(joint, percent);
            }
            tokio::time::sleep(step).await;
        }
        for joint in joints {
            self.set_compliant(joint, true);
            self.set_torque_limit(joint, FULL_TORQUE);
        }
    }
}
