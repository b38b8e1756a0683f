//! [`TrackingControlLoop`] – fixed-rate gaze servo.
//!
//! The look-at point is read from a [`watch`] channel written by the mode
//! arbiter, so the loop always steers toward the latest target without
//! sharing any lock with the detector side.

use std::time::Duration;

use animatron_types::{Cancelled, GazePoint, Interpolation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::behavior::Behavior;
use crate::context::BehaviorContext;

/// `[tracking]` section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Control period, in milliseconds.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Duration of the arm retraction and first look, in milliseconds.
    #[serde(default = "default_setup_ms")]
    pub setup_ms: u64,
}

fn default_period_ms() -> u64 {
    10
}

fn default_setup_ms() -> u64 {
    1_000
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            setup_ms: default_setup_ms(),
        }
    }
}

pub struct TrackingControlLoop {
    target: watch::Receiver<GazePoint>,
    period: Duration,
    setup_duration: Duration,
}

impl TrackingControlLoop {
    pub fn new(target: watch::Receiver<GazePoint>, config: &TrackingConfig) -> Self {
        Self {
            target,
            period: Duration::from_millis(config.period_ms),
            setup_duration: Duration::from_millis(config.setup_ms),
        }
    }

    fn current(&self) -> GazePoint {
        *self.target.borrow()
    }
}

#[async_trait]
impl Behavior for TrackingControlLoop {
    fn name(&self) -> &str {
        "tracking"
    }

    /// Retract the right arm and look at the current target together, then
    /// leave the arm limp so it cannot fight the head.
    async fn setup(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        let layout = ctx.robot().layout();
        ctx.body().stiffen(&layout.right_arm);
        ctx.body().stiffen(&layout.head);

        let (arm, look) = tokio::join!(
            ctx.move_to(&layout.arm_rest_pose, self.setup_duration, Interpolation::Linear),
            ctx.look_at(self.current(), self.setup_duration, Interpolation::Linear),
        );
        arm?;
        look?;

        for joint in &layout.right_arm {
            ctx.body().set_torque_limit(joint, 0.0);
        }
        debug!(point = %self.current(), "tracking ready");
        Ok(())
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        loop {
            let point = self.current();
            match ctx.robot().gaze().solve(point) {
                Ok(goals) => ctx.body().apply(&goals),
                Err(e) => trace!(error = %e, "skipping tracking tick"),
            }
            ctx.sleep(self.period).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorTask;
    use crate::testing::sim_robot;
    use animatron_hal::ActuatorFacade;
    use animatron_types::JointId;
    use std::sync::Arc;

    fn config() -> TrackingConfig {
        TrackingConfig {
            period_ms: 10,
            setup_ms: 100,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn setup_parks_the_arm_and_drops_its_torque() {
        let (robot, body) = sim_robot();
        let (_tx, rx) = watch::channel(GazePoint::new(0.5, 0.5, 0.0));
        let layout = robot.layout().clone();
        let task = BehaviorTask::root(Arc::new(TrackingControlLoop::new(rx, &config())), robot);

        task.start().await.unwrap();
        for (joint, rest) in &layout.arm_rest_pose {
            let goal = body.goal_position(joint).unwrap();
            assert!((goal - rest).abs() < 1e-9, "{joint}: {goal} != {rest}");
            assert_eq!(body.torque_limit(joint), Some(0.0));
            assert!(!body.is_compliant(joint));
        }
        let yaw = body.goal_position(&JointId::from("neck_yaw")).unwrap();
        assert!((yaw - 45.0).abs() < 1e-9);

        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn loop_follows_target_updates() {
        let (robot, body) = sim_robot();
        let (tx, rx) = watch::channel(GazePoint::new(0.5, 0.0, 0.0));
        let task = BehaviorTask::root(Arc::new(TrackingControlLoop::new(rx, &config())), robot);
        task.start().await.unwrap();

        tx.send_replace(GazePoint::new(0.5, -0.5, 0.0));
        tokio::time::sleep(Duration::from_millis(25)).await;
        let yaw = body.goal_position(&JointId::from("neck_yaw")).unwrap();
        assert!((yaw + 45.0).abs() < 1e-9);

        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_targets_are_skipped() {
        let (robot, body) = sim_robot();
        let (tx, rx) = watch::channel(GazePoint::new(0.5, 0.0, 0.0));
        let task = BehaviorTask::root(Arc::new(TrackingControlLoop::new(rx, &config())), robot);
        task.start().await.unwrap();

        tx.send_replace(GazePoint::new(-1.0, 0.0, 0.0));
        tokio::time::sleep(Duration::from_millis(5)).await;
        let writes = body.write_count();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(body.write_count(), writes);
        assert!(task.is_running());

        task.stop().await.unwrap();
    }
}
