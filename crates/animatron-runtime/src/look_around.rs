//! Procedural gaze sweep.

use std::time::Duration;

use animatron_types::{Cancelled, GazePoint, Interpolation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::context::BehaviorContext;

/// One waypoint of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glance {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Time to turn toward the point, in milliseconds.
    #[serde(default = "default_glance_ms")]
    pub duration_ms: u64,
    /// Pause before turning, in milliseconds.  Ignored for the first glance.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

fn default_glance_ms() -> u64 {
    1_100
}

fn default_pause_ms() -> u64 {
    200
}

impl Glance {
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            duration_ms: default_glance_ms(),
            pause_ms: default_pause_ms(),
        }
    }

    fn point(&self) -> GazePoint {
        GazePoint::new(self.x, self.y, self.z)
    }

    fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// `kind = "look_around"` catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookAroundSpec {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_glances")]
    pub glances: Vec<Glance>,
}

fn default_name() -> String {
    "look_around".into()
}

fn default_glances() -> Vec<Glance> {
    vec![
        Glance::at(0.5, -0.5, 0.1),
        Glance::at(0.5, 0.0, -0.4),
        Glance::at(0.5, 0.3, -0.3),
        Glance::at(0.5, 0.0, 0.0),
    ]
}

impl Default for LookAroundSpec {
    fn default() -> Self {
        Self {
            name: default_name(),
            glances: default_glances(),
        }
    }
}

/// Lowers the right arm while taking the first glance, lets the arm go limp,
/// then visits the remaining glances one by one.
#[derive(Debug, Clone)]
pub struct LookAround {
    spec: LookAroundSpec,
}

impl LookAround {
    pub fn new(spec: LookAroundSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Behavior for LookAround {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        let Some((first, rest)) = self.spec.glances.split_first() else {
            return Ok(());
        };
        let layout = ctx.robot().layout();
        ctx.body().stiffen(&layout.right_arm);
        ctx.body().stiffen(&layout.head);

        let (arm, look) = tokio::join!(
            ctx.move_to(&layout.arm_rest_pose, Duration::from_secs(1), Interpolation::Linear),
            ctx.look_at(first.point(), first.duration(), Interpolation::Linear),
        );
        arm?;
        look?;
        for joint in &layout.right_arm {
            ctx.body().set_torque_limit(joint, 0.0);
        }

        for glance in rest {
            ctx.sleep(Duration::from_millis(glance.pause_ms)).await?;
            ctx.look_at(glance.point(), glance.duration(), Interpolation::MinimumJerk)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sim_robot;
    use animatron_hal::ActuatorFacade;
    use animatron_types::JointId;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn glance_fields_default_when_omitted() {
        let glance: Glance = serde_json::from_str(r#"{"x": 0.5, "y": 0.1, "z": 0.0}"#).unwrap();
        assert_eq!(glance, Glance::at(0.5, 0.1, 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_ends_on_the_last_glance() {
        let (robot, body) = sim_robot();
        let ctx = BehaviorContext::new(robot, CancellationToken::new());
        let spec = LookAroundSpec {
            name: "scan".into(),
            glances: vec![Glance::at(0.5, 0.5, 0.0), Glance::at(0.5, -0.5, 0.0)],
        };

        let started = tokio::time::Instant::now();
        LookAround::new(spec).run(&ctx).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1_100 + 200 + 1_100));
        let yaw = body.goal_position(&JointId::from("neck_yaw")).unwrap();
        assert!((yaw + 45.0).abs() < 1e-9);
        assert_eq!(body.torque_limit(&JointId::from("r_shoulder_pitch")), Some(0.0));
    }

    #[tokio::test]
    async fn empty_sweep_is_a_noop() {
        let (robot, body) = sim_robot();
        let ctx = BehaviorContext::new(robot, CancellationToken::new());
        let spec = LookAroundSpec {
            name: "nothing".into(),
            glances: Vec::new(),
        };
        LookAround::new(spec).run(&ctx).await.unwrap();
        assert_eq!(body.write_count(), 0);
    }
}
