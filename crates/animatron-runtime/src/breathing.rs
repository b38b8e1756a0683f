//! Procedural "breathing": a slow sinusoidal sway of the arms and antennas.
//!
//! Right and left sides move in mirror image.  For angular frequency `ω`,
//! phase `φ` and elapsed time `t`:
//!
//! | Joint | Right side |
//! |---|---|
//! | `arm_yaw` | `4 sin(ωt + φ)` |
//! | `shoulder_roll` | `1.5 sin(ωt + π + φ)` |
//! | `forearm_yaw` | `3 sin(ωt/2 + π + φ)` |
//! | `gripper` | `-4 sin(ωt + π + φ)` |
//! | antennas | `±15 sin(ωt + φ)` |
//!
//! [`Cue`] offsets count from the start of the sway.

use std::f64::consts::{FRAC_PI_4, PI, TAU};
use std::time::Duration;

use animatron_types::{Cancelled, GoalMap, Interpolation, JointId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::behavior::Behavior;
use crate::context::BehaviorContext;
use crate::cues::{Cue, accompany};

const SWAY_PERIOD: Duration = Duration::from_millis(10);

/// `kind = "breathing"` catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingSpec {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    #[serde(default = "default_phase_rad")]
    pub phase_rad: f64,
    /// How long to sway, in milliseconds.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<Cue>,
}

fn default_name() -> String {
    "breathing".into()
}

fn default_frequency_hz() -> f64 {
    0.3
}

fn default_phase_rad() -> f64 {
    -FRAC_PI_4
}

fn default_duration_ms() -> u64 {
    10_000
}

impl Default for BreathingSpec {
    fn default() -> Self {
        Self {
            name: default_name(),
            frequency_hz: default_frequency_hz(),
            phase_rad: default_phase_rad(),
            duration_ms: default_duration_ms(),
            cues: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Breathing {
    spec: BreathingSpec,
}

impl Breathing {
    pub fn new(spec: BreathingSpec) -> Self {
        Self { spec }
    }

    /// Right-side offsets at time `t` (seconds), keyed by joint suffix.
    fn sway(&self, t: f64) -> [(&'static str, f64); 4] {
        let w = TAU * self.spec.frequency_hz;
        let phi = self.spec.phase_rad;
        [
            ("arm_yaw", 4.0 * (w * t + phi).sin()),
            ("shoulder_roll", 1.5 * (w * t + PI + phi).sin()),
            ("forearm_yaw", 3.0 * (w / 2.0 * t + PI + phi).sin()),
            ("gripper", -4.0 * (w * t + PI + phi).sin()),
        ]
    }

    fn antenna(&self, t: f64) -> f64 {
        15.0 * (TAU * self.spec.frequency_hz * t + self.spec.phase_rad).sin()
    }

    /// Sway for the configured duration.
    async fn sway_for(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        let layout = ctx.robot().layout();
        let duration = Duration::from_millis(self.spec.duration_ms);
        let start = Instant::now();
        while start.elapsed() < duration {
            let t = start.elapsed().as_secs_f64();
            let mut goals = GoalMap::new();
            for (suffix, degrees) in self.sway(t) {
                if let Some(j) = by_suffix(&layout.right_arm, suffix) {
                    goals.insert(j.clone(), degrees);
                }
                if let Some(j) = by_suffix(&layout.left_arm, suffix) {
                    goals.insert(j.clone(), -degrees);
                }
            }
            let antenna = self.antenna(t);
            for (i, joint) in layout.antennas.iter().enumerate() {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                goals.insert(joint.clone(), sign * antenna);
            }
            ctx.body().apply(&goals);
            ctx.sleep(SWAY_PERIOD).await?;
        }
        Ok(())
    }
}

fn by_suffix<'a>(joints: &'a [JointId], suffix: &str) -> Option<&'a JointId> {
    let suffix = format!("_{suffix}");
    joints.iter().find(|j| j.as_str().ends_with(&suffix))
}

#[async_trait]
impl Behavior for Breathing {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        let layout = ctx.robot().layout();
        let arms = layout.arms();
        ctx.body().stiffen(&arms);
        ctx.body().stiffen(&layout.antennas);
        ctx.move_to(&layout.arms_neutral(), Duration::from_secs(1), Interpolation::Linear)
            .await?;

        let audio = ctx.robot().audio();
        accompany(audio.as_ref(), &self.spec.cues, self.sway_for(ctx))
            .await
    }
}
