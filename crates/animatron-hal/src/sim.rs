//! In-process simulation backend for CI/CD testing without physical hardware.
//!
//! [`SimBody`] implements [`ActuatorFacade`] over an in-memory joint table:
//! positions follow goals instantly and `move_to` streams interpolated goals
//! at [`SIM_PERIOD`].  [`spawn_duty_cycle`] plays the role of the external
//! detector, alternating between a visible target and an empty frame.
//! [`SimAudio`] logs clips instead of playing them.
//!
//! # Example
//!
//! ```rust
//! use animatron_hal::{ActuatorFacade, BodyLayout, SimBody};
//!
//! let body = SimBody::new(&BodyLayout::default());
//! body.set_goal_position(&"neck_yaw".into(), 15.0);
//! assert_eq!(body.present_position(&"neck_yaw".into()), Some(15.0));
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use animatron_types::{GoalMap, Interpolation, JointId, TargetPixel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actuator::{ActuatorFacade, FULL_TORQUE};
use crate::audio::AudioSink;
use crate::body::BodyLayout;
use crate::detection::DetectionPublisher;
use crate::trajectory::{blend, ease, sample_count};

/// Streaming period of simulated trajectories (100 Hz).
pub const SIM_PERIOD: Duration = Duration::from_millis(10);

// ────────────────────────────────────────────────────────────────────────────
// Simulated body
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SimJoint {
    goal: f64,
    torque_limit: f64,
    compliant: bool,
}

impl Default for SimJoint {
    fn default() -> Self {
        Self {
            goal: 0.0,
            torque_limit: FULL_TORQUE,
            compliant: true,
        }
    }
}

/// A simulated robot body.  Joints start compliant at position zero.
pub struct SimBody {
    joints: Mutex<BTreeMap<JointId, SimJoint>>,
    writes: AtomicU64,
}

impl SimBody {
    /// Create a body with every joint of `layout`.
    pub fn new(layout: &BodyLayout) -> Self {
        Self {
            joints: Mutex::new(
                layout
                    .all()
                    .into_iter()
                    .map(|j| (j, SimJoint::default()))
                    .collect(),
            ),
            writes: AtomicU64::new(0),
        }
    }

    /// Current torque limit of `joint`, in percent.
    pub fn torque_limit(&self, joint: &JointId) -> Option<f64> {
        self.table().get(joint).map(|s| s.torque_limit)
    }

    /// Total number of goal-position writes accepted so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<JointId, SimJoint>> {
        self.joints.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_joint(&self, joint: &JointId, f: impl FnOnce(&mut SimJoint)) -> bool {
        match self.table().get_mut(joint) {
            Some(state) => {
                f(state);
                true
            }
            None => {
                warn!(%joint, "ignoring write to unknown joint");
                false
            }
        }
    }
}

#[async_trait]
impl ActuatorFacade for SimBody {
    fn set_goal_position(&self, joint: &JointId, degrees: f64) {
        if self.with_joint(joint, |s| s.goal = degrees) {
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn goal_position(&self, joint: &JointId) -> Option<f64> {
        self.table().get(joint).map(|s| s.goal)
    }

    fn present_position(&self, joint: &JointId) -> Option<f64> {
        self.goal_position(joint)
    }

    fn set_torque_limit(&self, joint: &JointId, percent: f64) {
        self.with_joint(joint, |s| s.torque_limit = percent.clamp(0.0, FULL_TORQUE));
    }

    fn set_compliant(&self, joint: &JointId, compliant: bool) {
        self.with_joint(joint, |s| s.compliant = compliant);
    }

    fn is_compliant(&self, joint: &JointId) -> bool {
        self.table().get(joint).is_none_or(|s| s.compliant)
    }

    async fn move_to(&self, goals: &GoalMap, duration: Duration, profile: Interpolation) {
        let start: GoalMap = goals
            .keys()
            .filter_map(|j| self.goal_position(j).map(|g| (j.clone(), g)))
            .collect();
        let samples = sample_count(duration, SIM_PERIOD);
        let period = duration / samples;
        for k in 1..=samples {
            let s = ease(profile, f64::from(k) / f64::from(samples));
            self.apply(&blend(&start, goals, s));
            tokio::time::sleep(period).await;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated audio
// ────────────────────────────────────────────────────────────────────────────

/// Audio sink that logs and records every clip.
#[derive(Debug, Default)]
pub struct SimAudio {
    played: Mutex<Vec<String>>,
}

impl SimAudio {
    /// Clips played so far, oldest first.
    pub fn played(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AudioSink for SimAudio {
    fn play(&self, clip: &str) {
        info!(clip, "sim audio: playing");
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(clip.to_string());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated detector
// ────────────────────────────────────────────────────────────────────────────

/// Visibility pattern of the simulated detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DutyCycle {
    /// How long the target stays in view each cycle, in milliseconds.
    pub visible_ms: u64,
    /// How long the frame stays empty each cycle, in milliseconds.
    pub hidden_ms: u64,
    /// Where the target appears while visible.
    pub row: f64,
    pub col: f64,
}

impl Default for DutyCycle {
    fn default() -> Self {
        Self {
            visible_ms: 8_000,
            hidden_ms: 20_000,
            row: 150.0,
            col: 170.0,
        }
    }
}

/// Drive `publisher` with `cycle`, starting with an empty frame.  The task
/// ends once every feed attached to the publisher has been dropped.
pub fn spawn_duty_cycle(publisher: DetectionPublisher, cycle: DutyCycle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pixel = TargetPixel {
            row: cycle.row,
            col: cycle.col,
            depth: 1.0,
        };
        while !publisher.is_closed() {
            publisher.lost();
            tokio::time::sleep(Duration::from_millis(cycle.hidden_ms)).await;
            debug!(row = pixel.row, col = pixel.col, "sim detector: target in view");
            publisher.seen(pixel);
            tokio::time::sleep(Duration::from_millis(cycle.visible_ms)).await;
        }
    })
}
