use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a single robot joint (e.g. `"neck_yaw"`, `"r_elbow_pitch"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointId(pub String);

impl JointId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JointId {
    fn from(id: &str) -> Self {
        JointId(id.to_string())
    }
}

/// Per-joint goal positions in degrees, ordered by joint id so that
/// application order is deterministic.
pub type GoalMap = BTreeMap<JointId, f64>;

/// A 3D look-at point in the robot frame, in metres.
///
/// `x` points forward, `y` to the robot's left and `z` up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GazePoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for GazePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Last known location of a detected target in the camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetPixel {
    pub row: f64,
    pub col: f64,
    /// Estimated distance, when the detector provides one.
    pub depth: f64,
}

/// Velocity profile used when interpolating toward a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    #[default]
    Linear,
    MinimumJerk,
}

/// Which behavior currently owns the gaze and arm actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Idle,
    Tracking,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "idle"),
            Mode::Tracking => write!(f, "tracking"),
        }
    }
}

/// A completed arbiter transition, broadcast to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeChange {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// `None` for the very first transition after the arbiter starts.
    pub from: Option<Mode>,
    pub to: Mode,
}

impl ModeChange {
    pub fn new(from: Option<Mode>, to: Mode) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            from,
            to,
        }
    }
}

/// Cooperative cancellation signal.
///
/// This is control flow, not a failure: leaf behaviors hand it back to their
/// caller unchanged, root behaviors absorb it after running their teardown.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("behavior cancelled")]
pub struct Cancelled;

/// Domain and usage errors of the animation stack.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    #[error("gaze target {point} is unreachable")]
    Unreachable { point: GazePoint },

    #[error("behavior '{0}' is already running")]
    AlreadyRunning(String),

    #[error("behavior registry is empty")]
    EmptyRegistry,

    #[error("behavior '{0}' is registered twice")]
    DuplicateBehavior(String),

    #[error("unknown behavior '{0}'")]
    UnknownBehavior(String),

    #[error("motion asset {path}: {details}")]
    Asset { path: String, details: String },

    #[error("configuration error: {0}")]
    Config(String),
}
