//! Recorded motion playback.
//!
//! A [`MotionAsset`] is a JSON table sampled at a fixed rate:
//!
//! ```json
//! {
//!   "sample_rate_hz": 100.0,
//!   "joints": ["neck_yaw", "neck_pitch", "r_elbow_pitch"],
//!   "frames": [[0.0, 0.0, -40.0], [0.4, -0.2, -41.5]]
//! }
//! ```
//!
//! [`ReplayTrajectory`] eases to the first played frame over one second,
//! then streams the remaining frames at the asset's rate.  [`Cue`] offsets
//! count from the first streamed frame.

use std::path::{Path, PathBuf};
use std::time::Duration;

use animatron_types::{AnimError, Cancelled, GoalMap, Interpolation, JointId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::Behavior;
use crate::context::BehaviorContext;
use crate::cues::{Cue, accompany};

/// Time taken to reach the first frame before playback starts.
const APPROACH: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionAsset {
    pub sample_rate_hz: f64,
    pub joints: Vec<JointId>,
    /// One row per sample, one column per entry of `joints`, in degrees.
    pub frames: Vec<Vec<f64>>,
}

impl MotionAsset {
    /// Read and validate an asset file.
    ///
    /// # Errors
    ///
    /// [`AnimError::Asset`] when the file cannot be read, is not valid JSON
    /// or fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, AnimError> {
        let asset_err = |details: String| AnimError::Asset {
            path: path.display().to_string(),
            details,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| asset_err(e.to_string()))?;
        let asset: MotionAsset =
            serde_json::from_str(&raw).map_err(|e| asset_err(e.to_string()))?;
        asset.validate().map_err(asset_err)?;
        Ok(asset)
    }

    /// Check the table's shape.  Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(format!("invalid sample rate {}", self.sample_rate_hz));
        }
        Duration::try_from_secs_f64(1.0 / self.sample_rate_hz)
            .map_err(|e| format!("sample rate {} Hz: {e}", self.sample_rate_hz))?;
        if self.joints.is_empty() {
            return Err("no joints".into());
        }
        if self.frames.is_empty() {
            return Err("no frames".into());
        }
        if let Some(i) = self.frames.iter().position(|f| f.len() != self.joints.len()) {
            return Err(format!(
                "frame {i} has {} values for {} joints",
                self.frames[i].len(),
                self.joints.len()
            ));
        }
        Ok(())
    }

    /// Time between frames.  Saturates for rates [`validate`](Self::validate)
    /// rejects.
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.sample_rate_hz).unwrap_or(Duration::MAX)
    }

    fn frame(&self, index: usize) -> GoalMap {
        self.joints
            .iter()
            .cloned()
            .zip(self.frames[index].iter().copied())
            .collect()
    }
}

/// `kind = "replay"` catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySpec {
    pub name: String,
    /// Path to the JSON asset.
    pub asset: PathBuf,
    /// Index of the first frame to play.
    #[serde(default)]
    pub start_frame: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<Cue>,
}

/// Plays one [`MotionAsset`].
#[derive(Debug)]
pub struct ReplayTrajectory {
    name: String,
    asset: MotionAsset,
    start_frame: usize,
    cues: Vec<Cue>,
}

impl ReplayTrajectory {
    /// # Errors
    ///
    /// [`AnimError::Asset`] when the asset is malformed or `start_frame` is
    /// past its last frame.
    pub fn new(
        name: impl Into<String>,
        asset: MotionAsset,
        start_frame: usize,
    ) -> Result<Self, AnimError> {
        let name = name.into();
        let invalid = |details: String| AnimError::Asset {
            path: name.clone(),
            details,
        };
        asset.validate().map_err(invalid)?;
        if start_frame >= asset.frames.len() {
            return Err(invalid(format!(
                "start frame {start_frame} past the last of {} frames",
                asset.frames.len()
            )));
        }
        Ok(Self {
            name,
            asset,
            start_frame,
            cues: Vec::new(),
        })
    }

    pub fn with_cues(mut self, cues: Vec<Cue>) -> Self {
        self.cues = cues;
        self
    }

    /// Load the asset named by `spec` and build the behavior.
    ///
    /// # Errors
    ///
    /// See [`MotionAsset::load`] and [`ReplayTrajectory::new`].
    pub fn from_spec(spec: &ReplaySpec) -> Result<Self, AnimError> {
        let asset = MotionAsset::load(&spec.asset)?;
        Ok(Self::new(spec.name.clone(), asset, spec.start_frame)?.with_cues(spec.cues.clone()))
    }

    async fn stream(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        let period = self.asset.period();
        let frames = self.asset.frames.len() - self.start_frame;
        debug!(behavior = %self.name, frames, "replaying");
        for index in self.start_frame..self.asset.frames.len() {
            ctx.body().apply(&self.asset.frame(index));
            ctx.sleep(period).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Behavior for ReplayTrajectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        ctx.body().stiffen(&self.asset.joints);
        ctx.move_to(
            &self.asset.frame(self.start_frame),
            APPROACH,
            Interpolation::Linear,
        )
        .await?;

        let audio = ctx.robot().audio();
        accompany(audio.as_ref(), &self.cues, self.stream(ctx)).await
    }
}
