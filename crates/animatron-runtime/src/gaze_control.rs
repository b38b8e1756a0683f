//! Incremental gaze control law.
//!
//! Once per visible detection tick the pixel error between the target and
//! the frame centre is turned into a small correction of the look-at point:
//!
//! ```text
//! cmd_z += quantize(-(row - centre.row) * kpz, 3)
//! cmd_y += quantize(-(col - centre.col) * kpy, 3)
//! ```
//!
//! Only the proportional term is modelled; integrating the quantised
//! corrections is what gives the loop its memory.
//!
//! # Example
//!
//! ```rust
//! use animatron_runtime::gaze_control::{FrameCenter, GazeGains, GazeIntegrator};
//! use animatron_types::TargetPixel;
//!
//! let mut law = GazeIntegrator::new(GazeGains::default(), FrameCenter::default());
//! let (y, z) = law.update(TargetPixel { row: 160.0, col: 60.0, depth: 1.0 });
//! assert_eq!((y, z), (0.006, 0.0)); // target left of centre → look left
//! ```

use animatron_types::TargetPixel;
use serde::{Deserialize, Serialize};

/// Round `value` to `decimals` places, ties to even.
///
/// Scales, rounds with [`f64::round_ties_even`] and scales back, so a value
/// that lands exactly on a half after scaling goes to the even neighbour.
pub fn quantize(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Proportional gains, in look-at metres per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeGains {
    /// Column error → lateral (`y`) correction.
    pub kpy: f64,
    /// Row error → vertical (`z`) correction.
    pub kpz: f64,
}

impl Default for GazeGains {
    fn default() -> Self {
        Self {
            kpy: 0.00006,
            kpz: 0.00005,
        }
    }
}

/// Pixel the controller tries to bring the target to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameCenter {
    pub row: f64,
    pub col: f64,
}

impl Default for FrameCenter {
    fn default() -> Self {
        Self {
            row: 160.0,
            col: 160.0,
        }
    }
}

/// Accumulated `(cmd_y, cmd_z)` correction.
#[derive(Debug, Clone)]
pub struct GazeIntegrator {
    gains: GazeGains,
    center: FrameCenter,
    cmd_y: f64,
    cmd_z: f64,
}

impl GazeIntegrator {
    pub fn new(gains: GazeGains, center: FrameCenter) -> Self {
        Self {
            gains,
            center,
            cmd_y: 0.0,
            cmd_z: 0.0,
        }
    }

    /// Fold one detection into the command and return the new `(cmd_y, cmd_z)`.
    pub fn update(&mut self, target: TargetPixel) -> (f64, f64) {
        let row_offset = target.row - self.center.row;
        let col_offset = target.col - self.center.col;
        self.cmd_z += quantize(-row_offset * self.gains.kpz, 3);
        self.cmd_y += quantize(-col_offset * self.gains.kpy, 3);
        self.command()
    }

    /// Back to the origin.
    pub fn reset(&mut self) {
        self.cmd_y = 0.0;
        self.cmd_z = 0.0;
    }

    pub fn command(&self) -> (f64, f64) {
        (self.cmd_y, self.cmd_z)
    }
}
