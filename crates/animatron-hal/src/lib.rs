//! `animatron-hal` – Hardware Abstraction Layer
//!
//! Everything the supervision layer consumes from the outside world, expressed
//! as traits so the runtime never depends on a particular robot SDK.
//!
//! # Modules
//!
//! - [`actuator`] – [`ActuatorFacade`]: per-joint goal / torque / compliance
//!   setters plus the async "interpolate to target" primitive.
//! - [`body`] – [`BodyLayout`]: named joint groups (head, antennas, arms) and
//!   the arm rest pose.
//! - [`trajectory`] – interpolation profiles used by facades that implement
//!   `move_to` in software.
//! - [`gaze`] – [`GazeSolver`] and the [`PanTiltGaze`] reference solver.
//! - [`detection`] – [`DetectionSource`] and the watch-channel backed
//!   [`DetectionFeed`] written by an independent producer.
//! - [`audio`] – [`AudioSink`]: non-blocking clip playback.
//! - [`sim`] – in-process simulation backend for CI and the CLI.

pub mod actuator;
pub mod audio;
pub mod body;
pub mod detection;
pub mod gaze;
pub mod sim;
pub mod trajectory;

pub use actuator::ActuatorFacade;
pub use audio::AudioSink;
pub use body::BodyLayout;
pub use detection::{Detection, DetectionFeed, DetectionPublisher, DetectionSource, detection_feed};
pub use gaze::{GazeSolver, PanTiltGaze};
pub use sim::{DutyCycle, SimAudio, SimBody, spawn_duty_cycle};
