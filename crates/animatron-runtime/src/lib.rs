//! `animatron-runtime` – behavior supervision and mode arbitration.
//!
//! Everything that decides *what* the robot does and *when*, on top of the
//! hardware traits of `animatron-hal`.
//!
//! # Modules
//!
//! - [`behavior`] – the [`Behavior`] trait and [`BehaviorTask`], the
//!   start/stop/wait lifecycle shared by every behavior, with its leaf/root
//!   cancellation policy.
//! - [`context`] – [`Robot`] (explicit hardware handles) and
//!   [`BehaviorContext`], whose cancellable helpers are the only suspension
//!   points behaviors use.
//! - [`registry`] – [`BehaviorRegistry`] and the injectable [`KeyPicker`].
//! - [`idle`] – [`IdleScheduler`]: random, inline, never-ending idle play.
//! - [`gaze_control`] – the quantised incremental control law.
//! - [`tracking`] – [`TrackingControlLoop`]: fixed-rate gaze servo.
//! - [`arbiter`] – [`ModeArbiter`]: exclusive idle / tracking switching
//!   driven by the detection feed.
//! - [`replay`], [`look_around`], [`breathing`] – choreography behaviors.
//! - [`cues`] – [`Cue`]: sound clips fired alongside a behavior body.
//! - [`catalog`] – [`BehaviorSpec`], the closed set of configurable
//!   behaviors, and the builders turning it into a registry.
//! - [`player`] – [`Player`]: preview a single behavior.
//! - [`telemetry`] – [`init_tracing`]: `tracing` subscriber with an optional
//!   OTLP exporter.
//!
//! # Concurrency
//!
//! Designed for a current-thread tokio runtime.  Cancellation is cooperative:
//! a behavior only observes it at the [`BehaviorContext`] suspension points,
//! and [`BehaviorTask::stop`] returns once the task has fully terminated.

pub mod arbiter;
pub mod behavior;
pub mod breathing;
pub mod catalog;
pub mod context;
pub mod cues;
pub mod gaze_control;
pub mod idle;
pub mod look_around;
pub mod player;
pub mod registry;
pub mod replay;
pub mod telemetry;
pub mod tracking;

#[cfg(test)]
pub(crate) mod testing;

pub use arbiter::{ArbiterConfig, ModeArbiter};
pub use behavior::{Behavior, BehaviorTask, Phase, run_to_end};
pub use catalog::{BehaviorSpec, build_idle, build_registry, default_catalog};
pub use context::{BehaviorContext, Robot};
pub use cues::Cue;
pub use idle::{IdleConfig, IdleScheduler};
pub use player::Player;
pub use registry::{BehaviorRegistry, KeyPicker, UniformPicker};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
pub use tracking::{TrackingConfig, TrackingControlLoop};
