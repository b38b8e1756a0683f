//! [`ModeArbiter`] – exclusive switching between idle play and tracking.
//!
//! Polls the detection source at a fixed tick.  Each tick:
//!
//! | Detection | Tracking live? | Action |
//! |---|---|---|
//! | none | – | if idle is down: stop tracking, **then** start idle |
//! | target | no | stop idle, reset the command, fold in this tick, publish, **then** start tracking |
//! | target | yes | fold in this tick and publish |
//!
//! Every switch waits for the outgoing mode to finish its teardown before the
//! incoming one starts, so the two never drive the body at the same time.
//! Completed switches are broadcast as [`ModeChange`] events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use animatron_hal::DetectionSource;
use animatron_types::{AnimError, Cancelled, GazePoint, Mode, ModeChange, TargetPixel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use crate::behavior::{Behavior, BehaviorTask};
use crate::context::{BehaviorContext, Robot};
use crate::gaze_control::{FrameCenter, GazeGains, GazeIntegrator};
use crate::tracking::{TrackingConfig, TrackingControlLoop};

const CHANGE_CAPACITY: usize = 64;

/// `[arbiter]` section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// Detection polling interval, in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    /// Fixed forward distance of the look-at point, in metres.
    #[serde(default = "default_gaze_x")]
    pub gaze_x: f64,
    #[serde(default)]
    pub gains: GazeGains,
    #[serde(default)]
    pub center: FrameCenter,
}

fn default_poll_ms() -> u64 {
    10
}

fn default_gaze_x() -> f64 {
    0.5
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            poll_ms: default_poll_ms(),
            gains: GazeGains::default(),
            center: FrameCenter::default(),
            gaze_x: default_gaze_x(),
        }
    }
}

pub struct ModeArbiter {
    detection: Arc<dyn DetectionSource>,
    idle: BehaviorTask,
    tracking: BehaviorTask,
    integrator: Mutex<GazeIntegrator>,
    target: watch::Sender<GazePoint>,
    gaze_x: f64,
    poll: Duration,
    mode: Mutex<Option<Mode>>,
    changes: broadcast::Sender<ModeChange>,
}

impl ModeArbiter {
    /// `idle` is run as a root task; the tracking loop is built here and fed
    /// from the arbiter's own target channel.
    pub fn new(
        config: &ArbiterConfig,
        tracking: &TrackingConfig,
        detection: Arc<dyn DetectionSource>,
        idle: Arc<dyn Behavior>,
        robot: Robot,
    ) -> Self {
        let (target, rx) = watch::channel(GazePoint::new(config.gaze_x, 0.0, 0.0));
        let control = TrackingControlLoop::new(rx, tracking);
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            detection,
            idle: BehaviorTask::root(idle, robot.clone()),
            tracking: BehaviorTask::root(Arc::new(control), robot),
            integrator: Mutex::new(GazeIntegrator::new(config.gains, config.center)),
            target,
            gaze_x: config.gaze_x,
            poll: Duration::from_millis(config.poll_ms),
            mode: Mutex::new(None),
            changes,
        }
    }

    pub fn idle(&self) -> &BehaviorTask {
        &self.idle
    }

    pub fn tracking(&self) -> &BehaviorTask {
        &self.tracking
    }

    /// Mode of the last completed switch; `None` before the first tick.
    pub fn mode(&self) -> Option<Mode> {
        *lock(&self.mode)
    }

    /// Current `(cmd_y, cmd_z)`.
    pub fn command(&self) -> (f64, f64) {
        lock(&self.integrator).command()
    }

    /// Look-at point last published to the tracking loop.
    pub fn target(&self) -> GazePoint {
        *self.target.borrow()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModeChange> {
        self.changes.subscribe()
    }

    /// One polling step.
    ///
    /// # Errors
    ///
    /// Propagates a failed start of the incoming mode.
    pub async fn tick(&self) -> Result<(), AnimError> {
        match self.detection.snapshot() {
            None => {
                if !self.idle.is_running() {
                    halt(&self.tracking).await;
                    self.idle.start().await?;
                    self.switch(Mode::Idle);
                }
            }
            Some(pixel) if self.tracking.is_running() => self.steer(pixel),
            Some(pixel) => {
                halt(&self.idle).await;
                lock(&self.integrator).reset();
                self.steer(pixel);
                self.tracking.start().await?;
                self.switch(Mode::Tracking);
            }
        }
        Ok(())
    }

    fn steer(&self, pixel: TargetPixel) {
        let (y, z) = lock(&self.integrator).update(pixel);
        self.target.send_replace(GazePoint::new(self.gaze_x, y, z));
    }

    fn switch(&self, to: Mode) {
        let from = lock(&self.mode).replace(to);
        if from == Some(to) {
            return;
        }
        info!(from = ?from, %to, "mode change");
        // No subscribers is fine.
        let _ = self.changes.send(ModeChange::new(from, to));
    }
}

async fn halt(task: &BehaviorTask) {
    if task.stop().await.is_err() {
        debug!(behavior = task.name(), "stopped task reported cancellation");
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Behavior for ModeArbiter {
    fn name(&self) -> &str {
        "arbiter"
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        loop {
            if let Err(e) = ctx.suspend(self.tick()).await? {
                error!(error = %e, "arbiter tick failed");
            }
            ctx.sleep(self.poll).await?;
        }
    }

    async fn teardown(&self, _robot: &Robot) {
        halt(&self.tracking).await;
        halt(&self.idle).await;
    }
}
