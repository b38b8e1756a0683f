//! Execution context handed to every behavior.
//!
//! [`Robot`] bundles the hardware handles explicitly (there is no global
//! connection).  [`BehaviorContext`] adds the cancellation token of the task
//! the behavior runs in; its async helpers are the only suspension points
//! behaviors use, and each of them returns [`Cancelled`] as soon as the token
//! fires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use animatron_hal::{ActuatorFacade, AudioSink, BodyLayout, GazeSolver, SimAudio};
use animatron_types::{Cancelled, GazePoint, GoalMap, Interpolation};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Shared handles to the robot's hardware.  Cheap to clone.
#[derive(Clone)]
pub struct Robot {
    body: Arc<dyn ActuatorFacade>,
    gaze: Arc<dyn GazeSolver>,
    layout: Arc<BodyLayout>,
    audio: Arc<dyn AudioSink>,
}

impl Robot {
    /// Clips go to a [`SimAudio`] until [`with_audio`](Self::with_audio)
    /// plugs in a real speaker.
    pub fn new(
        body: Arc<dyn ActuatorFacade>,
        gaze: Arc<dyn GazeSolver>,
        layout: BodyLayout,
    ) -> Self {
        Self {
            body,
            gaze,
            layout: Arc::new(layout),
            audio: Arc::new(SimAudio::default()),
        }
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    pub fn body(&self) -> &dyn ActuatorFacade {
        self.body.as_ref()
    }

    pub fn gaze(&self) -> &dyn GazeSolver {
        self.gaze.as_ref()
    }

    pub fn layout(&self) -> &BodyLayout {
        &self.layout
    }

    pub fn audio(&self) -> Arc<dyn AudioSink> {
        Arc::clone(&self.audio)
    }
}

/// A [`Robot`] plus the cancellation token of the running task.
#[derive(Clone)]
pub struct BehaviorContext {
    robot: Robot,
    cancel: CancellationToken,
}

impl BehaviorContext {
    pub fn new(robot: Robot, cancel: CancellationToken) -> Self {
        Self { robot, cancel }
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn body(&self) -> &dyn ActuatorFacade {
        self.robot.body()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Await `fut` unless the task is cancelled first.
    ///
    /// Cancellation wins ties, so a suspension point entered after the token
    /// fired never runs its future.
    pub async fn suspend<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.suspend(tokio::time::sleep(duration)).await
    }

    /// Yield to the scheduler once.
    pub async fn checkpoint(&self) -> Result<(), Cancelled> {
        self.suspend(tokio::task::yield_now()).await
    }

    pub async fn move_to(
        &self,
        goals: &GoalMap,
        duration: Duration,
        profile: Interpolation,
    ) -> Result<(), Cancelled> {
        self.suspend(self.body().move_to(goals, duration, profile))
            .await
    }

    /// Turn the head toward `point` over `duration`.
    ///
    /// An unreachable point leaves the head where it is; only the suspension
    /// is kept so the caller's timing does not collapse.
    pub async fn look_at(
        &self,
        point: GazePoint,
        duration: Duration,
        profile: Interpolation,
    ) -> Result<(), Cancelled> {
        match self.robot.gaze().solve(point) {
            Ok(goals) => self.move_to(&goals, duration, profile).await,
            Err(e) => {
                warn!(error = %e, "skipping look-at");
                self.sleep(duration).await
            }
        }
    }
}
