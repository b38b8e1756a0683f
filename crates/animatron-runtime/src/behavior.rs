//! Behavior lifecycle and cancellation.
//!
//! A [`Behavior`] is the scripted content (setup, body, teardown).  A
//! [`BehaviorTask`] owns one behavior for the whole process and runs it as a
//! tokio task, at most one at a time, across any number of start/stop
//! cycles.
//!
//! # Lifecycle
//!
//! ```text
//! Created → SettingUp → Running ─┬→ Completed ──┬→ TornDown
//!                                └→ Cancelling ─┘
//!                                └→ Unwound            (leaf only)
//! ```
//!
//! # Cancellation policy
//!
//! | Kind | On cancellation | Teardown |
//! |---|---|---|
//! | root | absorbed, the task ends with `Ok(())` | exactly once, on every exit path |
//! | leaf | handed back as `Err(Cancelled)` | skipped |
//!
//! A leaf that completes normally still runs its teardown.  A body that
//! panics is logged and handled like a cancelled one.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use animatron_types::{AnimError, Cancelled};
use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span};

use crate::context::{BehaviorContext, Robot};

// ────────────────────────────────────────────────────────────────────────────
// Behavior trait
// ────────────────────────────────────────────────────────────────────────────

/// Scripted robot content.
///
/// Implementations are stateless with respect to the lifecycle: the same
/// value is run again on every start.  Every suspension goes through the
/// [`BehaviorContext`] so cancellation is observed.
#[async_trait]
pub trait Behavior: Send + Sync {
    fn name(&self) -> &str;

    /// Preparation awaited by [`BehaviorTask::start`] before the body is
    /// spawned.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if the task is stopped while setting up.
    async fn setup(&self, _ctx: &BehaviorContext) -> Result<(), Cancelled> {
        Ok(())
    }

    /// The body.  May loop forever.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] once the context's token fires.
    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled>;

    /// Cleanup.  Receives the bare [`Robot`] because it runs after the
    /// cancellation token may already have fired and must not be cut short.
    async fn teardown(&self, _robot: &Robot) {}
}

/// Lifecycle state of a [`BehaviorTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Created,
    SettingUp,
    Running,
    Cancelling,
    Completed,
    TornDown,
    /// No teardown ran: a cancelled leaf, an interrupted setup, or a task
    /// that died in its teardown.
    Unwound,
}

// ────────────────────────────────────────────────────────────────────────────
// Supervision
// ────────────────────────────────────────────────────────────────────────────

/// Run `behavior`'s body then its teardown inline, under `ctx`, applying the
/// leaf/root cancellation policy.
///
/// This is how a parent behavior plays a child without spawning a task: the
/// child shares the parent's cancellation token.
///
/// # Errors
///
/// [`Cancelled`] only when `leaf` is set and the body was cancelled.
pub async fn run_to_end(
    behavior: &dyn Behavior,
    ctx: &BehaviorContext,
    leaf: bool,
) -> Result<(), Cancelled> {
    supervise(behavior, ctx, leaf, None).await
}

async fn supervise(
    behavior: &dyn Behavior,
    ctx: &BehaviorContext,
    leaf: bool,
    phase: Option<&watch::Sender<Phase>>,
) -> Result<(), Cancelled> {
    let enter = |p: Phase| {
        if let Some(tx) = phase {
            tx.send_replace(p);
        }
    };

    enter(Phase::Running);
    let body = AssertUnwindSafe(behavior.run(ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            error!(behavior = behavior.name(), "behavior body panicked");
            Err(Cancelled)
        });
    match body {
        Ok(()) => enter(Phase::Completed),
        Err(Cancelled) if leaf => {
            debug!(behavior = behavior.name(), "leaf cancelled, skipping teardown");
            enter(Phase::Unwound);
            return Err(Cancelled);
        }
        Err(Cancelled) => {
            debug!(behavior = behavior.name(), "cancelled");
            enter(Phase::Cancelling);
        }
    }
    behavior.teardown(ctx.robot()).await;
    enter(Phase::TornDown);
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// BehaviorTask
// ────────────────────────────────────────────────────────────────────────────

type Outcome = Shared<BoxFuture<'static, Result<(), Cancelled>>>;

struct Running {
    cancel: CancellationToken,
    abort: AbortHandle,
    outcome: Outcome,
}

/// A `start()` in progress.  `settled` flips to `true` once that call has
/// returned or been dropped.
struct Starting {
    cancel: CancellationToken,
    settled: watch::Receiver<bool>,
}

enum Slot {
    Vacant,
    /// `start()` is awaiting setup; no task exists yet.
    Starting(Starting),
    Live(Running),
}

/// What [`BehaviorTask::stop`] has to wait for.
enum Pending {
    Nothing,
    Setup(watch::Receiver<bool>),
    Task(Outcome),
}

/// Owns one behavior and at most one running task for it.
///
/// # Example
///
/// ```rust,ignore
/// let idle = BehaviorTask::root(Arc::new(scheduler), robot.clone());
/// idle.start().await?;
/// // ...
/// idle.stop().await.ok(); // returns once teardown has finished
/// ```
pub struct BehaviorTask {
    behavior: Arc<dyn Behavior>,
    robot: Robot,
    leaf: bool,
    phase: Arc<watch::Sender<Phase>>,
    slot: Mutex<Slot>,
}

impl BehaviorTask {
    /// A task that absorbs cancellation and always tears down.
    pub fn root(behavior: Arc<dyn Behavior>, robot: Robot) -> Self {
        Self::new(behavior, robot, false)
    }

    /// A task that hands cancellation back and skips teardown when cancelled.
    pub fn leaf(behavior: Arc<dyn Behavior>, robot: Robot) -> Self {
        Self::new(behavior, robot, true)
    }

    fn new(behavior: Arc<dyn Behavior>, robot: Robot, leaf: bool) -> Self {
        let (phase, _) = watch::channel(Phase::Created);
        Self {
            behavior,
            robot,
            leaf,
            phase: Arc::new(phase),
            slot: Mutex::new(Slot::Vacant),
        }
    }

    pub fn name(&self) -> &str {
        self.behavior.name()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Observe phase changes.
    pub fn phases(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// `true` while a spawned task exists and has not terminated.
    pub fn is_running(&self) -> bool {
        matches!(&*self.slot(), Slot::Live(r) if !r.abort.is_finished())
    }

    /// Await setup, then spawn the body.
    ///
    /// A [`stop`](Self::stop) issued during setup aborts the start: nothing is
    /// spawned and the call still returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// [`AnimError::AlreadyRunning`] if a task is live or still setting up;
    /// the live task is left untouched.
    pub async fn start(&self) -> Result<(), AnimError> {
        let (cancel, settled) = self.claim()?;
        let mut claim = Claim {
            slot: &self.slot,
            cancel: cancel.clone(),
            settled,
            armed: true,
        };

        debug!(behavior = self.name(), "setting up");
        self.phase.send_replace(Phase::SettingUp);
        let ctx = BehaviorContext::new(self.robot.clone(), cancel.clone());
        let setup = self.behavior.setup(&ctx).await;

        if setup.is_err() || cancel.is_cancelled() {
            debug!(behavior = self.name(), "start interrupted during setup");
            self.phase.send_replace(Phase::Unwound);
            return Ok(());
        }

        let running = self.spawn(ctx);
        claim.armed = false;
        *self.slot() = Slot::Live(running);
        Ok(())
    }

    /// Signal cancellation and wait until the task has fully terminated.
    ///
    /// No-op before the first start.  During setup, returns once the
    /// interrupted `start()` has released the task, so it can be started
    /// again straight away.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] from a cancelled leaf.
    pub async fn stop(&self) -> Result<(), Cancelled> {
        loop {
            match self.cancel_current() {
                Pending::Nothing => return Ok(()),
                Pending::Task(outcome) => return outcome.await,
                Pending::Setup(mut settled) => {
                    // An error means the `start()` is already gone.
                    let _ = settled.wait_for(|done| *done).await;
                }
            }
        }
    }

    /// Wait for the current task to end on its own, without cancelling it.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if the task was a leaf that got cancelled.
    pub async fn wait(&self) -> Result<(), Cancelled> {
        match self.current_outcome() {
            Some(outcome) => outcome.await,
            None => Ok(()),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        lock(&self.slot)
    }

    fn claim(&self) -> Result<(CancellationToken, watch::Sender<bool>), AnimError> {
        let mut slot = self.slot();
        let busy = match &*slot {
            Slot::Vacant => false,
            Slot::Starting(_) => true,
            Slot::Live(r) => !r.abort.is_finished(),
        };
        if busy {
            return Err(AnimError::AlreadyRunning(self.name().to_string()));
        }
        let cancel = CancellationToken::new();
        let (settled_tx, settled) = watch::channel(false);
        *slot = Slot::Starting(Starting {
            cancel: cancel.clone(),
            settled,
        });
        Ok((cancel, settled_tx))
    }

    fn cancel_current(&self) -> Pending {
        match &*self.slot() {
            Slot::Vacant => Pending::Nothing,
            Slot::Starting(s) => {
                s.cancel.cancel();
                Pending::Setup(s.settled.clone())
            }
            Slot::Live(r) => {
                r.cancel.cancel();
                Pending::Task(r.outcome.clone())
            }
        }
    }

    fn current_outcome(&self) -> Option<Outcome> {
        match &*self.slot() {
            Slot::Live(r) => Some(r.outcome.clone()),
            _ => None,
        }
    }

    fn spawn(&self, ctx: BehaviorContext) -> Running {
        let behavior = Arc::clone(&self.behavior);
        let phase = Arc::clone(&self.phase);
        let leaf = self.leaf;
        let span = info_span!("behavior", name = %behavior.name(), leaf);
        let cancel = ctx.cancel_token();

        let handle = tokio::spawn(
            async move { supervise(behavior.as_ref(), &ctx, leaf, Some(&*phase)).await }
                .instrument(span),
        );
        let abort = handle.abort_handle();
        let name = self.name().to_string();
        let phase = Arc::clone(&self.phase);
        let outcome = handle
            .map(move |joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(behavior = %name, error = %e, "behavior task failed");
                    phase.send_replace(Phase::Unwound);
                    Ok(())
                }
            })
            .boxed()
            .shared();

        Running {
            cancel,
            abort,
            outcome,
        }
    }
}

impl Drop for BehaviorTask {
    fn drop(&mut self) {
        match &*self.slot() {
            Slot::Vacant => {}
            Slot::Starting(s) => s.cancel.cancel(),
            Slot::Live(r) => r.cancel.cancel(),
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases a `Starting` slot if `start()` returns or is dropped before the
/// task goes live.
struct Claim<'a> {
    slot: &'a Mutex<Slot>,
    cancel: CancellationToken,
    settled: watch::Sender<bool>,
    armed: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cancel.cancel();
            let mut slot = lock(self.slot);
            if matches!(&*slot, Slot::Starting(_)) {
                *slot = Slot::Vacant;
            }
        }
        self.settled.send_replace(true);
    }
}
