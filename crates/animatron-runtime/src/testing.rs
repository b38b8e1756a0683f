//! Test doubles shared by the runtime's unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use animatron_hal::{BodyLayout, PanTiltGaze, SimBody};
use animatron_types::Cancelled;
use async_trait::async_trait;

use crate::behavior::Behavior;
use crate::context::{BehaviorContext, Robot};
use crate::registry::KeyPicker;

/// A simulated robot with the default layout and gaze solver.
pub(crate) fn sim_robot() -> (Robot, Arc<SimBody>) {
    let layout = BodyLayout::default();
    let body = Arc::new(SimBody::new(&layout));
    let robot = Robot::new(body.clone(), Arc::new(PanTiltGaze::default()), layout);
    (robot, body)
}

/// Ordered record of lifecycle events, shareable between behaviors.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Behavior that journals `<name>.setup`, `<name>.run`, `<name>.done` and
/// `<name>.teardown`, holding its body for a fixed time.
pub(crate) struct Scripted {
    name: String,
    hold: Duration,
    setup_hold: Duration,
    journal: Journal,
}

impl Scripted {
    pub(crate) fn new(name: &str, hold: Duration) -> Self {
        Self {
            name: name.to_string(),
            hold,
            setup_hold: Duration::ZERO,
            journal: Journal::default(),
        }
    }

    pub(crate) fn with_setup(mut self, hold: Duration) -> Self {
        self.setup_hold = hold;
        self
    }

    pub(crate) fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub(crate) fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

#[async_trait]
impl Behavior for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        self.journal.push(format!("{}.setup", self.name));
        if !self.setup_hold.is_zero() {
            ctx.sleep(self.setup_hold).await?;
        }
        Ok(())
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        self.journal.push(format!("{}.run", self.name));
        ctx.sleep(self.hold).await?;
        self.journal.push(format!("{}.done", self.name));
        Ok(())
    }

    async fn teardown(&self, _robot: &Robot) {
        self.journal.push(format!("{}.teardown", self.name));
    }
}

/// Wraps another behavior and journals `<name>.teardown` each time its
/// teardown runs.
pub(crate) struct Traced {
    inner: Arc<dyn Behavior>,
    journal: Journal,
}

impl Traced {
    pub(crate) fn new(inner: impl Behavior + 'static, journal: Journal) -> Self {
        Self {
            inner: Arc::new(inner),
            journal,
        }
    }
}

#[async_trait]
impl Behavior for Traced {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn setup(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        self.inner.setup(ctx).await
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        self.inner.run(ctx).await
    }

    async fn teardown(&self, robot: &Robot) {
        self.inner.teardown(robot).await;
        self.journal.push(format!("{}.teardown", self.inner.name()));
    }
}

/// Picker that replays a fixed index sequence, then keeps returning the last
/// index.
pub(crate) struct ForcedPicker {
    queue: VecDeque<usize>,
    last: usize,
}

impl ForcedPicker {
    pub(crate) fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            queue: indices.into_iter().collect(),
            last: 0,
        }
    }
}

impl KeyPicker for ForcedPicker {
    fn pick(&mut self, len: usize) -> usize {
        if let Some(next) = self.queue.pop_front() {
            self.last = next;
        }
        self.last.min(len.saturating_sub(1))
    }
}
