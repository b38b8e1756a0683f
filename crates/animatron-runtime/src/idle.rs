//! [`IdleScheduler`] – the always-on idle mode.
//!
//! Plays registry entries one after another, forever.  Each entry is drawn
//! uniformly at random (repeats allowed) and run inline, as a leaf, with the
//! scheduler's own cancellation context.  Cancelling the scheduler therefore
//! unwinds through whichever entry is playing, skipping that entry's
//! teardown, and lands in the scheduler's teardown, which relaxes the whole
//! body.
//!
//! An optional rest interlude is played before every draw; the body is
//! stiffened again once it ends.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use animatron_types::Cancelled;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::behavior::{Behavior, run_to_end};
use crate::context::{BehaviorContext, Robot};
use crate::registry::{BehaviorRegistry, KeyPicker};

/// `[idle]` section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleConfig {
    /// Seed for the draw sequence; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Name of a catalog behavior played between draws.
    #[serde(default)]
    pub rest: Option<String>,
    /// Duration of the final smooth turn-off, in milliseconds.
    #[serde(default = "default_relax_ms")]
    pub relax_ms: u64,
}

fn default_relax_ms() -> u64 {
    1_000
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            seed: None,
            rest: None,
            relax_ms: default_relax_ms(),
        }
    }
}

pub struct IdleScheduler {
    registry: BehaviorRegistry,
    picker: Mutex<Box<dyn KeyPicker>>,
    interlude: Option<Arc<dyn Behavior>>,
    relax_duration: Duration,
}

impl IdleScheduler {
    pub fn new(registry: BehaviorRegistry, picker: Box<dyn KeyPicker>) -> Self {
        Self {
            registry,
            picker: Mutex::new(picker),
            interlude: None,
            relax_duration: Duration::from_millis(default_relax_ms()),
        }
    }

    /// Play `rest` before every draw.
    pub fn with_interlude(mut self, rest: Arc<dyn Behavior>) -> Self {
        self.interlude = Some(rest);
        self
    }

    pub fn with_relax_duration(mut self, duration: Duration) -> Self {
        self.relax_duration = duration;
        self
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    fn draw(&self) -> Arc<dyn Behavior> {
        let mut picker = self.picker.lock().unwrap_or_else(PoisonError::into_inner);
        self.registry.choose(picker.as_mut())
    }
}

#[async_trait]
impl Behavior for IdleScheduler {
    fn name(&self) -> &str {
        "idle"
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        let layout = ctx.robot().layout();
        loop {
            if let Some(rest) = &self.interlude {
                info!(behavior = rest.name(), "playing rest interlude");
                run_to_end(rest.as_ref(), ctx, true).await?;
                ctx.body().stiffen(&layout.all());
            }

            let entry = self.draw();
            info!(behavior = entry.name(), "playing idle behavior");
            run_to_end(entry.as_ref(), ctx, true).await?;
            ctx.checkpoint().await?;
        }
    }

    async fn teardown(&self, robot: &Robot) {
        debug!("idle: relaxing every joint");
        robot
            .body()
            .relax(&robot.layout().all(), self.relax_duration)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{BehaviorTask, Phase};
    use crate::testing::{ForcedPicker, Journal, Scripted, Traced, sim_robot};
    use animatron_hal::ActuatorFacade;
    use animatron_types::JointId;

    fn scripted(name: &str, hold_ms: u64, journal: &Journal) -> Arc<dyn Behavior> {
        Arc::new(Scripted::new(name, Duration::from_millis(hold_ms)).with_journal(journal.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_unwinds_the_playing_entry() {
        let (robot, body) = sim_robot();
        let journal = Journal::default();
        let registry = BehaviorRegistry::new(vec![
            scripted("a", 10, &journal),
            scripted("b", 3_600_000, &journal),
        ])
        .unwrap();
        let scheduler = IdleScheduler::new(registry, Box::new(ForcedPicker::new([0, 1])))
            .with_relax_duration(Duration::from_millis(100));

        let elbow = JointId::from("r_elbow_pitch");
        body.stiffen(std::slice::from_ref(&elbow));

        let idle = BehaviorTask::root(Arc::new(Traced::new(scheduler, journal.clone())), robot);
        idle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(idle.stop().await, Ok(()));
        assert_eq!(idle.stop().await, Ok(()));

        assert_eq!(
            journal.entries(),
            vec!["a.run", "a.done", "a.teardown", "b.run", "idle.teardown"]
        );
        assert_eq!(journal.count("idle.teardown"), 1);
        assert_eq!(journal.count("b.teardown"), 0);
        assert_eq!(idle.phase(), Phase::TornDown);
        assert!(body.is_compliant(&elbow));
    }

    #[tokio::test(start_paused = true)]
    async fn interlude_plays_before_every_draw() {
        let (robot, _) = sim_robot();
        let journal = Journal::default();
        let registry = BehaviorRegistry::new(vec![scripted("a", 10, &journal)]).unwrap();
        let scheduler = IdleScheduler::new(registry, Box::new(ForcedPicker::new([0])))
            .with_interlude(scripted("rest", 10, &journal))
            .with_relax_duration(Duration::ZERO);

        let idle = BehaviorTask::root(Arc::new(scheduler), robot);
        idle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(35)).await;
        idle.stop().await.unwrap();

        let entries = journal.entries();
        assert_eq!(
            &entries[..6],
            &[
                "rest.run",
                "rest.done",
                "rest.teardown",
                "a.run",
                "a.done",
                "a.teardown"
            ]
        );
        assert_eq!(entries[6], "rest.run");
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_are_allowed() {
        let (robot, _) = sim_robot();
        let journal = Journal::default();
        let registry =
            BehaviorRegistry::new(vec![scripted("a", 10, &journal), scripted("b", 10, &journal)])
                .unwrap();
        let scheduler = IdleScheduler::new(registry, Box::new(ForcedPicker::new([1, 1, 0])))
            .with_relax_duration(Duration::ZERO);

        let idle = BehaviorTask::root(Arc::new(scheduler), robot);
        idle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        idle.stop().await.unwrap();

        assert_eq!(journal.count("b.teardown"), 2);
        assert_eq!(journal.count("a.teardown"), 0);
    }

    #[test]
    fn config_defaults() {
        let cfg = IdleConfig::default();
        assert_eq!(cfg.relax_ms, 1_000);
        assert!(cfg.seed.is_none());
        assert!(cfg.rest.is_none());
    }
}
