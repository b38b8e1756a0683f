//! [`Player`] – play a single catalog behavior on its own.
//!
//! Used to preview one behavior without the idle scheduler or the arbiter.
//! The whole body is stiffened first; afterwards any arm the behavior left
//! stiff is turned off smoothly.

use std::sync::Arc;
use std::time::Duration;

use animatron_types::Cancelled;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::behavior::{Behavior, run_to_end};
use crate::context::{BehaviorContext, Robot};

pub struct Player {
    inner: Arc<dyn Behavior>,
    relax_duration: Duration,
}

impl Player {
    pub fn new(inner: Arc<dyn Behavior>, relax_duration: Duration) -> Self {
        Self {
            inner,
            relax_duration,
        }
    }
}

#[async_trait]
impl Behavior for Player {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn setup(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        ctx.body().stiffen(&ctx.robot().layout().all());
        Ok(())
    }

    async fn run(&self, ctx: &BehaviorContext) -> Result<(), Cancelled> {
        info!(behavior = self.inner.name(), "playing");
        run_to_end(self.inner.as_ref(), ctx, true).await
    }

    async fn teardown(&self, robot: &Robot) {
        let layout = robot.layout();
        for arm in [&layout.right_arm, &layout.left_arm] {
            let stiff = arm.first().is_some_and(|j| !robot.body().is_compliant(j));
            if stiff {
                debug!(joints = arm.len(), "turning off a stiff arm");
                robot.body().relax(arm, self.relax_duration).await;
            }
        }
    }
}
