//! Visual target detection, as seen by the supervision layer.
//!
//! The detector itself runs elsewhere; it pushes its latest result through a
//! [`DetectionPublisher`] and the arbiter samples it through the matching
//! [`DetectionFeed`].  Built on [`tokio::sync::watch`], so readers always see
//! the most recent value and never block the producer.

use animatron_types::TargetPixel;
use tokio::sync::watch;

/// Read side of an external target detector.
pub trait DetectionSource: Send + Sync {
    /// Whether a target is currently in view.
    fn target_visible(&self) -> bool;

    /// Where the target was last seen, even if it has since left the frame.
    fn last_target_pixel(&self) -> TargetPixel;

    /// The target location if one is currently visible.
    fn snapshot(&self) -> Option<TargetPixel> {
        self.target_visible().then(|| self.last_target_pixel())
    }
}

/// One detector result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Detection {
    pub visible: bool,
    pub pixel: TargetPixel,
}

/// Create a connected publisher / feed pair.  Starts with no target visible.
pub fn detection_feed() -> (DetectionPublisher, DetectionFeed) {
    let (tx, rx) = watch::channel(Detection::default());
    (DetectionPublisher { tx }, DetectionFeed { rx })
}

/// Producer handle held by the detector.
#[derive(Debug)]
pub struct DetectionPublisher {
    tx: watch::Sender<Detection>,
}

impl DetectionPublisher {
    /// Report a visible target at `pixel`.
    pub fn seen(&self, pixel: TargetPixel) {
        self.tx.send_replace(Detection {
            visible: true,
            pixel,
        });
    }

    /// Report that the target left the frame; its last pixel is kept.
    pub fn lost(&self) {
        self.tx.send_modify(|d| d.visible = false);
    }

    /// `true` once every feed has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle sampled by the arbiter.
#[derive(Debug, Clone)]
pub struct DetectionFeed {
    rx: watch::Receiver<Detection>,
}

impl DetectionSource for DetectionFeed {
    fn target_visible(&self) -> bool {
        self.rx.borrow().visible
    }

    fn last_target_pixel(&self) -> TargetPixel {
        self.rx.borrow().pixel
    }

    // Single borrow so the flag and the pixel come from the same result.
    fn snapshot(&self) -> Option<TargetPixel> {
        let latest = *self.rx.borrow();
        latest.visible.then_some(latest.pixel)
    }
}
