//! Sound cues timed against a behavior body.
//!
//! ```toml
//! [[behaviors]]
//! kind = "breathing"
//! name = "asleep"
//! cues = [
//!     { at_ms = 1200, clip = "sounds/inhale.wav" },
//!     { at_ms = 4400, clip = "sounds/inhale.wav" },
//! ]
//! ```
//!
//! Offsets count from the moment the body starts.  Playback never blocks the
//! body, and cues still pending when the body ends are dropped.

use std::future::Future;
use std::time::Duration;

use animatron_hal::AudioSink;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    /// Offset from the start of the body, in milliseconds.
    pub at_ms: u64,
    pub clip: String,
}

impl Cue {
    pub fn new(at_ms: u64, clip: impl Into<String>) -> Self {
        Self {
            at_ms,
            clip: clip.into(),
        }
    }
}

/// Fire every cue at its offset from now, earliest first.
pub async fn play_cues(audio: &dyn AudioSink, cues: &[Cue]) {
    let start = Instant::now();
    let mut ordered: Vec<&Cue> = cues.iter().collect();
    ordered.sort_by_key(|c| c.at_ms);
    for cue in ordered {
        let Some(deadline) = start.checked_add(Duration::from_millis(cue.at_ms)) else {
            break;
        };
        tokio::time::sleep_until(deadline).await;
        debug!(clip = %cue.clip, at_ms = cue.at_ms, "sound cue");
        audio.play(&cue.clip);
    }
}

/// Await `body` while `cues` play alongside it.
pub async fn accompany<F: Future>(audio: &dyn AudioSink, cues: &[Cue], body: F) -> F::Output {
    if cues.is_empty() {
        return body.await;
    }
    tokio::pin!(body);
    tokio::select! {
        biased;
        out = &mut body => return out,
        () = play_cues(audio, cues) => {}
    }
    body.await
}
