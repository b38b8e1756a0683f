//! Sound output.
//!
//! Behaviors fire short clips (an inhale, a sneeze, a whistle) while they
//! keep moving, so [`AudioSink::play`] must return immediately and let the
//! clip finish on its own.

/// Fire-and-forget clip playback.
pub trait AudioSink: Send + Sync {
    /// Start playing `clip`.  Must not block; an unknown clip is the sink's
    /// problem and is not reported back.
    fn play(&self, clip: &str);
}
