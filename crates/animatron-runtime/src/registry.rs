//! [`BehaviorRegistry`] – the fixed set of behaviors the idle scheduler draws
//! from.
//!
//! Keys are behavior names.  The registry is validated once at construction
//! (non-empty, no duplicate names) and never changes afterwards; its order is
//! the registration order, which is what a [`KeyPicker`] indexes into.

use std::sync::Arc;

use animatron_types::AnimError;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::behavior::Behavior;

/// Source of the scheduler's draws.
///
/// Injectable so tests can force the sequence of picks.
pub trait KeyPicker: Send {
    /// Index of the next entry, in `0..len`.  `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Memoryless uniform draw.
pub struct UniformPicker(SmallRng);

impl UniformPicker {
    pub fn from_entropy() -> Self {
        Self(SmallRng::from_entropy())
    }

    /// Reproducible draws for a given `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

impl KeyPicker for UniformPicker {
    fn pick(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// Ordered, immutable mapping name → behavior.
#[derive(Clone)]
pub struct BehaviorRegistry {
    entries: Vec<Arc<dyn Behavior>>,
}

impl BehaviorRegistry {
    /// # Errors
    ///
    /// [`AnimError::EmptyRegistry`] when `entries` is empty and
    /// [`AnimError::DuplicateBehavior`] when two entries share a name.
    pub fn new(entries: Vec<Arc<dyn Behavior>>) -> Result<Self, AnimError> {
        if entries.is_empty() {
            return Err(AnimError::EmptyRegistry);
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name() == entry.name()) {
                return Err(AnimError::DuplicateBehavior(entry.name().to_string()));
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: construction rejects empty registries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name())
    }

    /// Draw one entry with `picker`.  Out-of-range picks wrap around.
    pub fn choose(&self, picker: &mut dyn KeyPicker) -> Arc<dyn Behavior> {
        let index = picker.pick(self.entries.len()) % self.entries.len();
        Arc::clone(&self.entries[index])
    }
}
