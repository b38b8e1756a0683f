//! Declarative behavior catalog.
//!
//! The configuration lists behaviors as a closed set of tagged entries
//! ([`BehaviorSpec`]).  They are validated and built once at startup; after
//! that the runtime only deals with `Arc<dyn Behavior>`.
//!
//! ```toml
//! [[behaviors]]
//! kind = "breathing"
//! name = "asleep"
//! duration_ms = 8000
//!
//! [[behaviors]]
//! kind = "replay"
//! name = "wave"
//! asset = "motions/wave.json"
//! cues = [{ at_ms = 0, clip = "sounds/whistling.wav" }]
//! ```

use std::sync::Arc;
use std::time::Duration;

use animatron_types::AnimError;
use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::breathing::{Breathing, BreathingSpec};
use crate::idle::{IdleConfig, IdleScheduler};
use crate::look_around::{LookAround, LookAroundSpec};
use crate::registry::{BehaviorRegistry, KeyPicker, UniformPicker};
use crate::replay::{ReplaySpec, ReplayTrajectory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviorSpec {
    Replay(ReplaySpec),
    LookAround(LookAroundSpec),
    Breathing(BreathingSpec),
}

impl BehaviorSpec {
    pub fn name(&self) -> &str {
        match self {
            BehaviorSpec::Replay(s) => &s.name,
            BehaviorSpec::LookAround(s) => &s.name,
            BehaviorSpec::Breathing(s) => &s.name,
        }
    }

    /// # Errors
    ///
    /// [`AnimError::Asset`] for a replay whose asset is missing or malformed.
    pub fn build(&self) -> Result<Arc<dyn Behavior>, AnimError> {
        let behavior: Arc<dyn Behavior> = match self {
            BehaviorSpec::Replay(s) => Arc::new(ReplayTrajectory::from_spec(s)?),
            BehaviorSpec::LookAround(s) => Arc::new(LookAround::new(s.clone())),
            BehaviorSpec::Breathing(s) => Arc::new(Breathing::new(s.clone())),
        };
        Ok(behavior)
    }
}

/// Catalog used when the configuration lists no behaviors.  Needs no asset
/// files.
pub fn default_catalog() -> Vec<BehaviorSpec> {
    vec![
        BehaviorSpec::LookAround(LookAroundSpec::default()),
        BehaviorSpec::Breathing(BreathingSpec::default()),
    ]
}

/// Build every entry, in order.
///
/// # Errors
///
/// The first build error, or [`AnimError::EmptyRegistry`] /
/// [`AnimError::DuplicateBehavior`] from the registry checks.
pub fn build_registry(specs: &[BehaviorSpec]) -> Result<BehaviorRegistry, AnimError> {
    let behaviors = specs
        .iter()
        .map(BehaviorSpec::build)
        .collect::<Result<Vec<_>, _>>()?;
    BehaviorRegistry::new(behaviors)
}

/// Assemble the idle scheduler described by `specs` and `config`.
///
/// The entry named by `config.rest`, if any, becomes the interlude and is
/// left out of the random draws.
///
/// # Errors
///
/// [`AnimError::UnknownBehavior`] when `config.rest` names no entry, plus
/// everything [`build_registry`] reports.
pub fn build_idle(specs: &[BehaviorSpec], config: &IdleConfig) -> Result<IdleScheduler, AnimError> {
    let (rest, draws): (Vec<BehaviorSpec>, Vec<BehaviorSpec>) = specs
        .iter()
        .cloned()
        .partition(|s| config.rest.as_deref() == Some(s.name()));

    let interlude = match (&config.rest, rest.first()) {
        (Some(_), Some(spec)) => Some(spec.build()?),
        (Some(name), None) => return Err(AnimError::UnknownBehavior(name.clone())),
        (None, _) => None,
    };

    let picker: Box<dyn KeyPicker> = match config.seed {
        Some(seed) => Box::new(UniformPicker::seeded(seed)),
        None => Box::new(UniformPicker::from_entropy()),
    };
    let scheduler = IdleScheduler::new(build_registry(&draws)?, picker)
        .with_relax_duration(Duration::from_millis(config.relax_ms));
    Ok(match interlude {
        Some(rest) => scheduler.with_interlude(rest),
        None => scheduler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cues::Cue;

    #[test]
    fn specs_parse_from_tagged_json() {
        let specs: Vec<BehaviorSpec> = serde_json::from_str(
            r#"[
                {"kind": "breathing", "name": "asleep", "duration_ms": 500},
                {"kind": "look_around"},
                {"kind": "replay", "name": "wave", "asset": "wave.json", "start_frame": 3,
                 "cues": [{"at_ms": 0, "clip": "sounds/whistling.wav"}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            specs.iter().map(BehaviorSpec::name).collect::<Vec<_>>(),
            vec!["asleep", "look_around", "wave"]
        );
        match &specs[2] {
            BehaviorSpec::Replay(r) => {
                assert_eq!(r.start_frame, 3);
                assert_eq!(r.cues, vec![Cue::new(0, "sounds/whistling.wav")]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let res: Result<BehaviorSpec, _> = serde_json::from_str(r#"{"kind": "juggle"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn default_catalog_builds() {
        let registry = build_registry(&default_catalog()).unwrap();
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec!["look_around", "breathing"]
        );
    }

    #[test]
    fn missing_asset_fails_the_build() {
        let spec = BehaviorSpec::Replay(ReplaySpec {
            name: "ghost".into(),
            asset: "/nonexistent/ghost.json".into(),
            start_frame: 0,
            cues: Vec::new(),
        });
        assert!(matches!(spec.build().err(), Some(AnimError::Asset { .. })));
    }

    #[test]
    fn rest_entry_leaves_the_draws() {
        let config = IdleConfig {
            seed: Some(1),
            rest: Some("breathing".into()),
            relax_ms: 0,
        };
        let idle = build_idle(&default_catalog(), &config).unwrap();
        assert_eq!(idle.registry().keys().collect::<Vec<_>>(), vec!["look_around"]);
    }

    #[test]
    fn unknown_rest_entry_is_an_error() {
        let config = IdleConfig {
            rest: Some("nap".into()),
            ..IdleConfig::default()
        };
        assert_eq!(
            build_idle(&default_catalog(), &config).err(),
            Some(AnimError::UnknownBehavior("nap".into()))
        );
    }

    #[test]
    fn rest_only_catalog_leaves_nothing_to_draw() {
        let config = IdleConfig {
            rest: Some("breathing".into()),
            ..IdleConfig::default()
        };
        let specs = vec![BehaviorSpec::Breathing(BreathingSpec::default())];
        assert!(matches!(
            build_idle(&specs, &config).err(),
            Some(AnimError::EmptyRegistry)
        ));
    }
}
