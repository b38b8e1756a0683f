//! Configuration vault – reads/writes `~/.animatron/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use animatron_hal::DutyCycle;
use animatron_runtime::{
    ArbiterConfig, BehaviorSpec, IdleConfig, LogFormat, TrackingConfig, default_catalog,
};
use animatron_types::AnimError;
use serde::{Deserialize, Serialize};

/// `[simulation]` section: the stand-in detector used without a camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub detection: DutyCycle,
}

/// Persisted configuration stored in `~/.animatron/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Console log encoding.
    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub arbiter: ArbiterConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub idle: IdleConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Behavior catalog, in registration order.
    #[serde(default = "default_catalog")]
    pub behaviors: Vec<BehaviorSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            arbiter: ArbiterConfig::default(),
            tracking: TrackingConfig::default(),
            idle: IdleConfig::default(),
            simulation: SimulationConfig::default(),
            behaviors: default_catalog(),
        }
    }
}

/// Return the path to `~/.animatron/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".animatron").join("config.toml")
}

/// Load the config from `path` and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, AnimError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        AnimError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| AnimError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ANIMATRON_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ANIMATRON_POLL_MS` | `arbiter.poll_ms` |
/// | `ANIMATRON_CONTROL_HZ` | `tracking.period_ms` (converted) |
/// | `ANIMATRON_SEED` | `idle.seed` |
/// | `ANIMATRON_LOG_FORMAT` | `log_format` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ANIMATRON_POLL_MS")
        && let Ok(ms) = v.parse::<u64>()
        && ms > 0
    {
        cfg.arbiter.poll_ms = ms;
    }
    if let Ok(v) = std::env::var("ANIMATRON_CONTROL_HZ")
        && let Ok(hz) = v.parse::<f64>()
        && hz.is_finite()
        && hz > 0.0
    {
        cfg.tracking.period_ms = ((1_000.0 / hz).round() as u64).max(1);
    }
    if let Ok(v) = std::env::var("ANIMATRON_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.idle.seed = Some(seed);
    }
    if let Ok(v) = std::env::var("ANIMATRON_LOG_FORMAT")
        && let Ok(format) = v.parse::<LogFormat>()
    {
        cfg.log_format = format;
    }
}

/// Save the config to `path`, creating its directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), AnimError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AnimError::Config(format!("failed to create config directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                AnimError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| AnimError::Config(format!("failed to serialize config: {e}")))?;
    let write_err =
        |e: std::io::Error| AnimError::Config(format!("failed to write {}: {e}", path.display()));
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(dir: &tempfile::TempDir) -> PathBuf {
        config_path_for_home(&dir.path().to_string_lossy())
    }

    #[test]
    fn config_path_points_to_animatron_dir() {
        let p = config_path_for_home("/home/operator");
        assert!(p.to_string_lossy().contains(".animatron"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        assert!(load_from(&temp_path(&dir)).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = temp_path(&dir);
        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.behaviors, default_catalog());
        assert_eq!(loaded.arbiter.gaze_x, 0.5);
        assert_eq!(loaded.arbiter.gains, ArbiterConfig::default().gains);
        assert_eq!(loaded.simulation.detection, DutyCycle::default());
        assert_eq!(loaded.idle.relax_ms, 1_000);
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = temp_path(&dir);
        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [arbiter]
            gaze_x = 0.8

            [arbiter.gains]
            kpy = 0.0001

            [simulation.detection]
            visible_ms = 500

            [[behaviors]]
            kind = "breathing"
            name = "asleep"
            duration_ms = 4000
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.arbiter.gaze_x, 0.8);
        assert_eq!(cfg.arbiter.poll_ms, 10);
        assert_eq!(cfg.arbiter.gains.kpy, 0.0001);
        assert_eq!(cfg.arbiter.gains.kpz, 0.00005);
        assert_eq!(cfg.simulation.detection.visible_ms, 500);
        assert_eq!(cfg.simulation.detection.hidden_ms, 20_000);
        assert_eq!(cfg.behaviors.len(), 1);
        assert_eq!(cfg.behaviors[0].name(), "asleep");
        assert_eq!(cfg.tracking, TrackingConfig::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = temp_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[[behaviors]]\nkind = \"juggle\"\n").unwrap();
        assert!(matches!(load_from(&path), Err(AnimError::Config(_))));
    }

    #[test]
    fn apply_env_overrides_changes_poll_interval() {
        // SAFETY: single-threaded test; no other test touches this variable.
        unsafe { std::env::set_var("ANIMATRON_POLL_MS", "25") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.arbiter.poll_ms, 25);
        unsafe { std::env::remove_var("ANIMATRON_POLL_MS") };
    }

    #[test]
    fn apply_env_overrides_converts_control_rate() {
        // SAFETY: single-threaded test; no other test touches this variable.
        unsafe { std::env::set_var("ANIMATRON_CONTROL_HZ", "50") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tracking.period_ms, 20);
        unsafe { std::env::set_var("ANIMATRON_CONTROL_HZ", "-3") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tracking.period_ms, 20);
        unsafe { std::env::remove_var("ANIMATRON_CONTROL_HZ") };
    }

    #[test]
    fn apply_env_overrides_sets_seed() {
        // SAFETY: single-threaded test; no other test touches this variable.
        unsafe { std::env::set_var("ANIMATRON_SEED", "42") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.idle.seed, Some(42));
        unsafe { std::env::remove_var("ANIMATRON_SEED") };
    }

    #[test]
    fn apply_env_overrides_ignores_unknown_log_format() {
        // SAFETY: single-threaded test; no other test touches this variable.
        unsafe { std::env::set_var("ANIMATRON_LOG_FORMAT", "fancy") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.log_format, LogFormat::Compact);
        unsafe { std::env::set_var("ANIMATRON_LOG_FORMAT", "json") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.log_format, LogFormat::Json);
        unsafe { std::env::remove_var("ANIMATRON_LOG_FORMAT") };
    }
}
