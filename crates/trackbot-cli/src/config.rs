//! Configuration file – reads/writes `~/.trackbot/config.toml`.
//!
//! ```toml
//! [control.tracking]
//! dead_zone = 0.15
//! max_step = 8.0
//!
//! [control.avoidance]
//! near_cm = 20.0
//! far_cm = 40.0
//!
//! [camera]
//! width = 640
//! height = 480
//! fps = 30
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use trackbot_types::ControlConfig;

/// Camera capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Persisted configuration stored in `~/.trackbot/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub control: ControlConfig,
    pub camera: CameraConfig,
}

/// Return the path to `~/.trackbot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".trackbot").join("config.toml")
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `TRACKBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TRACKBOT_TICK_MS` | `control.timing.tick_period_ms` |
/// | `TRACKBOT_DEAD_ZONE` | `control.tracking.dead_zone` |
/// | `TRACKBOT_MAX_STEP` | `control.tracking.max_step` |
/// | `TRACKBOT_NEAR_CM` | `control.avoidance.near_cm` |
/// | `TRACKBOT_FAR_CM` | `control.avoidance.far_cm` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("TRACKBOT_TICK_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.control.timing.tick_period_ms = ms;
    }
    if let Ok(v) = std::env::var("TRACKBOT_DEAD_ZONE")
        && let Ok(dz) = v.parse::<f32>()
    {
        cfg.control.tracking.dead_zone = dz;
    }
    if let Ok(v) = std::env::var("TRACKBOT_MAX_STEP")
        && let Ok(step) = v.parse::<f32>()
    {
        cfg.control.tracking.max_step = step;
    }
    if let Ok(v) = std::env::var("TRACKBOT_NEAR_CM")
        && let Ok(cm) = v.parse::<f32>()
    {
        cfg.control.avoidance.near_cm = cm;
    }
    if let Ok(v) = std::env::var("TRACKBOT_FAR_CM")
        && let Ok(cm) = v.parse::<f32>()
    {
        cfg.control.avoidance.far_cm = cm;
    }
}

/// Save the config to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

/// Serialises tests that read or write `TRACKBOT_*` variables.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

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
    fn roundtrip_default_config() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.camera, CameraConfig::default());
        assert_eq!(loaded.control.tracking.max_step, 8.0);
        assert_eq!(loaded.control.drive.speed_levels.len(), 12);
        assert!(loaded.control.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[camera]\nfps = 15\n\n[control.tracking.tilt]\ncenter = 40.0\nmin = 0.0\nmax = 90.0\n").unwrap();

        let loaded = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.camera.fps, 15);
        assert_eq!(loaded.camera.width, 640);
        assert_eq!(loaded.control.tracking.tilt.max, 90.0);
        assert_eq!(loaded.control.tracking.pan.center, 90.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[camera\nfps = ").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"));
    }

    #[test]
    fn config_path_points_to_trackbot_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".trackbot"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn apply_env_overrides_changes_tick_period() {
        let _env = env_lock();
        // SAFETY: env_lock() serialises every test that touches TRACKBOT_* variables.
        unsafe { std::env::set_var("TRACKBOT_TICK_MS", "50") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.control.timing.tick_period_ms, 50);
        unsafe { std::env::remove_var("TRACKBOT_TICK_MS") };
    }

    #[test]
    fn apply_env_overrides_changes_dead_zone() {
        let _env = env_lock();
        // SAFETY: env_lock() serialises every test that touches TRACKBOT_* variables.
        unsafe { std::env::set_var("TRACKBOT_DEAD_ZONE", "0.25") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.control.tracking.dead_zone, 0.25);
        unsafe { std::env::remove_var("TRACKBOT_DEAD_ZONE") };
    }

    #[test]
    fn apply_env_overrides_changes_thresholds() {
        let _env = env_lock();
        // SAFETY: env_lock() serialises every test that touches TRACKBOT_* variables.
        unsafe {
            std::env::set_var("TRACKBOT_NEAR_CM", "15");
            std::env::set_var("TRACKBOT_FAR_CM", "60");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.control.avoidance.near_cm, 15.0);
        assert_eq!(cfg.control.avoidance.far_cm, 60.0);
        unsafe {
            std::env::remove_var("TRACKBOT_NEAR_CM");
            std::env::remove_var("TRACKBOT_FAR_CM");
        }
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_step() {
        let _env = env_lock();
        // SAFETY: env_lock() serialises every test that touches TRACKBOT_* variables.
        unsafe { std::env::set_var("TRACKBOT_MAX_STEP", "fast") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.control.tracking.max_step, 8.0);
        unsafe { std::env::remove_var("TRACKBOT_MAX_STEP") };
    }
}
