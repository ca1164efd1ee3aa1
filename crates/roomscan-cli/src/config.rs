//! Configuration file – reads/writes `~/.roomscan/config.toml`.
//!
//! ```toml
//! db_path = "/var/lib/roomscan/calibration.db"
//!
//! [calibration]
//! required_coverage = 0.9
//! poll_interval_ms = 50
//! ```
//!
//! Every key is optional; missing keys fall back to
//! [`CalibrationConfig::default`].

use std::fs;
use std::path::{Path, PathBuf};

use roomscan_types::CalibrationConfig;
use serde::{Deserialize, Serialize};

/// Persisted CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// SQLite database holding the calibration record.  Defaults to
    /// `~/.roomscan/calibration.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,

    /// Calibration tunables.
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

/// Return the path to `~/.roomscan/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".roomscan").join("config.toml")
}

/// Return the path to `~/.roomscan/calibration.db`.
pub fn default_db_path() -> PathBuf {
    PathBuf::from(home_dir()).join(".roomscan").join("calibration.db")
}

/// Load `~/.roomscan/config.toml` (defaults when absent) and apply
/// `ROOMSCAN_*` overrides.
pub fn load() -> Result<CliConfig, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<CliConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: CliConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `ROOMSCAN_*` environment variable overrides to `cfg`.
///
/// Unparsable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROOMSCAN_REQUIRED_COVERAGE` | `calibration.required_coverage` |
/// | `ROOMSCAN_SCAN_RESOLUTION` | `calibration.scan_resolution` |
/// | `ROOMSCAN_POLL_INTERVAL_MS` | `calibration.poll_interval_ms` |
/// | `ROOMSCAN_DB_PATH` | `db_path` |
pub fn apply_env_overrides(cfg: &mut CliConfig) {
    if let Ok(v) = std::env::var("ROOMSCAN_REQUIRED_COVERAGE")
        && let Ok(coverage) = v.parse::<f32>()
    {
        cfg.calibration.required_coverage = coverage;
    }
    if let Ok(v) = std::env::var("ROOMSCAN_SCAN_RESOLUTION")
        && let Ok(resolution) = v.parse::<f32>()
    {
        cfg.calibration.scan_resolution = resolution;
    }
    if let Ok(v) = std::env::var("ROOMSCAN_POLL_INTERVAL_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.calibration.poll_interval_ms = ms;
    }
    if let Ok(v) = std::env::var("ROOMSCAN_DB_PATH")
        && !v.is_empty()
    {
        cfg.db_path = Some(v);
    }
}

/// Save the config to `~/.roomscan/config.toml`.
pub fn save(cfg: &CliConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path, creating its directory if necessary.
pub(crate) fn save_to(cfg: &CliConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
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
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

/// Create `dir` (and parents) readable by the owner only on Unix.
pub(crate) fn ensure_private_dir(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| format!("Failed to set permissions on {}: {}", dir.display(), e))?;
    }
    Ok(())
}

/// Make sure the directory holding `db_path` exists.
///
/// The default `~/.roomscan` directory is kept owner-only.  Any other
/// directory is created when missing and otherwise left untouched.
pub fn prepare_db_dir(db_path: &Path) -> Result<(), String> {
    let private = default_db_path().parent().map(Path::to_path_buf);
    prepare_db_dir_with(db_path, private.as_deref())
}

pub(crate) fn prepare_db_dir_with(db_path: &Path, private: Option<&Path>) -> Result<(), String> {
    let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if Some(parent) == private {
        return ensure_private_dir(parent);
    }
    if parent.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(parent)
        .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))
}
