//! Loading, saving and hot reloading of the service settings file.
//!
//! The current settings are published through a `watch` channel. Consumers borrow the latest
//! snapshot when they need it; a reload replaces the whole value at once so no reader ever sees a
//! partially updated document.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use shared_std::settings::PowerBridgeSettings;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Overrides the settings file location.
pub const CONFIG_ENV_VAR: &str = "POWERBRIDGE_CONFIG";

pub const RELOAD_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the settings file lives: `POWERBRIDGE_CONFIG` if set, otherwise
/// `%ProgramData%\PowerBridge\settings.json` on Windows and `./powerbridge.json` elsewhere.
pub fn settings_path() -> PathBuf {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }

    if cfg!(windows) {
        let base = env::var_os("ProgramData").unwrap_or_else(|| "C:\\ProgramData".into());
        return PathBuf::from(base).join("PowerBridge").join("settings.json");
    }

    PathBuf::from("powerbridge.json")
}

/// Reads the settings file. If it does not exist yet the service is running for the first time, so
/// the defaults are written out and returned.
pub fn load_or_create(path: &Path) -> Result<PowerBridgeSettings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse(path, &contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let settings = PowerBridgeSettings::default();
            save(path, &settings)?;
            info!("No settings found, wrote defaults to {}", path.display());
            Ok(settings)
        }
        Err(source) => Err(SettingsError::Io { path: path.to_path_buf(), source }),
    }
}

pub fn save(path: &Path, settings: &PowerBridgeSettings) -> Result<(), SettingsError> {
    let io_error = |source: io::Error| SettingsError::Io { path: path.to_path_buf(), source };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_error)?;
    }

    let contents =
        serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    fs::write(path, contents).map_err(io_error)
}

/// Resolves a path from the settings document against the directory holding the settings file.
pub fn resolve_relative(settings_path: &Path, configured: &str) -> PathBuf {
    let configured = Path::new(configured);
    if configured.is_absolute() {
        return configured.to_path_buf();
    }

    settings_path
        .parent()
        .map(|dir| dir.join(configured))
        .unwrap_or_else(|| configured.to_path_buf())
}

fn parse(path: &Path, contents: &str) -> Result<PowerBridgeSettings, SettingsError> {
    serde_json::from_str(contents).map_err(|source| SettingsError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Polls the settings file every `interval` and publishes a new snapshot whenever its modification
/// time changes. A file that fails to parse is logged and the previous snapshot stays in place.
pub async fn watch_settings(
    path: PathBuf,
    sender: watch::Sender<PowerBridgeSettings>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut last_modified = modified(&path);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let current = modified(&path);
        if current == last_modified {
            continue;
        }
        last_modified = current;

        let reloaded = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SettingsError::Io { path: path.clone(), source })
            .and_then(|contents| parse(&path, &contents));

        match reloaded {
            Ok(settings) => {
                sender.send_if_modified(|current| {
                    if *current == settings {
                        return false;
                    }
                    *current = settings;
                    true
                });
                info!("Reloaded settings from {}", path.display());
            }
            Err(e) => warn!("Keeping previous settings: {e}"),
        }
    }
}
