//! YAML configuration store.
//!
//! Implements [`ConfigStore`] over `serial.yaml`. Every field is
//! range-checked before persisting; writes are transactional (temp file,
//! fsync, atomic rename) with the previous file kept as `serial.yaml.bak`.
//!
//! A dirty marker is created while the daemon runs and removed on graceful
//! exit. Finding it at startup means the previous run died uncleanly — a
//! crash, a fatal signal — and the backup is restored as the last known
//! good configuration before anything reads the file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigStore};
use crate::config::RuntimeConfig;
use crate::proto::wire;

/// Search order for the configuration file.
const CONFIG_LOCATIONS: [&str; 2] = ["./serial.yaml", "/etc/serial.yaml"];

/// On-disk document: one `serial:` section.
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    serial: RuntimeConfig,
}

/// File-backed configuration store with backup/restore semantics.
#[derive(Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
    backup_path: PathBuf,
    marker_path: PathBuf,
}

impl YamlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "serial.yaml".to_string());
        let backup_path = path.with_file_name(format!("{file_name}.bak"));
        let marker_path = path.with_file_name(format!(".{file_name}.dirty"));
        Self {
            path,
            backup_path,
            marker_path,
        }
    }

    /// First existing well-known location, defaulting to the working
    /// directory.
    pub fn locate() -> PathBuf {
        CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .unwrap_or_else(|| PathBuf::from(CONFIG_LOCATIONS[0]))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Roll back to the backup when the previous run did not shut down
    /// cleanly. Returns whether a restore happened.
    pub fn recover_if_unclean(&self) -> bool {
        if !self.marker_path.exists() {
            return false;
        }
        warn!("config: previous shutdown was not graceful");
        if !self.backup_path.exists() {
            return false;
        }
        match fs::copy(&self.backup_path, &self.path) {
            Ok(_) => {
                info!(
                    "config: restored last known good from {}",
                    self.backup_path.display()
                );
                true
            }
            Err(e) => {
                warn!("config: rollback failed: {e}");
                false
            }
        }
    }

    /// Drop the dirty marker for this run.
    pub fn mark_running(&self) -> io::Result<()> {
        File::create(&self.marker_path).map(|_| ())
    }

    /// Remove the dirty marker; call only on a graceful exit path.
    pub fn mark_clean_shutdown(&self) {
        if let Err(e) = fs::remove_file(&self.marker_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("config: failed to clear dirty marker: {e}");
            }
        }
    }

    fn atomic_write(&self, contents: &str) -> io::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp_path = dir.join(format!(".serial.yaml.tmp-{}", std::process::id()));
        {
            let mut tmp = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            tmp.write_all(contents.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        if let Ok(dir_handle) = File::open(dir) {
            let _ = dir_handle.sync_all();
        }
        Ok(())
    }
}

fn validate(config: &RuntimeConfig) -> Result<(), ConfigError> {
    if config.port.is_empty() {
        return Err(ConfigError::ValidationFailed("port must not be empty"));
    }
    if !wire::is_supported_baud_rate(config.baudrate) {
        return Err(ConfigError::ValidationFailed(
            "baudrate must be 9600, 19200, 38400, 57600 or 115200",
        ));
    }
    if !matches!(config.package_size, 512 | 1024 | 2048) {
        return Err(ConfigError::ValidationFailed(
            "package_size must be 512, 1024 or 2048",
        ));
    }
    if config.threshold == 0 || config.threshold > 100 {
        return Err(ConfigError::ValidationFailed("threshold must be 1–100"));
    }
    if config.interval == 0 || config.interval > 86_400 {
        return Err(ConfigError::ValidationFailed(
            "interval must be 1–86400 seconds",
        ));
    }
    if config.osd_timefmt.is_empty() || config.osd_timefmt.len() > 31 {
        return Err(ConfigError::ValidationFailed(
            "osd_timefmt must be 1–31 characters",
        ));
    }
    let mut items = chrono::format::StrftimeItems::new(&config.osd_timefmt);
    if items.any(|item| matches!(item, chrono::format::Item::Error)) {
        return Err(ConfigError::ValidationFailed(
            "osd_timefmt is not a valid strftime pattern",
        ));
    }
    Ok(())
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ConfigError::NotFound),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let file: ConfigFile =
            serde_yaml::from_str(&raw).map_err(|_| ConfigError::Corrupted)?;
        validate(&file.serial)?;
        Ok(file.serial)
    }

    fn save(&self, config: &RuntimeConfig) -> Result<(), ConfigError> {
        validate(config)?;
        if self.path.exists() {
            fs::copy(&self.path, &self.backup_path)?;
        }
        let doc = ConfigFile {
            serial: config.clone(),
        };
        let yaml = serde_yaml::to_string(&doc).map_err(|_| ConfigError::Corrupted)?;
        self.atomic_write(&yaml)?;
        info!("config: saved to {}", self.path.display());
        Ok(())
    }
}
