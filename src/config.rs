//! Runtime configuration.
//!
//! Loaded from the `serial:` section of `serial.yaml` at startup and shared
//! between the worker threads through [`ConfigHandle`]. Once a configuration
//! has passed validation every field stays inside its documented range; the
//! protocol engine is the only writer (baud-rate and package-size updates).

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Default strftime pattern prepended to MOSD text.
pub const DEFAULT_OSD_TIMEFMT: &str = "%H:%M";

fn default_osd_timefmt() -> String {
    DEFAULT_OSD_TIMEFMT.to_string()
}

/// The `serial:` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Serial device path, e.g. `/dev/ttyS1`.
    pub port: String,
    /// Line rate; one of 9600, 19200, 38400, 57600, 115200.
    pub baudrate: u32,
    /// Data-frame payload size in bytes (512, 1024 or 2048). Updated at
    /// runtime by the NEXT_FILE size selector.
    pub package_size: u16,
    /// Storage usage percentage above which retention starts evicting.
    pub threshold: u8,
    /// Seconds between retention scan cycles.
    pub interval: u64,
    /// Whether the hardware watchdog is stopped on graceful shutdown.
    pub watchdog: bool,
    /// strftime pattern for the timestamp prefix of OSD text.
    #[serde(default = "default_osd_timefmt")]
    pub osd_timefmt: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyS1".to_string(),
            baudrate: 115_200,
            package_size: 1024,
            threshold: 85,
            interval: 60,
            watchdog: true,
            osd_timefmt: default_osd_timefmt(),
        }
    }
}

/// Snapshot handle shared between threads.
///
/// Readers clone out a consistent `Arc<RuntimeConfig>` and never observe a
/// half-written value; the single writer builds a new snapshot and swaps
/// the pointer. Writes are rare (baud-rate / package-size commands), reads
/// happen on every request and retention cycle.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<RuntimeConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current configuration snapshot.
    pub fn snapshot(&self) -> Arc<RuntimeConfig> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Apply a mutation and publish the new snapshot, returning it.
    pub fn update<F>(&self, mutate: F) -> Arc<RuntimeConfig>
    where
        F: FnOnce(&mut RuntimeConfig),
    {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = (**slot).clone();
        mutate(&mut next);
        *slot = Arc::new(next);
        slot.clone()
    }
}
