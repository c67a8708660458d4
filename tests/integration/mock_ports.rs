//! Mock port adapters for integration tests.
//!
//! Each mock records every call so tests can assert on the full history
//! without a kernel clock, mount table or config file. Handles are `Clone`
//! so a test can keep one half while the engine owns the other.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use camlink::app::ports::{
    Clock, ClockError, ConfigError, ConfigStore, VolumeError, VolumeMount,
};
use camlink::config::RuntimeConfig;
use chrono::{DateTime, Local, TimeZone};

// ── Clock ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockClock {
    now: DateTime<Local>,
    fail_set: bool,
    set_calls: Arc<Mutex<Vec<u32>>>,
}

#[allow(dead_code)]
impl MockClock {
    /// A clock pinned to 2024-05-23 10:15:00 local time.
    pub fn pinned() -> Self {
        Self {
            now: Local.with_ymd_and_hms(2024, 5, 23, 10, 15, 0).unwrap(),
            fail_set: false,
            set_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_set: true,
            ..Self::pinned()
        }
    }

    pub fn set_calls(&self) -> Vec<u32> {
        self.set_calls.lock().unwrap().clone()
    }
}

impl Clock for MockClock {
    fn now_local(&self) -> DateTime<Local> {
        self.now
    }

    fn set_unix_time(&self, secs: u32) -> Result<(), ClockError> {
        if self.fail_set {
            return Err(ClockError::SetRejected);
        }
        self.set_calls.lock().unwrap().push(secs);
        Ok(())
    }
}

// ── Volume ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockVolume {
    fail_mount: Arc<AtomicBool>,
    usage: Arc<Mutex<f64>>,
    mount_calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl MockVolume {
    pub fn with_usage(usage: f64) -> Self {
        Self {
            fail_mount: Arc::new(AtomicBool::new(false)),
            usage: Arc::new(Mutex::new(usage)),
            mount_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn unmountable() -> Self {
        let volume = Self::with_usage(0.0);
        volume.fail_mount.store(true, Ordering::SeqCst);
        volume
    }

    pub fn set_usage(&self, usage: f64) {
        *self.usage.lock().unwrap() = usage;
    }

    pub fn mount_calls(&self) -> u32 {
        self.mount_calls.load(Ordering::SeqCst)
    }
}

impl VolumeMount for MockVolume {
    fn ensure_mounted(&self) -> Result<(), VolumeError> {
        self.mount_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mount.load(Ordering::SeqCst) {
            return Err(VolumeError::MountFailed);
        }
        Ok(())
    }

    fn usage_percent(&self) -> Result<f64, VolumeError> {
        Ok(*self.usage.lock().unwrap())
    }
}

// ── Config store ──────────────────────────────────────────────

#[derive(Clone)]
pub struct MockStore {
    fail_save: bool,
    saved: Arc<Mutex<Vec<RuntimeConfig>>>,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self {
            fail_save: false,
            saved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_save: true,
            ..Self::new()
        }
    }

    pub fn saved(&self) -> Vec<RuntimeConfig> {
        self.saved.lock().unwrap().clone()
    }
}

impl ConfigStore for MockStore {
    fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        Ok(RuntimeConfig::default())
    }

    fn save(&self, config: &RuntimeConfig) -> Result<(), ConfigError> {
        if self.fail_save {
            return Err(ConfigError::Io(std::io::Error::other("mock save failure")));
        }
        self.saved.lock().unwrap().push(config.clone());
        Ok(())
    }
}
