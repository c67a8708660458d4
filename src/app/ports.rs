//! Port traits — the boundary between the protocol/retention core and the
//! platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ProtocolEngine / RetentionDaemon
//! ```
//!
//! The engine and daemon consume these via generics, so the core never
//! touches the wall clock, the mount table or the config file directly.
//! Real adapters live in [`crate::adapters`]; tests substitute mocks.

use chrono::{DateTime, Local};

use crate::config::RuntimeConfig;

// ───────────────────────────────────────────────────────────────
// Clock port (wall-clock read and RTC write)
// ───────────────────────────────────────────────────────────────

/// Wall-clock access. `set_unix_time` backs the RTC command; a failure
/// there degrades to a logged warning, never an error frame.
pub trait Clock {
    fn now_local(&self) -> DateTime<Local>;

    /// Set the system clock to the given Unix timestamp (seconds).
    fn set_unix_time(&self, secs: u32) -> Result<(), ClockError>;
}

// ───────────────────────────────────────────────────────────────
// Storage volume port (mount + capacity)
// ───────────────────────────────────────────────────────────────

/// Mount-state and capacity queries for the media volume.
pub trait VolumeMount {
    /// Mount the volume if it is not already available.
    fn ensure_mounted(&self) -> Result<(), VolumeError>;

    /// Used capacity as a percentage of total blocks.
    fn usage_percent(&self) -> Result<f64, VolumeError>;
}

// ───────────────────────────────────────────────────────────────
// Watchdog port
// ───────────────────────────────────────────────────────────────

/// Hardware watchdog control. The orchestrator feeds once per second;
/// `stop` is called at shutdown only when the watchdog is enabled in
/// configuration.
pub trait WatchdogPort {
    fn feed(&self);
    fn stop(&self);
}

// ───────────────────────────────────────────────────────────────
// Configuration store port
// ───────────────────────────────────────────────────────────────

/// Durable configuration persistence.
///
/// Implementations MUST validate before persisting and MUST keep a backup
/// of the previous file so an unclean shutdown can roll back to the last
/// known good configuration on the next start.
pub trait ConfigStore {
    fn load(&self) -> Result<RuntimeConfig, ConfigError>;

    /// Validate and persist, backing up the previous file first.
    fn save(&self, config: &RuntimeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Activity indicator port
// ───────────────────────────────────────────────────────────────

/// Activity indicator, toggled once per received command line.
/// Fire-and-forget; adapters swallow their own errors.
pub trait ActivityLed {
    fn toggle(&mut self);
}

/// No-op indicator for boards without a wired LED and for tests.
pub struct NullLed;

impl ActivityLed for NullLed {
    fn toggle(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`Clock::set_unix_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The kernel rejected the new time (usually missing privilege).
    SetRejected,
}

/// Errors from [`VolumeMount`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeError {
    /// mount(2) failed.
    MountFailed,
    /// Capacity query failed.
    StatFailed,
}

/// Errors from [`ConfigStore`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found.
    NotFound,
    /// The stored file failed to parse.
    Corrupted,
    /// A field failed range validation; the message names the field.
    ValidationFailed(&'static str),
    /// Generic I/O error from the underlying filesystem.
    Io(std::io::Error),
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SetRejected => write!(f, "system clock set rejected"),
        }
    }
}

impl core::fmt::Display for VolumeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MountFailed => write!(f, "mount failed"),
            Self::StatFailed => write!(f, "capacity query failed"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
