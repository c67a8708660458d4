//! Unified error types for the camlink daemon.
//!
//! One crate-level `Error` enum that every subsystem converts into, keeping
//! the worker loops' error handling uniform. Protocol failures never reach
//! this type — malformed frames and missing files are answered with silence
//! on the wire and at most a log line here.

use core::fmt;

use crate::app::ports::{ClockError, ConfigError, VolumeError};

/// Every fallible operation in the daemon funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// The serial device could not be opened or configured.
    Serial(serialport::Error),
    /// Filesystem or device I/O failed.
    Io(std::io::Error),
    /// Configuration could not be loaded, validated or persisted.
    Config(ConfigError),
    /// The storage volume could not be mounted or queried.
    Volume(VolumeError),
    /// The system clock could not be set.
    Clock(ClockError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(e) => write!(f, "serial: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Volume(e) => write!(f, "volume: {e}"),
            Self::Clock(e) => write!(f, "clock: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serialport::Error> for Error {
    fn from(e: serialport::Error) -> Self {
        Self::Serial(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<VolumeError> for Error {
    fn from(e: VolumeError) -> Self {
        Self::Volume(e)
    }
}

impl From<ClockError> for Error {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

/// Daemon-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
