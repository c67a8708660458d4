//! Hardware watchdog adapter.
//!
//! Wraps `/dev/watchdog`: the orchestrator feeds it once per second, and a
//! stalled process lets the timer fire and reset the device. `stop` writes
//! the magic-close byte so a graceful shutdown does not reboot the board.
//!
//! When the device node is absent (development hosts, disabled kernels) the
//! adapter degrades to a logged no-op.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::{info, warn};

use crate::app::ports::WatchdogPort;

const WATCHDOG_DEVICE: &str = "/dev/watchdog";

pub struct WatchdogDevice {
    device: Option<File>,
}

impl WatchdogDevice {
    /// Open the watchdog device, falling back to a no-op when unavailable.
    pub fn open() -> Self {
        Self::open_path(Path::new(WATCHDOG_DEVICE))
    }

    fn open_path(path: &Path) -> Self {
        match OpenOptions::new().write(true).open(path) {
            Ok(device) => {
                info!("watchdog: armed ({})", path.display());
                Self {
                    device: Some(device),
                }
            }
            Err(e) => {
                warn!("watchdog: {} unavailable ({e}), running without", path.display());
                Self { device: None }
            }
        }
    }
}

impl WatchdogPort for WatchdogDevice {
    fn feed(&self) {
        if let Some(device) = &self.device {
            if let Err(e) = (&*device).write_all(&[0]) {
                warn!("watchdog: feed failed: {e}");
            }
        }
    }

    fn stop(&self) {
        if let Some(device) = &self.device {
            // Magic close: the kernel disarms the timer when 'V' is the
            // last byte written before the descriptor closes.
            if let Err(e) = (&*device).write_all(b"V") {
                warn!("watchdog: magic close failed: {e}");
            } else {
                info!("watchdog: disarmed");
            }
        }
    }
}
