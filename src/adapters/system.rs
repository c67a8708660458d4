//! Kernel-facing adapters: wall clock, storage volume, activity LED.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr;

use chrono::{DateTime, Local};
use log::{debug, warn};

use crate::app::ports::{ActivityLed, Clock, ClockError, VolumeMount, VolumeError};
use crate::storage::{STORAGE_DEVICE, STORAGE_ROOT};

// ───────────────────────────────────────────────────────────────
// System clock
// ───────────────────────────────────────────────────────────────

/// Clock adapter over the kernel wall clock.
#[derive(Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }

    fn set_unix_time(&self, secs: u32) -> Result<(), ClockError> {
        let tv = libc::timeval {
            tv_sec: secs as libc::time_t,
            tv_usec: 0,
        };
        // SAFETY: tv is a valid, initialised timeval; a null timezone is
        // the documented way to leave the kernel tz untouched.
        let rc = unsafe { libc::settimeofday(&tv, ptr::null()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(ClockError::SetRejected)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// SD card volume
// ───────────────────────────────────────────────────────────────

/// Mount and capacity adapter for the media volume.
#[derive(Clone)]
pub struct SdCardVolume {
    device: String,
    mount_point: PathBuf,
    fs_type: String,
}

impl Default for SdCardVolume {
    fn default() -> Self {
        Self::new(STORAGE_DEVICE, STORAGE_ROOT, "vfat")
    }
}

impl SdCardVolume {
    pub fn new(
        device: impl Into<String>,
        mount_point: impl Into<PathBuf>,
        fs_type: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            mount_point: mount_point.into(),
            fs_type: fs_type.into(),
        }
    }
}

impl VolumeMount for SdCardVolume {
    fn ensure_mounted(&self) -> Result<(), VolumeError> {
        if self.mount_point.exists() {
            debug!("volume: {} already available", self.mount_point.display());
            return Ok(());
        }
        let src = CString::new(self.device.as_str()).map_err(|_| VolumeError::MountFailed)?;
        let target = CString::new(self.mount_point.as_os_str().as_encoded_bytes())
            .map_err(|_| VolumeError::MountFailed)?;
        let fstype = CString::new(self.fs_type.as_str()).map_err(|_| VolumeError::MountFailed)?;
        // SAFETY: all three strings are valid NUL-terminated C strings and
        // outlive the call; no mount data is passed.
        let rc = unsafe {
            libc::mount(
                src.as_ptr(),
                target.as_ptr(),
                fstype.as_ptr(),
                0,
                ptr::null(),
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            warn!(
                "volume: mount {} on {} failed: {}",
                self.device,
                self.mount_point.display(),
                std::io::Error::last_os_error()
            );
            Err(VolumeError::MountFailed)
        }
    }

    fn usage_percent(&self) -> Result<f64, VolumeError> {
        let target = CString::new(self.mount_point.as_os_str().as_encoded_bytes())
            .map_err(|_| VolumeError::StatFailed)?;
        // SAFETY: target is a valid C string and stats is a plain-old-data
        // out parameter the kernel fills in.
        let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(target.as_ptr(), &mut stats) };
        if rc != 0 {
            return Err(VolumeError::StatFailed);
        }
        if stats.f_blocks == 0 {
            return Err(VolumeError::StatFailed);
        }
        let total = stats.f_blocks as f64;
        let used = total - stats.f_bfree as f64;
        Ok(used / total * 100.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Activity LED
// ───────────────────────────────────────────────────────────────

/// Sysfs LED adapter; toggled once per received command line.
pub struct SysfsLed {
    brightness: PathBuf,
    lit: bool,
}

impl SysfsLed {
    pub fn new(led_dir: impl AsRef<Path>) -> Self {
        Self {
            brightness: led_dir.as_ref().join("brightness"),
            lit: false,
        }
    }
}

impl ActivityLed for SysfsLed {
    fn toggle(&mut self) {
        self.lit = !self.lit;
        let value = if self.lit { "1" } else { "0" };
        if let Err(e) = std::fs::write(&self.brightness, value) {
            debug!("led: write to {} failed: {e}", self.brightness.display());
        }
    }
}
