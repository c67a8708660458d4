//! Dated directory tree shared by the protocol engine and the retention
//! daemon.
//!
//! Layout on the storage volume:
//!
//! ```text
//! <root>/YYYY-MM-DD/{video,image}/HH/MM-SS.<ext>
//! ```
//!
//! [`index`] resolves lookups for the protocol engine; [`retention`] sweeps
//! the same tree to keep usage below the configured threshold.

pub mod index;
pub mod retention;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Default mount point of the media volume.
pub const STORAGE_ROOT: &str = "/mnt/mmcblk0p1";

/// Block device backing the media volume.
pub const STORAGE_DEVICE: &str = "/dev/mmcblk0p1";

/// Subtree holding recorded clips.
pub const VIDEO_DIR: &str = "video";

/// Subtree holding still captures; file lookups serve this one.
pub const IMAGE_DIR: &str = "image";

/// Whether a directory name is a dated bucket: exactly `YYYY-MM-DD` shaped,
/// checked by length and dash positions.
pub fn is_date_dir_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 10 && bytes[4] == b'-' && bytes[7] == b'-'
}

/// Path of the image hour bucket for a date.
pub fn image_hour_dir(root: &Path, date: NaiveDate, hour: u8) -> PathBuf {
    root.join(format!("{}", date.format("%Y-%m-%d")))
        .join(IMAGE_DIR)
        .join(format!("{hour:02}"))
}
