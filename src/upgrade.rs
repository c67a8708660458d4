//! Self-upgrade from the storage volume.
//!
//! Field units are updated by dropping a replacement binary named after
//! the application onto the SD card. At startup, if that image exists and
//! its SHA-256 differs from the running executable, it is installed over
//! the current binary and the process re-execs into it. Every failure is
//! logged and the daemon continues on the binary it booted with.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use log::{info, warn};
use sha2::{Digest, Sha256};

use crate::app::ports::VolumeMount;

/// Name of the upgrade image on the storage volume root.
pub const UPGRADE_IMAGE_NAME: &str = "camlink";

const HASH_BUF_SIZE: usize = 32 * 1024;

/// Install a pending upgrade image, if any, and re-exec into it.
/// Returns normally whenever no upgrade was applied.
pub fn apply_pending_upgrade(storage_root: &Path, volume: &impl VolumeMount) {
    if let Err(e) = volume.ensure_mounted() {
        warn!("upgrade: storage volume unavailable: {e}");
        return;
    }
    let image = storage_root.join(UPGRADE_IMAGE_NAME);
    match fs::metadata(&image) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        Ok(_) => {
            warn!("upgrade: {} is empty or not a file", image.display());
            return;
        }
        Err(_) => return,
    }

    let current = match std::env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            warn!("upgrade: cannot resolve current executable: {e}");
            return;
        }
    };

    let (old_hash, new_hash) = match (sha256_file(&current), sha256_file(&image)) {
        (Ok(old), Ok(new)) => (old, new),
        (old, new) => {
            if let Err(e) = old.and(new) {
                warn!("upgrade: hashing failed: {e}");
            }
            return;
        }
    };
    if old_hash == new_hash {
        info!("upgrade: image matches running binary, nothing to do");
        return;
    }

    // The SD card and the rootfs are different filesystems, so this is a
    // copy-then-remove rather than a rename.
    if let Err(e) = fs::copy(&image, &current) {
        warn!("upgrade: install to {} failed: {e}", current.display());
        return;
    }
    if let Err(e) = fs::remove_file(&image) {
        warn!("upgrade: could not remove {}: {e}", image.display());
    }
    info!("upgrade: installed new image, restarting");
    let e = restart_process();
    warn!("upgrade: restart failed: {e}");
}

/// Replace the process image with the current executable. Only returns on
/// failure.
pub fn restart_process() -> io::Error {
    use std::os::unix::process::CommandExt;
    match std::env::current_exe() {
        Ok(exe) => std::process::Command::new(exe).exec(),
        Err(e) => e,
    }
}

fn sha256_file(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}
