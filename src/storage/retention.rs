//! Storage retention daemon.
//!
//! Keeps volume usage under the configured threshold by deleting the single
//! oldest media file per check cycle — sustained overflow resolves across
//! multiple cycles rather than in one drain loop. Runs until the shutdown
//! token trips; every failure inside a cycle is logged and the loop simply
//! carries on.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use log::{info, warn};

use crate::app::ports::VolumeMount;
use crate::config::ConfigHandle;
use crate::shutdown::ShutdownToken;

use super::{IMAGE_DIR, VIDEO_DIR, is_date_dir_name};

/// One scanned file, collected transiently per cycle.
struct FileRecord {
    path: PathBuf,
    mtime: SystemTime,
    size: u64,
}

/// Threshold-driven eviction sweeper over the dated tree.
pub struct RetentionDaemon<V: VolumeMount> {
    root: PathBuf,
    config: ConfigHandle,
    volume: V,
}

impl<V: VolumeMount + Send + 'static> RetentionDaemon<V> {
    pub fn new(root: impl Into<PathBuf>, config: ConfigHandle, volume: V) -> Self {
        Self {
            root: root.into(),
            config,
            volume,
        }
    }

    /// Spawn the daemon thread. It exits once `token` trips; in-flight
    /// cycles complete first.
    pub fn spawn(self, token: ShutdownToken) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("retention".into())
            .spawn(move || self.run(token))
    }

    fn run(self, token: ShutdownToken) {
        let snapshot = self.config.snapshot();
        info!(
            "retention: started (every {}s, threshold {}%)",
            snapshot.interval, snapshot.threshold
        );
        loop {
            if token.should_stop() {
                break;
            }
            self.run_cycle();
            let interval = self.config.snapshot().interval;
            if token.wait_timeout(Duration::from_secs(interval)) {
                break;
            }
        }
        info!("retention: stopped");
    }

    /// Execute one check cycle. Returns the evicted path, if any.
    pub fn run_cycle(&self) -> Option<PathBuf> {
        if let Err(e) = self.volume.ensure_mounted() {
            warn!("retention: storage volume unavailable: {e}");
            return None;
        }
        let usage = match self.volume.usage_percent() {
            Ok(usage) => usage,
            Err(e) => {
                warn!("retention: usage query failed: {e}");
                return None;
            }
        };
        let threshold = f64::from(self.config.snapshot().threshold);
        if usage <= threshold {
            return None;
        }
        info!("retention: usage {usage:.1}% exceeds threshold {threshold:.0}%");

        let mut files = self.collect_files();
        if files.is_empty() {
            warn!("retention: nothing eligible to delete");
            return None;
        }
        // Ascending by (mtime, path); the path key makes eviction order
        // deterministic for files sharing a modification time.
        files.sort_by(|a, b| (a.mtime, &a.path).cmp(&(b.mtime, &b.path)));
        let oldest = &files[0];

        if let Err(e) = fs::remove_file(&oldest.path) {
            warn!("retention: failed to delete {}: {e}", oldest.path.display());
            return None;
        }
        info!(
            "retention: deleted {} ({} bytes)",
            oldest.path.display(),
            oldest.size
        );
        self.prune_empty_dirs();

        match self.volume.usage_percent() {
            Ok(after) => info!("retention: usage now {after:.1}%"),
            Err(e) => warn!("retention: usage query failed after delete: {e}"),
        }
        Some(oldest.path.clone())
    }

    /// Collect every regular file under `<root>/YYYY-MM-DD/{video,image}/HH`.
    fn collect_files(&self) -> Vec<FileRecord> {
        let mut files = Vec::new();
        let Ok(entries) = fs::read_dir(&self.root) else {
            warn!("retention: cannot open {}", self.root.display());
            return files;
        };
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_date_dir_name(name) {
                continue;
            }
            for kind in [VIDEO_DIR, IMAGE_DIR] {
                collect_hour_buckets(&entry.path().join(kind), &mut files);
            }
        }
        files
    }

    /// Remove hour, type and date directories left empty by an eviction,
    /// deepest first.
    fn prune_empty_dirs(&self) {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_date_dir_name(name) {
                continue;
            }
            let date_dir = entry.path();
            for kind in [VIDEO_DIR, IMAGE_DIR] {
                let type_dir = date_dir.join(kind);
                if let Ok(hours) = fs::read_dir(&type_dir) {
                    for hour in hours.flatten() {
                        if hour.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                            remove_if_empty(&hour.path());
                        }
                    }
                    remove_if_empty(&type_dir);
                }
            }
            remove_if_empty(&date_dir);
        }
    }
}

fn collect_hour_buckets(type_dir: &Path, files: &mut Vec<FileRecord>) {
    let Ok(hours) = fs::read_dir(type_dir) else {
        return;
    };
    for hour in hours.flatten() {
        if !hour.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let Ok(entries) = fs::read_dir(hour.path()) else {
            continue;
        };
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            let Ok(mtime) = meta.modified() else { continue };
            files.push(FileRecord {
                path: entry.path(),
                mtime,
                size: meta.len(),
            });
        }
    }
}

fn remove_if_empty(dir: &Path) {
    let Ok(mut entries) = fs::read_dir(dir) else {
        return;
    };
    if entries.next().is_none() {
        // Racing a concurrent writer is fine; rmdir fails on non-empty.
        let _ = fs::remove_dir(dir);
    }
}
