//! Directory index over the dated media tree.
//!
//! Resolves the protocol engine's lookups: nearest file at or after a
//! timestamp, file counts per hour bucket, and offset chunk reads. All
//! methods degrade to "not found" on filesystem errors — the engine answers
//! those with silence.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use log::warn;

use super::image_hour_dir;

/// Read-only view over the dated tree rooted at the storage mount point.
pub struct DirectoryIndex {
    root: PathBuf,
}

impl DirectoryIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Count regular files in the image bucket for `date`/`hour`.
    /// A missing or unreadable bucket counts as empty.
    pub fn count_files(&self, date: NaiveDate, hour: u8) -> usize {
        let dir = image_hour_dir(&self.root, date, hour);
        let Ok(entries) = fs::read_dir(&dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .count()
    }

    /// Locate the file with the earliest modification time at or after
    /// `target`, scanning only the requested hour's bucket. Equal mtimes
    /// are broken by path so repeated lookups are deterministic.
    pub fn find_nearest(&self, target: NaiveDateTime) -> Option<PathBuf> {
        let target_sys: SystemTime = Local
            .from_local_datetime(&target)
            .earliest()
            .map(SystemTime::from)?;
        let dir = image_hour_dir(&self.root, target.date(), target.hour() as u8);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("index: cannot open {}: {e}", dir.display());
                return None;
            }
        };

        let mut best: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if mtime < target_sys {
                continue;
            }
            let path = entry.path();
            let better = match &best {
                None => true,
                Some((t, p)) => mtime < *t || (mtime == *t && path < *p),
            };
            if better {
                best = Some((mtime, path));
            }
        }
        best.map(|(_, path)| path)
    }

    /// Re-derive the hour and minute a file was captured at from its path:
    /// the hour bucket directory name and the `MM-SS` file stem. The
    /// request's values must not be trusted here — the located file may sit
    /// minutes after the requested time.
    pub fn time_from_path(path: &Path) -> Option<(u8, u8)> {
        let hour: u8 = path
            .parent()?
            .file_name()?
            .to_str()?
            .parse()
            .ok()?;
        let stem = path.file_stem()?.to_str()?;
        let minute: u8 = stem.split('-').next()?.parse().ok()?;
        (hour < 24 && minute < 60).then_some((hour, minute))
    }

    /// Read up to `size` bytes of `path` at `offset`.
    ///
    /// Returns `Ok(None)` when the offset lies at or beyond the end of the
    /// file — the caller drops the request. A read that ends early at EOF
    /// returns the short buffer; the caller zero-pads.
    pub fn read_chunk(path: &Path, size: usize, offset: u64) -> io::Result<Option<Vec<u8>>> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if offset >= len {
            return Ok(None);
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            match file.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}
