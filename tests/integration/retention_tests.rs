//! Retention daemon scenarios: threshold gating, oldest-first eviction,
//! deterministic tie-breaking and bottom-up directory pruning.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camlink::config::{ConfigHandle, RuntimeConfig};
use camlink::storage::retention::RetentionDaemon;

use crate::mock_ports::MockVolume;

fn handle() -> ConfigHandle {
    ConfigHandle::new(RuntimeConfig {
        threshold: 85,
        ..Default::default()
    })
}

fn daemon(root: &Path, volume: MockVolume) -> RetentionDaemon<MockVolume> {
    RetentionDaemon::new(root, handle(), volume)
}

/// Seed `<root>/<date>/<kind>/<hour>/<name>` with an mtime `age_secs` back
/// from a fixed epoch.
fn seed(root: &Path, date: &str, kind: &str, hour: &str, name: &str, age_secs: u64) -> PathBuf {
    let dir = root.join(date).join(kind).join(hour);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"media").unwrap();
    let base = UNIX_EPOCH + Duration::from_secs(1_716_454_500);
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_modified(base - Duration::from_secs(age_secs)).unwrap();
    path
}

#[test]
fn below_threshold_deletes_nothing() {
    let tree = tempfile::tempdir().unwrap();
    let kept = seed(tree.path(), "2024-05-23", "image", "10", "00-00.jpg", 300);
    let daemon = daemon(tree.path(), MockVolume::with_usage(50.0));
    assert_eq!(daemon.run_cycle(), None);
    assert!(kept.exists());
}

#[test]
fn evicts_exactly_the_oldest_file_per_cycle() {
    let tree = tempfile::tempdir().unwrap();
    let root = tree.path();
    let t1 = seed(root, "2024-05-21", "video", "08", "00-00.mp4", 3_000);
    let t2 = seed(root, "2024-05-22", "image", "09", "10-00.jpg", 2_000);
    let t3 = seed(root, "2024-05-23", "image", "10", "20-00.jpg", 1_000);

    let volume = MockVolume::with_usage(92.0);
    let daemon = daemon(root, volume.clone());

    // Cycle 1 removes t1 only, and its now-empty hour/type/date chain.
    assert_eq!(daemon.run_cycle(), Some(t1.clone()));
    assert!(!t1.exists());
    assert!(t2.exists());
    assert!(t3.exists());
    assert!(!root.join("2024-05-21").exists());

    // Usage still above threshold: cycle 2 removes t2.
    assert_eq!(daemon.run_cycle(), Some(t2.clone()));
    assert!(!t2.exists());
    assert!(t3.exists());

    // Once usage drops below threshold the sweep stops.
    volume.set_usage(40.0);
    assert_eq!(daemon.run_cycle(), None);
    assert!(t3.exists());
}

#[test]
fn equal_mtimes_break_ties_by_path() {
    let tree = tempfile::tempdir().unwrap();
    let root = tree.path();
    let a = seed(root, "2024-05-22", "image", "09", "aa.jpg", 2_000);
    let b = seed(root, "2024-05-22", "image", "09", "bb.jpg", 2_000);

    let daemon = daemon(root, MockVolume::with_usage(95.0));
    assert_eq!(daemon.run_cycle(), Some(a.clone()));
    assert!(!a.exists());
    assert!(b.exists());
}

#[test]
fn files_outside_dated_directories_are_never_touched() {
    let tree = tempfile::tempdir().unwrap();
    let root = tree.path();
    // Older than anything else, but in trees the sweeper must ignore.
    let stray = seed(root, "lost+found", "image", "10", "junk.jpg", 9_000);
    let misnamed = seed(root, "2024-5-23", "image", "10", "short.jpg", 8_000);
    let eligible = seed(root, "2024-05-23", "image", "10", "20-00.jpg", 1_000);

    let daemon = daemon(root, MockVolume::with_usage(95.0));
    assert_eq!(daemon.run_cycle(), Some(eligible.clone()));
    assert!(stray.exists());
    assert!(misnamed.exists());
    assert!(!eligible.exists());
}

#[test]
fn scans_both_video_and_image_subtrees() {
    let tree = tempfile::tempdir().unwrap();
    let root = tree.path();
    let video = seed(root, "2024-05-23", "video", "10", "00-00.mp4", 2_000);
    let image = seed(root, "2024-05-23", "image", "10", "00-00.jpg", 1_000);

    let daemon = daemon(root, MockVolume::with_usage(95.0));
    assert_eq!(daemon.run_cycle(), Some(video.clone()));
    assert!(!video.exists());
    assert!(image.exists());
}

#[test]
fn prune_leaves_non_empty_directories_alone() {
    let tree = tempfile::tempdir().unwrap();
    let root = tree.path();
    let oldest = seed(root, "2024-05-23", "image", "10", "00-00.jpg", 2_000);
    let newer = seed(root, "2024-05-23", "image", "10", "30-00.jpg", 1_000);

    let daemon = daemon(root, MockVolume::with_usage(95.0));
    assert_eq!(daemon.run_cycle(), Some(oldest));
    // The hour bucket still holds the newer file, so the chain survives.
    assert!(newer.exists());
    assert!(root.join("2024-05-23/image/10").exists());
}

#[test]
fn mount_failure_skips_the_cycle() {
    let tree = tempfile::tempdir().unwrap();
    let file = seed(tree.path(), "2024-05-23", "image", "10", "00-00.jpg", 2_000);
    let daemon = daemon(tree.path(), MockVolume::unmountable());
    assert_eq!(daemon.run_cycle(), None);
    assert!(file.exists());
}

#[test]
fn empty_tree_above_threshold_deletes_nothing() {
    let tree = tempfile::tempdir().unwrap();
    let daemon = daemon(tree.path(), MockVolume::with_usage(95.0));
    assert_eq!(daemon.run_cycle(), None);
}
