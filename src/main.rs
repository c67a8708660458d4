//! Camlink daemon — main entry point.
//!
//! Owns startup (config recovery + load, upgrade check, signal hookup),
//! the two worker threads (serial protocol, storage retention) and the
//! 1 Hz watchdog loop. Shutdown classification: graceful signals set the
//! token and workers are joined; anything that kills the process without
//! reaching the clean-shutdown path leaves the dirty marker behind, and the
//! next start rolls configuration back to the last known good file.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};

use camlink::adapters::system::{SdCardVolume, SysfsLed, SystemClock};
use camlink::adapters::watchdog::WatchdogDevice;
use camlink::adapters::yaml_store::YamlConfigStore;
use camlink::app::ports::{ConfigStore, WatchdogPort};
use camlink::config::ConfigHandle;
use camlink::osd::OsdSlot;
use camlink::proto::engine::ProtocolEngine;
use camlink::serial::{SerialLink, task};
use camlink::shutdown::ShutdownToken;
use camlink::storage::retention::RetentionDaemon;
use camlink::storage::{STORAGE_ROOT, index::DirectoryIndex};
use camlink::upgrade;

/// Cadence of watchdog feeds from the orchestrator loop.
const WATCHDOG_FEED_INTERVAL: Duration = Duration::from_secs(1);

/// Activity LED sysfs node.
const ACTIVITY_LED_DIR: &str = "/sys/class/leds/led0";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("camlink v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration (with crash rollback) ────────────────
    let store = YamlConfigStore::new(YamlConfigStore::locate());
    store.recover_if_unclean();
    let config = store
        .load()
        .with_context(|| format!("cannot load {}", store.path().display()))?;
    info!(
        "config: port={} baudrate={} package_size={} threshold={}% interval={}s watchdog={}",
        config.port,
        config.baudrate,
        config.package_size,
        config.threshold,
        config.interval,
        config.watchdog
    );
    // ── 2. Pending self-upgrade (re-execs when one is installed) ──
    let volume = SdCardVolume::default();
    upgrade::apply_pending_upgrade(std::path::Path::new(STORAGE_ROOT), &volume);

    // From here on an exit without reaching the clean-shutdown path is
    // treated as a crash and rolls configuration back on the next start.
    if let Err(e) = store.mark_running() {
        warn!("config: cannot create dirty marker: {e}");
    }

    // ── 3. Shared state and signals ───────────────────────────
    let token = ShutdownToken::new();
    token
        .install_signal_handlers()
        .context("cannot install signal handlers")?;
    let handle = ConfigHandle::new(config.clone());
    let osd = Arc::new(OsdSlot::new());
    let watchdog = WatchdogDevice::open();

    // ── 4. Serial protocol worker ─────────────────────────────
    let link = SerialLink::open(&config.port, config.baudrate)
        .with_context(|| format!("cannot open serial port {}", config.port))?;
    let engine = ProtocolEngine::new(
        handle.clone(),
        DirectoryIndex::new(STORAGE_ROOT),
        osd.clone(),
        SystemClock,
        volume.clone(),
        store.clone(),
    );
    let serial_worker = task::spawn(link, engine, SysfsLed::new(ACTIVITY_LED_DIR), token.clone())
        .context("cannot spawn serial worker")?;

    // ── 5. Storage retention daemon ───────────────────────────
    let retention = RetentionDaemon::new(STORAGE_ROOT, handle.clone(), volume)
        .spawn(token.clone())
        .context("cannot spawn retention daemon")?;

    // ── 6. Watchdog loop until shutdown ───────────────────────
    info!("camlink: ready");
    loop {
        watchdog.feed();
        if token.wait_timeout(WATCHDOG_FEED_INTERVAL) {
            break;
        }
    }

    // ── 7. Join workers, classify exit ────────────────────────
    if serial_worker.join().is_err() {
        error!("serial worker panicked");
    }
    if retention.join().is_err() {
        error!("retention daemon panicked");
    }
    if handle.snapshot().watchdog {
        watchdog.stop();
    }
    store.mark_clean_shutdown();

    if token.restart_requested() {
        info!("camlink: restarting for reconfiguration");
        let e = upgrade::restart_process();
        return Err(e).context("restart exec failed");
    }
    info!("camlink: bye");
    Ok(())
}
