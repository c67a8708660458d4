//! Camlink — serial control channel of an embedded camera.
//!
//! A peer issues single-line binary commands over a UART; the device
//! answers with framed acknowledgments or chunked file data, while a
//! background daemon keeps the storage volume below a capacity threshold.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Adapters: SerialLink · YamlConfigStore · SystemClock       │
//! │            SdCardVolume · WatchdogDevice · SysfsLed         │
//! │                                                             │
//! │  ─────────────── Port Trait Boundary ──────────────────     │
//! │                                                             │
//! │  ProtocolEngine ──▶ DirectoryIndex ──▶ dated media tree     │
//! │  RetentionDaemon ─────────────────────▶ (same tree)         │
//! │                                                             │
//! │  ShutdownToken · ConfigHandle · OsdSlot (shared state)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exposes every module for integration testing on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod osd;
pub mod proto;
pub mod serial;
pub mod shutdown;
pub mod storage;
pub mod upgrade;
