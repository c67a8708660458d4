//! Protocol engine — decodes one command line, executes it, emits one reply.
//!
//! **Transport-decoupled**: the engine does not own the serial port. The
//! serial task feeds it complete lines and writes whatever [`Reply`] comes
//! back. Strictly request/response — one line in flight, one frame (or
//! silence) out.
//!
//! Failure discipline: malformed or undersized lines, unknown files and
//! internal I/O errors are never reported to the peer. The reply is simply
//! withheld and the peer's timeout is its only error signal.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::app::ports::{Clock, ConfigStore, VolumeMount};
use crate::config::ConfigHandle;
use crate::osd::OsdSlot;
use crate::storage::index::DirectoryIndex;

use super::frame::{AckFrame, CommandFrame, DataFrame};
use super::wire::{self, Opcode, SizeClass};

/// Exact total line lengths (CRLF included) required per opcode. A line of
/// any other length is dropped without side effects.
const LEN_LIST_FILE: usize = 11;
const LEN_NEXT_FILE: usize = 12;
const LEN_FETCH_CHUNK: usize = 9;
const LEN_BAUD_RATE: usize = 7;
const MIN_LEN_MOSD: usize = 8;
const LEN_RTC: usize = 10;
const LEN_STATUS: usize = 6;

/// What the serial task must put on the wire for one processed line.
#[derive(Debug)]
pub enum Reply {
    /// Length class 0 — write nothing.
    Silent,
    /// A 4/5/7-byte acknowledgment, written in one burst.
    Ack(AckFrame),
    /// A data frame, written byte-at-a-time through the paced writer.
    Data(DataFrame),
}

/// A decoded command. GET_SPEC_PACKAGE and SEND_SPEC_DATA_PACKAGE are two
/// wire constructors of the same `FetchChunk` operation; receiving either
/// one both updates the bookkeeping and sends the data frame.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    ListFiles {
        year: u8,
        month: u8,
        day: u8,
        hour: u8,
    },
    NextFile {
        year: u8,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        size_selector: u8,
    },
    FetchChunk {
        hour: u8,
        minute: u8,
        index: u8,
    },
    SetBaudRate {
        code: u8,
    },
    Osd {
        position: u8,
        text: &'a [u8],
    },
    SetClock {
        unix: u32,
    },
    Status,
    Unknown,
}

impl<'a> Command<'a> {
    /// Decode a parsed frame, enforcing the per-opcode length contract.
    /// `None` means drop the line silently.
    fn decode(frame: &CommandFrame<'a>) -> Option<Self> {
        let content = frame.content;
        let len = frame.line_len;
        match Opcode::from_byte(frame.opcode) {
            Some(Opcode::ListFile) => (len == LEN_LIST_FILE).then(|| Self::ListFiles {
                year: content[0],
                month: content[1],
                day: content[2],
                hour: content[3],
            }),
            Some(Opcode::NextFile) => (len == LEN_NEXT_FILE).then(|| Self::NextFile {
                year: content[0],
                month: content[1],
                day: content[2],
                hour: content[3],
                minute: content[4],
                size_selector: content[5],
            }),
            Some(Opcode::GetSpecPackage | Opcode::SendSpecDataPackage) => {
                (len == LEN_FETCH_CHUNK).then(|| Self::FetchChunk {
                    hour: content[0],
                    minute: content[1],
                    index: content[2],
                })
            }
            Some(Opcode::BaudRate) => {
                (len == LEN_BAUD_RATE).then(|| Self::SetBaudRate { code: content[0] })
            }
            Some(Opcode::Mosd) => (len >= MIN_LEN_MOSD).then(|| {
                // The declared length byte is clamped to the bytes actually
                // present on the line.
                let declared = content[1] as usize;
                let avail = content.len().saturating_sub(2);
                Self::Osd {
                    position: content[0],
                    text: &content[2..2 + declared.min(avail)],
                }
            }),
            Some(Opcode::Rtc) => (len == LEN_RTC).then(|| Self::SetClock {
                unix: u32::from_be_bytes([content[0], content[1], content[2], content[3]]),
            }),
            Some(Opcode::Status) => (len == LEN_STATUS).then_some(Self::Status),
            Some(Opcode::None) | None => Some(Self::Unknown),
        }
    }
}

/// The command/acknowledgment protocol engine.
pub struct ProtocolEngine<C, V, S>
where
    C: Clock,
    V: VolumeMount,
    S: ConfigStore,
{
    config: ConfigHandle,
    index: DirectoryIndex,
    osd: Arc<OsdSlot>,
    clock: C,
    volume: V,
    store: S,
    /// File resolved by the last successful NEXT_FILE; chunk fetches read
    /// from it until the next lookup replaces it.
    located: Option<PathBuf>,
    restart_pending: bool,
}

impl<C, V, S> ProtocolEngine<C, V, S>
where
    C: Clock,
    V: VolumeMount,
    S: ConfigStore,
{
    pub fn new(
        config: ConfigHandle,
        index: DirectoryIndex,
        osd: Arc<OsdSlot>,
        clock: C,
        volume: V,
        store: S,
    ) -> Self {
        Self {
            config,
            index,
            osd,
            clock,
            volume,
            store,
            located: None,
            restart_pending: false,
        }
    }

    /// Process one received line and produce the single reply for it.
    pub fn handle_line(&mut self, line: &[u8]) -> Reply {
        let Some(frame) = CommandFrame::parse(line) else {
            debug!("engine: dropping {}-byte runt line", line.len());
            return Reply::Silent;
        };
        let Some(command) = Command::decode(&frame) else {
            debug!(
                "engine: opcode {:#04X} with bad length {} dropped",
                frame.opcode, frame.line_len
            );
            return Reply::Silent;
        };

        let camera_id = frame.camera_id;
        match command {
            Command::ListFiles {
                year,
                month,
                day,
                hour,
            } => self.list_files(frame.opcode, camera_id, year, month, day, hour),
            Command::NextFile {
                year,
                month,
                day,
                hour,
                minute,
                size_selector,
            } => self.next_file(frame.opcode, camera_id, year, month, day, hour, minute, size_selector),
            Command::FetchChunk {
                hour,
                minute,
                index,
            } => self.fetch_chunk(camera_id, hour, minute, index),
            Command::SetBaudRate { code } => self.set_baud_rate(frame.opcode, camera_id, code),
            Command::Osd { position, text } => self.update_osd(frame.opcode, camera_id, position, text),
            Command::SetClock { unix } => self.set_clock(frame.opcode, camera_id, unix),
            Command::Status => self.report_status(frame.opcode, camera_id),
            Command::Unknown => {
                debug!("engine: unknown opcode {:#04X}", frame.opcode);
                Reply::Ack(AckFrame::bare(Opcode::None.as_byte(), camera_id))
            }
        }
    }

    /// Whether the last processed command scheduled a process restart.
    /// Reading clears the flag; the caller must act exactly once.
    pub fn take_restart_request(&mut self) -> bool {
        std::mem::take(&mut self.restart_pending)
    }

    // ── Command handlers ──────────────────────────────────────

    fn list_files(&self, opcode: u8, camera_id: u8, year: u8, month: u8, day: u8, hour: u8) -> Reply {
        let count = request_date(year, month, day)
            .map(|date| self.index.count_files(date, hour))
            .unwrap_or(0);
        debug!("engine: LIST_FILE 20{year:02}-{month:02}-{day:02} {hour:02}h -> {count} files");
        Reply::Ack(AckFrame::with_optional(
            opcode,
            camera_id,
            count.min(255) as u8,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn next_file(
        &mut self,
        opcode: u8,
        camera_id: u8,
        year: u8,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        size_selector: u8,
    ) -> Reply {
        let Some(target) =
            request_date(year, month, day).and_then(|d| d.and_hms_opt(hour.into(), minute.into(), 0))
        else {
            debug!("engine: NEXT_FILE with invalid timestamp dropped");
            return Reply::Silent;
        };
        let Some(path) = self.index.find_nearest(target) else {
            debug!("engine: NEXT_FILE found nothing at or after {target}");
            return Reply::Silent;
        };

        let size = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("engine: cannot stat {}: {e}", path.display());
                return Reply::Silent;
            }
        };

        // The reply carries the found file's actual capture time, not the
        // requested one.
        let (found_hour, found_minute) =
            DirectoryIndex::time_from_path(&path).unwrap_or((hour, minute));

        let package_size = SizeClass::from_selector(size_selector).bytes();
        self.config.update(|c| c.package_size = package_size as u16);

        let chunks = size.div_ceil(package_size as u64).min(255) as u8;
        info!(
            "engine: located {} ({size} bytes, {chunks} x {package_size}B packages)",
            path.display()
        );
        self.located = Some(path);
        Reply::Ack(AckFrame::with_time(
            opcode,
            camera_id,
            found_hour,
            found_minute,
            chunks,
        ))
    }

    fn fetch_chunk(&mut self, camera_id: u8, hour: u8, minute: u8, index: u8) -> Reply {
        let Some(path) = self.located.clone() else {
            debug!("engine: chunk request with no located file dropped");
            return Reply::Silent;
        };
        if index == 0 {
            debug!("engine: chunk index 0 dropped (packages are 1-based)");
            return Reply::Silent;
        }
        let package_size = usize::from(self.config.snapshot().package_size);
        let offset = u64::from(index - 1) * package_size as u64;

        match DirectoryIndex::read_chunk(&path, package_size, offset) {
            Ok(Some(mut payload)) => {
                payload.resize(package_size, 0);
                debug!(
                    "engine: sending package {index} of {} ({package_size}B)",
                    path.display()
                );
                Reply::Data(DataFrame {
                    camera_id,
                    chunk_id: [hour, minute, index],
                    size_class: SizeClass::from_package_size(package_size),
                    payload,
                })
            }
            Ok(None) => {
                debug!("engine: package {index} lies beyond EOF, dropped");
                Reply::Silent
            }
            Err(e) => {
                warn!("engine: chunk read from {} failed: {e}", path.display());
                Reply::Silent
            }
        }
    }

    fn set_baud_rate(&mut self, opcode: u8, camera_id: u8, code: u8) -> Reply {
        let Some(rate) = wire::baud_rate_from_code(code) else {
            debug!("engine: unrecognised baud code {code:#04X} dropped");
            return Reply::Silent;
        };
        let current = self.config.snapshot().baudrate;
        if rate != current {
            // The open port cannot be re-speeded in place; persist the new
            // rate and let the orchestrator re-exec after the ack goes out.
            let updated = self.config.update(|c| c.baudrate = rate);
            match self.store.save(&updated) {
                Ok(()) => {
                    info!("engine: baud rate {current} -> {rate}, restart scheduled");
                    self.restart_pending = true;
                }
                Err(e) => {
                    warn!("engine: baud rate persist failed ({e}); restart suppressed");
                }
            }
        }
        Reply::Ack(AckFrame::bare(opcode, camera_id))
    }

    fn update_osd(&self, opcode: u8, camera_id: u8, position: u8, text: &[u8]) -> Reply {
        let timefmt = self.config.snapshot().osd_timefmt.clone();
        let stamp = self.clock.now_local().format(&timefmt).to_string();
        let text = String::from_utf8_lossy(text);
        debug!("engine: MOSD position {position:#04X} text {text:?}");
        self.osd.publish(format!("{stamp} {text}"));
        Reply::Ack(AckFrame::bare(opcode, camera_id))
    }

    fn set_clock(&self, opcode: u8, camera_id: u8, unix: u32) -> Reply {
        match self.clock.set_unix_time(unix) {
            Ok(()) => info!("engine: system time set to {unix}"),
            // Degrades to a warning; the ack is still sent.
            Err(e) => warn!("engine: failed to set system time: {e}"),
        }
        Reply::Ack(AckFrame::bare(opcode, camera_id))
    }

    fn report_status(&self, opcode: u8, camera_id: u8) -> Reply {
        let status = match self.volume.ensure_mounted() {
            Ok(()) => 0,
            Err(e) => {
                warn!("engine: storage mount failed: {e}");
                1
            }
        };
        Reply::Ack(AckFrame::with_optional(opcode, camera_id, status))
    }
}

/// Command dates are offsets from 2000.
fn request_date(year: u8, month: u8, day: u8) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2000 + i32::from(year), u32::from(month), u32::from(day))
}
