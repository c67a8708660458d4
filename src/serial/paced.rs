//! Rate-limited frame writer.
//!
//! The peer's UART has no flow control and a slow receiver, so data frames
//! go out one byte at a time with a fixed gap between bytes. The gap is a
//! parameter of the writer rather than inlined control flow, so tests (and
//! future tuning) can change it without touching the transmit path.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

/// Default inter-byte gap the deployed receivers are known to keep up with.
pub const DEFAULT_INTER_BYTE_GAP: Duration = Duration::from_micros(100);

/// Writes frames byte-at-a-time with a fixed inter-byte delay.
#[derive(Debug, Clone, Copy)]
pub struct PacedWriter {
    gap: Duration,
}

impl Default for PacedWriter {
    fn default() -> Self {
        Self::new(DEFAULT_INTER_BYTE_GAP)
    }
}

impl PacedWriter {
    pub fn new(gap: Duration) -> Self {
        Self { gap }
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    /// Write every byte of `frame` to `out`, pausing after each one.
    pub fn write_frame<W: Write>(&self, out: &mut W, frame: &[u8]) -> io::Result<()> {
        for byte in frame {
            out.write_all(std::slice::from_ref(byte))?;
            if !self.gap.is_zero() {
                thread::sleep(self.gap);
            }
        }
        out.flush()
    }
}
