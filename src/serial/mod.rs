//! Serial transport: raw 8N1 device access and CRLF line assembly.
//!
//! [`SerialLink`] owns the device; the [`LineIo`] trait is what the worker
//! task actually programs against, so tests can drive the task with an
//! in-memory transport.

pub mod paced;
pub mod task;

use std::io::{self, Read, Write};
use std::time::Duration;

use log::warn;
use serialport::SerialPort;

use crate::proto::wire::MAX_LINE;

use paced::PacedWriter;

/// One received command line, terminator included.
pub type Line = heapless::Vec<u8, MAX_LINE>;

/// Read timeout per byte; bounds how long the worker goes between shutdown
/// checks while the link is idle.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Byte-oriented line transport consumed by the worker task.
pub trait LineIo {
    /// Poll for the next complete line. `Ok(None)` means no line arrived
    /// within the read timeout — the caller re-checks shutdown and polls
    /// again.
    fn read_line(&mut self) -> io::Result<Option<Line>>;

    /// Write a short frame in one burst.
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Write a data frame byte-at-a-time through the paced writer.
    fn write_paced(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Drop any buffered input and output.
    fn discard_buffers(&mut self);
}

/// Serial device opened in raw 8N1 mode.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    pacer: PacedWriter,
    pending: Line,
}

impl SerialLink {
    /// Open and configure the device: 8 data bits, no parity, one stop bit,
    /// no flow control.
    pub fn open(path: &str, baud_rate: u32) -> crate::error::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(Self {
            port,
            pacer: PacedWriter::default(),
            pending: Line::new(),
        })
    }
}

impl LineIo for SerialLink {
    fn read_line(&mut self) -> io::Result<Option<Line>> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    if self.pending.push(byte[0]).is_err() {
                        // Line hit the 256-byte cap without a terminator;
                        // hand it over as-is, length checks will drop it.
                        return Ok(Some(std::mem::take(&mut self.pending)));
                    }
                    let n = self.pending.len();
                    if n >= 2 && self.pending[n - 2] == b'\r' && self.pending[n - 1] == b'\n' {
                        return Ok(Some(std::mem::take(&mut self.pending)));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn write_paced(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.pacer.write_frame(&mut self.port, bytes)
    }

    fn discard_buffers(&mut self) {
        if let Err(e) = self.port.clear(serialport::ClearBuffer::All) {
            warn!("serial: buffer flush failed: {e}");
        }
    }
}
