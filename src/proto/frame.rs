//! Frame types exchanged on the serial link.
//!
//! Three shapes exist: the inbound [`CommandFrame`] (a borrowed view over
//! one received line), the outbound [`AckFrame`] (0/4/5/7 bytes depending
//! on its length class) and the outbound [`DataFrame`] carrying one file
//! chunk with a 16-bit additive checksum.

use super::wire::{self, SizeClass};

/// Borrowed view over a received command line.
///
/// `line` must include the CRLF terminator; the end marker sits 3 bytes
/// before the end of the line. Marker bytes are carried but not validated;
/// only line length gates a command.
#[derive(Debug, Clone, Copy)]
pub struct CommandFrame<'a> {
    pub header: u8,
    pub opcode: u8,
    pub camera_id: u8,
    pub content: &'a [u8],
    pub end: u8,
    /// Total line length, terminator included.
    pub line_len: usize,
}

impl<'a> CommandFrame<'a> {
    /// Split a raw line into its frame fields.
    ///
    /// Returns `None` for lines shorter than the minimum frame — the caller
    /// must stay silent in that case.
    pub fn parse(line: &'a [u8]) -> Option<Self> {
        if line.len() < wire::MIN_LINE {
            return None;
        }
        let len = line.len();
        Some(Self {
            header: line[0],
            opcode: line[1],
            camera_id: line[2],
            content: &line[3..len - 3],
            end: line[len - 3],
            line_len: len,
        })
    }
}

/// Acknowledgment length class: which optional fields are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AckClass {
    /// Send nothing; the peer times out or a data frame is the reply.
    Silent = 0,
    /// header, specifier, camera id, end.
    Bare = 4,
    /// Bare plus one optional byte before the end marker.
    WithOptional = 5,
    /// Bare plus hour, minute and the optional byte.
    WithTime = 7,
}

/// Outbound acknowledgment frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub class: AckClass,
    pub specifier: u8,
    pub camera_id: u8,
    pub hour: u8,
    pub minute: u8,
    pub optional: u8,
}

impl AckFrame {
    pub fn bare(specifier: u8, camera_id: u8) -> Self {
        Self {
            class: AckClass::Bare,
            specifier,
            camera_id,
            hour: 0,
            minute: 0,
            optional: 0,
        }
    }

    pub fn with_optional(specifier: u8, camera_id: u8, optional: u8) -> Self {
        Self {
            class: AckClass::WithOptional,
            optional,
            ..Self::bare(specifier, camera_id)
        }
    }

    pub fn with_time(specifier: u8, camera_id: u8, hour: u8, minute: u8, optional: u8) -> Self {
        Self {
            class: AckClass::WithTime,
            hour,
            minute,
            optional,
            ..Self::bare(specifier, camera_id)
        }
    }

    /// Serialize into the exact on-wire byte sequence for this class.
    pub fn serialize(&self) -> heapless::Vec<u8, 7> {
        let mut out = heapless::Vec::new();
        let fields: &[u8] = match self.class {
            AckClass::Silent => &[],
            AckClass::Bare => &[wire::START, self.specifier, self.camera_id, wire::END],
            AckClass::WithOptional => &[
                wire::START,
                self.specifier,
                self.camera_id,
                self.optional,
                wire::END,
            ],
            AckClass::WithTime => &[
                wire::START,
                self.specifier,
                self.camera_id,
                self.hour,
                self.minute,
                self.optional,
                wire::END,
            ],
        };
        // Capacity is 7 and the longest class is 7 bytes.
        let _ = out.extend_from_slice(fields);
        out
    }
}

/// Outbound data frame carrying one zero-padded file chunk.
///
/// Layout: header, opcode, camera id, chunk id (hour, minute, index),
/// size class, payload, checksum (big-endian u16), end marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub camera_id: u8,
    /// hour, minute, package index — echoed from the request.
    pub chunk_id: [u8; 3],
    pub size_class: SizeClass,
    /// Exactly `size_class.bytes()` long; short reads are zero-padded
    /// before construction.
    pub payload: Vec<u8>,
}

impl DataFrame {
    /// Framing overhead around the payload: 3 header bytes, 3 id bytes,
    /// size class, 2 checksum bytes, end marker.
    pub const OVERHEAD: usize = 10;

    /// Additive checksum: low 16 bits of the sum of header, opcode,
    /// camera id, the three chunk-id bytes, the size-class code and every
    /// payload byte.
    pub fn checksum(&self) -> u16 {
        let mut sum: u32 = u32::from(wire::START)
            + u32::from(wire::Opcode::SendSpecDataPackage.as_byte())
            + u32::from(self.camera_id)
            + u32::from(self.chunk_id[0])
            + u32::from(self.chunk_id[1])
            + u32::from(self.chunk_id[2])
            + u32::from(self.size_class.code());
        for byte in &self.payload {
            sum = sum.wrapping_add(u32::from(*byte));
        }
        (sum & 0xFFFF) as u16
    }

    /// Serialize into the exact on-wire byte sequence.
    ///
    /// The data frame always carries the SEND_SPEC_DATA_PACKAGE opcode,
    /// even when the request arrived as GET_SPEC_PACKAGE.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + Self::OVERHEAD);
        out.push(wire::START);
        out.push(wire::Opcode::SendSpecDataPackage.as_byte());
        out.push(self.camera_id);
        out.extend_from_slice(&self.chunk_id);
        out.push(self.size_class.code());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.checksum().to_be_bytes());
        out.push(wire::END);
        out
    }
}
