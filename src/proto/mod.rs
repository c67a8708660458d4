//! Command/acknowledgment protocol.
//!
//! [`wire`] pins the byte-level constants, [`frame`] the frame shapes, and
//! [`engine`] the per-command dispatch. The engine is fed by the serial
//! task ([`crate::serial::task`]) and never touches the port itself.

pub mod engine;
pub mod frame;
pub mod wire;
