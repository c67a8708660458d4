//! Fuzz target: `CommandFrame::parse`
//!
//! Drives arbitrary byte lines into the frame parser and asserts that it
//! never panics, that runt lines never parse, and that the content slice
//! stays inside the input.
//!
//! cargo fuzz run fuzz_line_parser

#![no_main]

use camlink::proto::frame::CommandFrame;
use camlink::proto::wire;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match CommandFrame::parse(data) {
        Some(frame) => {
            assert!(data.len() >= wire::MIN_LINE);
            assert_eq!(frame.line_len, data.len());
            assert_eq!(frame.content.len(), data.len() - 6);
        }
        None => {
            assert!(data.len() < wire::MIN_LINE);
        }
    }
});
