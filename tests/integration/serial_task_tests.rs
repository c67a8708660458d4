//! Serial worker loop driven by an in-memory transport: one write per
//! line, acks in a single burst, data frames through the paced path, and
//! restart propagation to the shutdown token.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use camlink::config::{ConfigHandle, RuntimeConfig};
use camlink::osd::OsdSlot;
use camlink::proto::engine::ProtocolEngine;
use camlink::proto::wire;
use camlink::serial::{Line, LineIo, task};
use camlink::shutdown::ShutdownToken;
use camlink::storage::index::DirectoryIndex;

use camlink::app::ports::NullLed;

use crate::mock_ports::{MockClock, MockStore, MockVolume};

/// Feeds a fixed script of lines, then trips the shutdown token so the
/// worker loop winds down exactly like an external stop request.
struct ScriptedLink {
    incoming: VecDeque<Vec<u8>>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    paced: Arc<Mutex<Vec<Vec<u8>>>>,
    token: ShutdownToken,
}

impl ScriptedLink {
    fn new(script: &[Vec<u8>], token: ShutdownToken) -> Self {
        Self {
            incoming: script.iter().cloned().collect(),
            written: Arc::new(Mutex::new(Vec::new())),
            paced: Arc::new(Mutex::new(Vec::new())),
            token,
        }
    }
}

impl LineIo for ScriptedLink {
    fn read_line(&mut self) -> io::Result<Option<Line>> {
        match self.incoming.pop_front() {
            Some(bytes) => {
                let mut line = Line::new();
                line.extend_from_slice(&bytes).unwrap();
                Ok(Some(line))
            }
            None => {
                self.token.request_stop();
                Ok(None)
            }
        }
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn write_paced(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.paced.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn discard_buffers(&mut self) {}
}

fn line(opcode: u8, camera_id: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![wire::START, opcode, camera_id];
    out.extend_from_slice(content);
    out.push(wire::END);
    out.extend_from_slice(wire::LINE_TERMINATOR);
    out
}

fn run_script(script: &[Vec<u8>]) -> (Vec<Vec<u8>>, Vec<Vec<u8>>, ShutdownToken) {
    let tree = tempfile::tempdir().unwrap();
    let token = ShutdownToken::new();
    let link = ScriptedLink::new(script, token.clone());
    let written = link.written.clone();
    let paced = link.paced.clone();

    let engine = ProtocolEngine::new(
        ConfigHandle::new(RuntimeConfig::default()),
        DirectoryIndex::new(tree.path()),
        Arc::new(OsdSlot::new()),
        MockClock::pinned(),
        MockVolume::with_usage(0.0),
        MockStore::new(),
    );
    task::run(link, engine, NullLed, token.clone());

    let written = written.lock().unwrap().clone();
    let paced = paced.lock().unwrap().clone();
    (written, paced, token)
}

#[test]
fn ack_goes_out_in_one_burst() {
    let (written, paced, _) = run_script(&[line(0x53, 1, &[])]);
    assert_eq!(written, vec![vec![wire::START, 0x53, 1, 0, wire::END]]);
    assert!(paced.is_empty());
}

#[test]
fn silent_drops_write_nothing() {
    let (written, paced, _) = run_script(&[
        vec![wire::START, 0x4D, 1, wire::END, b'\r', b'\n'], // undersized NEXT_FILE
        b"\r\n".to_vec(),                                    // runt line
    ]);
    assert!(written.is_empty());
    assert!(paced.is_empty());
}

#[test]
fn each_line_gets_at_most_one_reply() {
    let (written, paced, _) = run_script(&[
        line(0x53, 1, &[]),
        line(0x7A, 1, &[]), // unknown opcode
        line(0x49, 1, &[0x34]), // baud unchanged
    ]);
    assert_eq!(written.len(), 3);
    assert!(paced.is_empty());
}

#[test]
fn baud_change_requests_restart_after_ack() {
    let (written, _, token) = run_script(&[line(0x49, 1, &[0x30])]);
    assert_eq!(written, vec![vec![wire::START, 0x49, 1, wire::END]]);
    assert!(token.restart_requested());
}

#[test]
fn unchanged_baud_does_not_request_restart() {
    let (_, _, token) = run_script(&[line(0x49, 1, &[0x34])]);
    assert!(!token.restart_requested());
}
