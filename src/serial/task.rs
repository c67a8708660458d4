//! Serial worker — bridges the transport to the protocol engine.
//!
//! One dedicated thread reads command lines and writes the engine's
//! replies. Shutdown is observed between lines; an in-flight request
//! completes before the thread exits.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::app::ports::{ActivityLed, Clock, ConfigStore, VolumeMount};
use crate::proto::engine::{ProtocolEngine, Reply};
use crate::shutdown::ShutdownToken;

use super::LineIo;

/// Back-off after a hard read error so a dead link does not spin the loop.
const READ_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Spawn the serial worker thread.
pub fn spawn<T, C, V, S, L>(
    link: T,
    engine: ProtocolEngine<C, V, S>,
    led: L,
    token: ShutdownToken,
) -> std::io::Result<JoinHandle<()>>
where
    T: LineIo + Send + 'static,
    C: Clock + Send + 'static,
    V: VolumeMount + Send + 'static,
    S: ConfigStore + Send + 'static,
    L: ActivityLed + Send + 'static,
{
    thread::Builder::new()
        .name("serial".into())
        .spawn(move || run(link, engine, led, token))
}

/// The worker loop. Public so tests can drive it with an in-memory
/// transport.
pub fn run<T, C, V, S, L>(
    mut link: T,
    mut engine: ProtocolEngine<C, V, S>,
    mut led: L,
    token: ShutdownToken,
) where
    T: LineIo,
    C: Clock,
    V: VolumeMount,
    S: ConfigStore,
    L: ActivityLed,
{
    info!("serial: worker started");
    link.discard_buffers();

    while !token.should_stop() {
        let line = match link.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(e) => {
                warn!("serial: read failed: {e}");
                token.wait_timeout(READ_ERROR_BACKOFF);
                continue;
            }
        };

        led.toggle();
        let reply = engine.handle_line(&line);

        // Exactly one write per processed line; buffers are flushed around
        // the round trip so stale bytes never interleave with a reply.
        link.discard_buffers();
        let written = match &reply {
            Reply::Silent => Ok(()),
            Reply::Ack(ack) => link.write_frame(&ack.serialize()),
            Reply::Data(data) => link.write_paced(&data.serialize()),
        };
        if let Err(e) = written {
            warn!("serial: reply write failed: {e}");
        }
        link.discard_buffers();

        if engine.take_restart_request() {
            // Ack already on the wire; hand the restart to the orchestrator.
            token.request_restart();
        }
    }

    link.discard_buffers();
    info!("serial: worker stopped");
}
