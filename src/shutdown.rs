//! Process-wide shutdown coordination.
//!
//! A cloneable token instead of a process-wide `keep_running` flag: each
//! worker owns a handle, observes it at the top of its loop and finishes
//! any in-flight operation before exiting. Sleeping loops wait on the
//! token instead of a bare `sleep`, so a shutdown request wakes them
//! immediately.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use log::info;

#[derive(Debug, Default)]
struct State {
    stop: bool,
    restart: bool,
}

struct Inner {
    state: Mutex<State>,
    cv: Condvar,
}

/// Cloneable cancellation token shared by every worker thread.
#[derive(Clone)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                cv: Condvar::new(),
            }),
        }
    }

    /// Request a graceful stop; idempotent.
    pub fn request_stop(&self) {
        let mut state = self.lock();
        state.stop = true;
        self.inner.cv.notify_all();
    }

    /// Request a stop followed by a process re-exec (baud-rate change,
    /// post-upgrade restart).
    pub fn request_restart(&self) {
        let mut state = self.lock();
        state.stop = true;
        state.restart = true;
        self.inner.cv.notify_all();
    }

    pub fn should_stop(&self) -> bool {
        self.lock().stop
    }

    pub fn restart_requested(&self) -> bool {
        self.lock().restart
    }

    /// Sleep for `timeout` or until shutdown is requested, whichever comes
    /// first. Returns `true` when the token has been tripped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        if state.stop {
            return true;
        }
        let (state, _) = self
            .inner
            .cv
            .wait_timeout_while(state, timeout, |s| !s.stop)
            .unwrap_or_else(|e| e.into_inner());
        state.stop
    }

    /// Hook SIGINT/SIGTERM to a graceful stop request.
    pub fn install_signal_handlers(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            info!("shutdown signal received");
            token.request_stop();
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
