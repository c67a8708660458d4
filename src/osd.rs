//! Single-slot mailbox for on-screen-display updates.
//!
//! The protocol engine is the producer; the vendor rendering thread (out of
//! scope here) is the consumer. There is no queue: at most one pending
//! update is retained and a burst of MOSD commands collapses to the latest
//! text. The consumer polls [`OsdSlot::take`], which clears the dirty flag.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Last-write-wins text slot with a dirty flag.
pub struct OsdSlot {
    text: Mutex<String>,
    dirty: AtomicBool,
}

impl Default for OsdSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl OsdSlot {
    pub fn new() -> Self {
        Self {
            text: Mutex::new(String::new()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Replace the pending text and mark the slot dirty.
    pub fn publish(&self, text: String) {
        let mut slot = self.text.lock().unwrap_or_else(|e| e.into_inner());
        *slot = text;
        self.dirty.store(true, Ordering::Release);
    }

    /// Consume the pending update, clearing the dirty flag.
    /// Returns `None` when nothing new has been published.
    pub fn take(&self) -> Option<String> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        let slot = self.text.lock().unwrap_or_else(|e| e.into_inner());
        Some(slot.clone())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}
