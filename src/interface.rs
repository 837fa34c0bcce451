// CLASSIFICATION: COMMUNITY
// Filename: interface.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Hollywood IPC register interface.
//!
//! The emulator's register block raises the guest interrupt; the dispatcher
//! only tells it which record was acknowledged or replied.

use std::sync::{Arc, Mutex, PoisonError};

/// Interrupt side of the IPC hardware.
pub trait IpcInterface: Send {
    /// Whether the guest has consumed the previous notification.
    fn is_ready(&self) -> bool;
    fn generate_ack(&mut self, address: u32);
    fn generate_reply(&mut self, address: u32);
}

/// A notification observed by [`RecordingInterface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Ack(u32),
    Reply(u32),
}

/// Shared log of delivered signals.
pub type SignalLog = Arc<Mutex<Vec<Signal>>>;

/// Interface that records every notification in order.
#[derive(Clone)]
pub struct RecordingInterface {
    log: SignalLog,
    ready: Arc<Mutex<bool>>,
}

impl Default for RecordingInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingInterface {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            ready: Arc::new(Mutex::new(true)),
        }
    }

    /// Handle to the signal log that survives moving the interface.
    pub fn log(&self) -> SignalLog {
        Arc::clone(&self.log)
    }

    pub fn set_ready(&self, ready: bool) {
        *self.ready.lock().unwrap_or_else(PoisonError::into_inner) = ready;
    }

    /// Addresses replied so far, in delivery order.
    pub fn replies(&self) -> Vec<u32> {
        self.signals()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Reply(a) => Some(a),
                Signal::Ack(_) => None,
            })
            .collect()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, s: Signal) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(s);
    }
}

impl IpcInterface for RecordingInterface {
    fn is_ready(&self) -> bool {
        *self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generate_ack(&mut self, address: u32) {
        self.push(Signal::Ack(address));
    }

    fn generate_reply(&mut self, address: u32) {
        self.push(Signal::Reply(address));
    }
}
