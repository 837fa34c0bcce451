// CLASSIFICATION: COMMUNITY
// Filename: context.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! State shared between the dispatcher and the devices it routes to.
//!
//! Devices receive `&mut IpcContext` on every call so they can touch guest
//! memory and post deferred replies without reaching for globals.

use crate::config::IpcConfig;
use crate::device::IpcCommandResult;
use crate::interface::IpcInterface;
use crate::ipc::request::{IpcCommand, Request, OFFSET_COMMAND, OFFSET_FD, OFFSET_RETURN};
use crate::memory::GuestMemory;
use crate::timing::{CoreTiming, IpcEvent};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// === IpcQueues Struct ===

/// Request, reply and acknowledgement FIFOs of guest record addresses.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcQueues {
    pub requests: VecDeque<u32>,
    pub replies: VecDeque<u32>,
    pub acks: VecDeque<u32>,
}

impl IpcQueues {
    pub fn clear(&mut self) {
        self.requests.clear();
        self.replies.clear();
        self.acks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.replies.is_empty() && self.acks.is_empty()
    }
}

pub struct IpcContext {
    pub memory: Box<dyn GuestMemory>,
    pub timing: CoreTiming,
    pub config: IpcConfig,
    pub(crate) interface: Box<dyn IpcInterface>,
    pub(crate) queues: IpcQueues,
    pub(crate) last_reply_time: u64,
}

impl IpcContext {
    pub fn new(
        config: IpcConfig,
        memory: Box<dyn GuestMemory>,
        interface: Box<dyn IpcInterface>,
    ) -> Self {
        Self {
            memory,
            timing: CoreTiming::new(),
            config,
            interface,
            queues: IpcQueues::default(),
            last_reply_time: 0,
        }
    }

    /// Reply with the configured default latency.
    pub fn default_reply(&self, return_value: i32) -> IpcCommandResult {
        IpcCommandResult::reply(return_value, self.config.default_reply_delay_ticks)
    }

    pub fn queues(&self) -> &IpcQueues {
        &self.queues
    }

    /// Tick before which no further reply may become visible.
    pub fn last_reply_time(&self) -> u64 {
        self.last_reply_time
    }

    /// Stretch a command's reply `delay` so it cannot fire before a reply the
    /// dispatcher already scheduled, and advance the watermark.
    pub(crate) fn ordered_reply_delay(&mut self, delay: u64) -> u64 {
        let now = self.timing.ticks();
        let delay = delay.max(self.last_reply_time.saturating_sub(now));
        self.last_reply_time = now.saturating_add(delay);
        delay
    }

    /// Write the reply into the record at `request.address` and schedule its
    /// notification after `delay` ticks.
    ///
    /// Devices call this for replies they deferred; those fire as soon as
    /// they are ready and are not held behind the watermark.
    pub fn enqueue_reply(&mut self, request: &Request, return_value: i32, delay: u64) {
        let addr = request.address;
        self.memory.write_u32(addr.wrapping_add(OFFSET_RETURN), return_value as u32);
        self.memory.write_u32(addr.wrapping_add(OFFSET_FD), request.command);
        self.memory.write_u32(addr.wrapping_add(OFFSET_COMMAND), IpcCommand::Reply as u32);
        debug!("reply {addr:#010x} = {return_value} in {delay} ticks");
        self.timing.schedule(delay, IpcEvent::Reply(addr));
    }

    /// Schedule a standalone acknowledgement for the record at `addr`.
    pub fn enqueue_command_acknowledgement(&mut self, addr: u32, delay: u64) {
        self.timing.schedule(delay, IpcEvent::Ack(addr));
    }

    /// Route a fired event into its queue.
    pub(crate) fn enqueue_event(&mut self, event: IpcEvent) {
        match event {
            IpcEvent::Request(a) => self.queues.requests.push_back(a),
            IpcEvent::Reply(a) => self.queues.replies.push_back(a),
            IpcEvent::Ack(a) => self.queues.acks.push_back(a),
        }
    }

    /// Deliver one queued reply or acknowledgement. Requests are drained by
    /// the kernel because they need the device tables.
    pub(crate) fn deliver_one(&mut self) {
        if let Some(addr) = self.queues.replies.pop_front() {
            self.interface.generate_reply(addr);
            return;
        }
        if let Some(addr) = self.queues.acks.pop_front() {
            warn!("<<-- double-ack to IPC HLE for {addr:#010x}");
            self.interface.generate_ack(addr);
        }
    }

    pub(crate) fn interface_ready(&self) -> bool {
        self.interface.is_ready()
    }

    pub(crate) fn acknowledge(&mut self, addr: u32) {
        self.interface.generate_ack(addr);
    }
}
