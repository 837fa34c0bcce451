// CLASSIFICATION: COMMUNITY
// Filename: timing.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Cycle-granular event scheduling for the IPC layer.
//!
//! Events fire in `(due tick, insertion order)` order so two events scheduled
//! for the same instant are delivered FIFO.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Work the IPC layer asks the scheduler to replay later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IpcEvent {
    /// A new request record at this guest address enters the request queue.
    Request(u32),
    /// The reply for the record at this address becomes deliverable.
    Reply(u32),
    /// An acknowledgement for the record at this address.
    Ack(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct Scheduled {
    due: u64,
    seq: u64,
    event: IpcEvent,
}

// === CoreTiming Struct ===

/// Monotonic tick counter with a queue of pending IPC events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreTiming {
    now: u64,
    next_seq: u64,
    #[serde(with = "heap_as_vec")]
    events: BinaryHeap<Reverse<Scheduled>>,
    running: bool,
}

impl Default for CoreTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreTiming {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            events: BinaryHeap::new(),
            running: true,
        }
    }

    /// Current emulated tick.
    pub fn ticks(&self) -> u64 {
        self.now
    }

    /// Queue `event` to fire `delay` ticks from now.
    pub fn schedule(&mut self, delay: u64, event: IpcEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Reverse(Scheduled {
            due: self.now.saturating_add(delay),
            seq,
            event,
        }));
    }

    /// Drop every queued event.
    pub fn remove_all(&mut self) {
        self.events.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Tick of the earliest queued event.
    pub fn next_due(&self) -> Option<u64> {
        self.events.peek().map(|Reverse(s)| s.due)
    }

    /// Pop the earliest event due at or before `limit`, moving the clock to it.
    pub fn pop_due(&mut self, limit: u64) -> Option<IpcEvent> {
        match self.events.peek() {
            Some(Reverse(s)) if s.due <= limit => {}
            _ => return None,
        }
        let Reverse(s) = self.events.pop()?;
        self.now = self.now.max(s.due);
        Some(s.event)
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, tick: u64) {
        self.now = self.now.max(tick);
    }
}

mod heap_as_vec {
    use super::Scheduled;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    pub fn serialize<S: Serializer>(
        heap: &BinaryHeap<Reverse<Scheduled>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        let mut items: Vec<&Scheduled> = heap.iter().map(|Reverse(s)| s).collect();
        items.sort();
        items.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<BinaryHeap<Reverse<Scheduled>>, D::Error> {
        let items = Vec::<Scheduled>::deserialize(de)?;
        Ok(items.into_iter().map(Reverse).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tick_events_fire_fifo() {
        let mut t = CoreTiming::new();
        t.schedule(10, IpcEvent::Reply(0x20));
        t.schedule(10, IpcEvent::Reply(0x10));
        t.schedule(5, IpcEvent::Ack(0x30));
        assert_eq!(t.pop_due(100), Some(IpcEvent::Ack(0x30)));
        assert_eq!(t.ticks(), 5);
        assert_eq!(t.pop_due(100), Some(IpcEvent::Reply(0x20)));
        assert_eq!(t.pop_due(100), Some(IpcEvent::Reply(0x10)));
        assert_eq!(t.pop_due(100), None);
    }

    #[test]
    fn nothing_fires_before_due() {
        let mut t = CoreTiming::new();
        t.schedule(1000, IpcEvent::Request(0x40));
        assert_eq!(t.pop_due(999), None);
        assert_eq!(t.next_due(), Some(1000));
    }
}
