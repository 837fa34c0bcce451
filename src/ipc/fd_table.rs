// CLASSIFICATION: COMMUNITY
// Filename: fd_table.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Fixed 24-entry descriptor table.

use crate::device::DeviceRef;
use std::sync::Arc;

/// Number of descriptor slots IOS exposes.
pub const IPC_MAX_FDS: usize = 0x18;

pub struct FdTable {
    slots: [Option<DeviceRef>; IPC_MAX_FDS],
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Lowest unoccupied slot.
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn get(&self, fd: u32) -> Option<&DeviceRef> {
        self.slots.get(fd as usize).and_then(Option::as_ref)
    }

    pub fn bind(&mut self, fd: usize, device: DeviceRef) {
        self.slots[fd] = Some(device);
    }

    /// Clear slot `fd`, returning what it held.
    pub fn take(&mut self, fd: u32) -> Option<DeviceRef> {
        self.slots.get_mut(fd as usize).and_then(Option::take)
    }

    /// Whether any slot references `device`.
    pub fn references(&self, device: &DeviceRef) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|d| Arc::ptr_eq(d, device))
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &DeviceRef)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(fd, s)| s.as_ref().map(|d| (fd, d)))
    }
}
