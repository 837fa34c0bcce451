// CLASSIFICATION: COMMUNITY
// Filename: table.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Registry of static devices keyed by id, resolvable by path.

use super::{lock, share, Device, DeviceInfo, DeviceRef};
use crate::error::{IpcError, IpcResult};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

type DeviceMap = BTreeMap<u32, DeviceRef>;

/// Ordered collection of registered devices.
///
/// The map sits behind a mutex because savestate code may inspect it from a
/// thread other than the emulation thread.
#[derive(Default)]
pub struct DeviceTable {
    devices: Mutex<DeviceMap>,
    bounded: BTreeMap<String, Vec<u32>>,
    next_id: u32,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> IpcResult<MutexGuard<'_, DeviceMap>> {
        self.devices.lock().map_err(|_| IpcError::LockPoisoned)
    }

    /// Register a device under `path` and return its id.
    pub fn add_device<D, F>(&mut self, path: &str, make: F) -> IpcResult<u32>
    where
        D: Device + 'static,
        F: FnOnce(DeviceInfo) -> D,
    {
        let id = self.next_id;
        let device = share(make(DeviceInfo::new(id, path)));
        self.map()?.insert(id, device);
        self.next_id += 1;
        debug!("registered {path} as device {id}");
        Ok(id)
    }

    /// Register `count` interchangeable instances that share one path.
    pub fn add_bounded<D, F>(&mut self, path: &str, count: usize, make: F) -> IpcResult<Vec<u32>>
    where
        D: Device + 'static,
        F: Fn(DeviceInfo) -> D,
    {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.add_device(path, &make)?);
        }
        self.bounded.insert(path.to_string(), ids.clone());
        Ok(ids)
    }

    /// Instance ids of a handle-bounded path, if `path` is one.
    pub fn bounded_ids(&self, path: &str) -> Option<&[u32]> {
        self.bounded.get(path).map(Vec::as_slice)
    }

    pub fn bounded_paths(&self) -> &BTreeMap<String, Vec<u32>> {
        &self.bounded
    }

    /// First registered device whose name is `path`.
    pub fn get_by_name(&self, path: &str) -> IpcResult<Option<DeviceRef>> {
        Ok(self
            .map()?
            .values()
            .find(|d| lock(d).name() == path)
            .map(Arc::clone))
    }

    pub fn access_by_id(&self, id: u32) -> IpcResult<Option<DeviceRef>> {
        Ok(self.map()?.get(&id).map(Arc::clone))
    }

    /// Snapshot of every device in id order.
    pub fn all(&self) -> IpcResult<Vec<DeviceRef>> {
        Ok(self.map()?.values().map(Arc::clone).collect())
    }

    pub fn len(&self) -> usize {
        self.devices.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every device and restart id allocation.
    pub fn clear(&mut self) -> IpcResult<()> {
        self.map()?.clear();
        self.bounded.clear();
        self.next_id = 0;
        Ok(())
    }
}
