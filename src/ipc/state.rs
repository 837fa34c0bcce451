// CLASSIFICATION: COMMUNITY
// Filename: state.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Savestate capture and restore for the IPC layer.

use super::context::IpcQueues;
use super::fd_table::{FdTable, IPC_MAX_FDS};
use super::Kernel;
use crate::device::file_io::{FileIo, FileIoState};
use crate::device::{lock, share, DeviceType};
use crate::error::{IpcError, IpcResult};
use crate::timing::CoreTiming;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What a descriptor slot points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    /// A device in the table, re-resolved by id on load.
    StaticRef(u32),
    /// A handle owned by the slot and rebuilt from its blob.
    OwnedResource(FileIoState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub id: u32,
    pub opened: bool,
    pub data: Value,
}

/// Everything needed to resume the IPC layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcState {
    pub queues: IpcQueues,
    pub last_reply_time: u64,
    pub timing: CoreTiming,
    pub slots: Vec<Option<SlotState>>,
    pub bounded: BTreeMap<String, Vec<u32>>,
    pub devices: Vec<DeviceState>,
}

impl IpcState {
    pub fn to_bytes(&self) -> IpcResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> IpcResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Kernel {
    pub fn save_state(&self) -> IpcResult<IpcState> {
        let mut devices = Vec::new();
        for device in self.devices.all()? {
            let dev = lock(&device);
            devices.push(DeviceState {
                id: dev.id(),
                opened: dev.is_opened(),
                data: dev.save_state()?,
            });
        }

        let mut slots = vec![None; IPC_MAX_FDS];
        for (fd, device) in self.fds.iter() {
            let dev = lock(device);
            slots[fd] = Some(match dev.device_type() {
                DeviceType::Static => SlotState::StaticRef(dev.id()),
                DeviceType::FileIo => {
                    SlotState::OwnedResource(serde_json::from_value(dev.save_state()?)?)
                }
            });
        }

        Ok(IpcState {
            queues: self.ctx.queues.clone(),
            last_reply_time: self.ctx.last_reply_time,
            timing: self.ctx.timing.clone(),
            slots,
            bounded: self.devices.bounded_paths().clone(),
            devices,
        })
    }

    /// Restore a savestate taken from a kernel with the same device table.
    pub fn load_state(&mut self, state: IpcState) -> IpcResult<()> {
        for (path, ids) in &state.bounded {
            if self.devices.bounded_ids(path) != Some(ids.as_slice()) {
                error!("savestate: {path} handles {ids:?} do not match the device table");
                return Err(IpcError::State(format!("handle set mismatch for {path}")));
            }
        }

        for saved in state.devices {
            let device = self
                .devices
                .access_by_id(saved.id)?
                .ok_or_else(|| IpcError::State(format!("unknown device id {}", saved.id)))?;
            let mut dev = lock(&device);
            dev.info_mut().opened = saved.opened;
            dev.load_state(saved.data)?;
        }

        let mut fds = FdTable::new();
        for (fd, slot) in state.slots.into_iter().enumerate().take(IPC_MAX_FDS) {
            let device = match slot {
                None => continue,
                Some(SlotState::StaticRef(id)) => self
                    .devices
                    .access_by_id(id)?
                    .ok_or_else(|| IpcError::State(format!("fd {fd}: unknown device id {id}")))?,
                Some(SlotState::OwnedResource(file)) => {
                    share(FileIo::restore(&self.ctx, fd as u32, &file))
                }
            };
            fds.bind(fd, device);
        }
        self.fds = fds;

        self.ctx.queues = state.queues;
        self.ctx.last_reply_time = state.last_reply_time;
        self.ctx.timing = state.timing;
        info!("IPC: savestate restored, {} descriptors open", self.fds.occupied());
        Ok(())
    }
}
