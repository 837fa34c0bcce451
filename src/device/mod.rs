// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Virtual IOS devices.
//!
//! Every device answers the same capability set; descriptor slots hold shared
//! references so one device may back several open handles.

pub mod file_io;
pub mod stub;
pub mod table;

use crate::error::{code, IpcResult};
use crate::ipc::context::IpcContext;
use crate::ipc::request::{IoctlRequest, IoctlvRequest, OpenRequest, ReadWriteRequest, SeekRequest};
use log::warn;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use table::DeviceTable;

/// How a device is referenced from a descriptor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Lives in the device table for the whole session.
    Static,
    /// Private to one descriptor, created at open time.
    FileIo,
}

/// Outcome of a routed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpcCommandResult {
    pub return_value: i32,
    pub send_reply: bool,
    pub reply_delay_ticks: u64,
}

impl IpcCommandResult {
    pub fn reply(return_value: i32, reply_delay_ticks: u64) -> Self {
        Self {
            return_value,
            send_reply: true,
            reply_delay_ticks,
        }
    }

    /// The device will reply later through [`IpcContext::enqueue_reply`].
    pub fn no_reply() -> Self {
        Self {
            return_value: code::IPC_SUCCESS,
            send_reply: false,
            reply_delay_ticks: 0,
        }
    }
}

/// Identity and open flag shared by every device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: u32,
    pub name: String,
    pub opened: bool,
}

impl DeviceInfo {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            opened: false,
        }
    }
}

/// Capability set of an IOS device.
pub trait Device: Send {
    fn info(&self) -> &DeviceInfo;
    fn info_mut(&mut self) -> &mut DeviceInfo;

    fn id(&self) -> u32 {
        self.info().id
    }

    fn name(&self) -> &str {
        &self.info().name
    }

    fn is_opened(&self) -> bool {
        self.info().opened
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Static
    }

    /// Negative return values refuse the open.
    fn open(&mut self, _ctx: &mut IpcContext, _request: &OpenRequest) -> i32 {
        self.info_mut().opened = true;
        code::IPC_SUCCESS
    }

    fn close(&mut self, _ctx: &mut IpcContext, _fd: u32) -> i32 {
        self.info_mut().opened = false;
        code::IPC_SUCCESS
    }

    fn read(&mut self, ctx: &mut IpcContext, _request: &ReadWriteRequest) -> IpcCommandResult {
        unsupported(self.name(), ctx, "Read")
    }

    fn write(&mut self, ctx: &mut IpcContext, _request: &ReadWriteRequest) -> IpcCommandResult {
        unsupported(self.name(), ctx, "Write")
    }

    fn seek(&mut self, ctx: &mut IpcContext, _request: &SeekRequest) -> IpcCommandResult {
        unsupported(self.name(), ctx, "Seek")
    }

    fn ioctl(&mut self, ctx: &mut IpcContext, _request: &IoctlRequest) -> IpcCommandResult {
        unsupported(self.name(), ctx, "IOCtl")
    }

    fn ioctlv(&mut self, ctx: &mut IpcContext, _request: &IoctlvRequest) -> IpcCommandResult {
        unsupported(self.name(), ctx, "IOCtlV")
    }

    /// Periodic tick while the device is open.
    fn update(&mut self, _ctx: &mut IpcContext) {}

    /// Device-specific savestate payload.
    fn save_state(&self) -> IpcResult<Value> {
        Ok(Value::Null)
    }

    fn load_state(&mut self, _state: Value) -> IpcResult<()> {
        Ok(())
    }
}

fn unsupported(name: &str, ctx: &IpcContext, command: &str) -> IpcCommandResult {
    warn!("{name} does not support {command}()");
    ctx.default_reply(code::IPC_EINVAL)
}

/// Shared handle stored in the device table and descriptor slots.
pub type DeviceRef = Arc<Mutex<dyn Device>>;

/// Wrap a device for sharing.
pub fn share<D: Device + 'static>(device: D) -> DeviceRef {
    Arc::new(Mutex::new(device))
}

/// Lock a device, recovering from a panic in a previous holder.
pub fn lock(device: &DeviceRef) -> MutexGuard<'_, dyn Device + 'static> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}
