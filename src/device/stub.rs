// CLASSIFICATION: COMMUNITY
// Filename: stub.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Placeholder for devices this crate does not emulate.

use super::{Device, DeviceInfo, IpcCommandResult};
use crate::error::code;
use crate::ipc::context::IpcContext;
use crate::ipc::request::{IoctlRequest, IoctlvRequest, OpenRequest};
use log::{info, warn};

/// Accepts open/close and answers every ioctl with success.
pub struct StubDevice {
    info: DeviceInfo,
}

impl StubDevice {
    pub fn new(info: DeviceInfo) -> Self {
        Self { info }
    }
}

impl Device for StubDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    fn open(&mut self, _ctx: &mut IpcContext, request: &OpenRequest) -> i32 {
        warn!("{} faking Open() flags {:#x}", self.info.name, request.flags);
        self.info.opened = true;
        code::IPC_SUCCESS
    }

    fn ioctl(&mut self, ctx: &mut IpcContext, request: &IoctlRequest) -> IpcCommandResult {
        info!("{} faking IOCtl({:#x})", self.info.name, request.request);
        ctx.default_reply(code::IPC_SUCCESS)
    }

    fn ioctlv(&mut self, ctx: &mut IpcContext, request: &IoctlvRequest) -> IpcCommandResult {
        info!("{} faking IOCtlV({:#x})", self.info.name, request.request);
        ctx.default_reply(code::IPC_SUCCESS)
    }
}
