// CLASSIFICATION: COMMUNITY
// Filename: ncd.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! `/dev/net/ncd/manage`: network configuration blob and link status.

use super::get_mac_address;
use crate::device::{Device, DeviceInfo, IpcCommandResult};
use crate::error::{code, IpcError, IpcResult};
use crate::ipc::context::IpcContext;
use crate::ipc::request::IoctlvRequest;
use crate::memory::GuestMemory;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub const NCD_LOCKWIRELESSDRIVER: u32 = 0x1;
pub const NCD_UNLOCKWIRELESSDRIVER: u32 = 0x2;
pub const NCD_GETCONFIG: u32 = 0x3;
pub const NCD_SETCONFIG: u32 = 0x4;
pub const NCD_READCONFIG: u32 = 0x5;
pub const NCD_WRITECONFIG: u32 = 0x6;
pub const NCD_GETLINKSTATUS: u32 = 0x7;
pub const NCD_GETWIRELESSMACADDRESS: u32 = 0x8;

/// Size of the persisted network configuration.
pub const CONFIG_DATA_SIZE: usize = 0x1B5C;
/// NAND-relative location of the configuration file.
pub const CONFIG_PATH: &str = "/shared2/sys/net/02/config.dat";

pub const LINK_WIRED: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NcdState {
    config: Vec<u8>,
}

pub struct NetNcdManage {
    info: DeviceInfo,
    config: Vec<u8>,
}

impl NetNcdManage {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            config: vec![0; CONFIG_DATA_SIZE],
        }
    }

    pub fn config(&self) -> &[u8] {
        &self.config
    }

    fn config_path(ctx: &IpcContext) -> Option<PathBuf> {
        ctx.config.nand_path(CONFIG_PATH)
    }

    /// Load the blob from NAND, falling back to an empty configuration.
    fn read_config(&mut self, ctx: &IpcContext) {
        let loaded = Self::config_path(ctx).and_then(|p| std::fs::read(p).ok());
        match loaded {
            Some(data) if data.len() == CONFIG_DATA_SIZE => self.config = data,
            Some(data) => {
                warn!("NCD: config.dat has size {:#x}, resetting", data.len());
                self.reset_config(ctx);
            }
            None => {
                info!("NCD: no stored network config, resetting");
                self.reset_config(ctx);
            }
        }
    }

    fn reset_config(&mut self, ctx: &IpcContext) {
        self.config = vec![0; CONFIG_DATA_SIZE];
        self.write_config(ctx);
    }

    fn write_config(&self, ctx: &IpcContext) {
        let Some(path) = Self::config_path(ctx) else {
            warn!("NCD: no NAND root configured, network config not saved");
            return;
        };
        let result = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::write(&path, &self.config));
        if let Err(e) = result {
            error!("NCD: failed to write {}: {e}", path.display());
        }
    }

    fn load_from_guest(&mut self, mem: &dyn GuestMemory, addr: u32) {
        self.config = mem.read_vec(addr, CONFIG_DATA_SIZE);
    }
}

impl Device for NetNcdManage {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    fn ioctlv(&mut self, ctx: &mut IpcContext, request: &IoctlvRequest) -> IpcCommandResult {
        let common_result: u32 = 0;
        let mut common_vector = 0;

        match request.request {
            NCD_LOCKWIRELESSDRIVER | NCD_UNLOCKWIRELESSDRIVER => {}
            NCD_GETCONFIG => {
                info!("NCD: GETCONFIG");
                ctx.memory.write_bytes(request.output(0).address, &self.config);
                common_vector = 1;
            }
            NCD_SETCONFIG => {
                info!("NCD: SETCONFIG");
                self.load_from_guest(&*ctx.memory, request.input(0).address);
            }
            NCD_READCONFIG => {
                info!("NCD: READCONFIG");
                self.read_config(ctx);
                ctx.memory.write_bytes(request.output(0).address, &self.config);
                common_vector = 1;
            }
            NCD_WRITECONFIG => {
                info!("NCD: WRITECONFIG");
                self.load_from_guest(&*ctx.memory, request.input(0).address);
                self.write_config(ctx);
            }
            NCD_GETLINKSTATUS => {
                info!("NCD: GETLINKSTATUS");
                ctx.memory.write_u32(request.output(0).address.wrapping_add(4), LINK_WIRED);
            }
            NCD_GETWIRELESSMACADDRESS => {
                info!("NCD: GETWIRELESSMACADDRESS");
                let mac = get_mac_address(&ctx.config);
                ctx.memory.write_bytes(request.output(1).address, &mac);
            }
            other => info!("NCD: unhandled ioctlv {other:#x}"),
        }

        let result_addr = request.output(common_vector).address;
        ctx.memory.write_u32(result_addr, common_result);
        if common_vector == 1 {
            ctx.memory.write_u32(result_addr.wrapping_add(4), common_result);
        }
        ctx.default_reply(code::IPC_SUCCESS)
    }

    fn save_state(&self) -> IpcResult<Value> {
        Ok(serde_json::to_value(NcdState {
            config: self.config.clone(),
        })?)
    }

    fn load_state(&mut self, state: Value) -> IpcResult<()> {
        let state: NcdState = serde_json::from_value(state)?;
        if state.config.len() != CONFIG_DATA_SIZE {
            return Err(IpcError::State(format!(
                "network config blob has size {:#x}",
                state.config.len()
            )));
        }
        self.config = state.config;
        Ok(())
    }
}
