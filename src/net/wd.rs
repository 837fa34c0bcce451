// CLASSIFICATION: COMMUNITY
// Filename: wd.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! `/dev/net/wd/command`: just enough of the wireless driver for scans.

use super::get_mac_address;
use crate::device::{Device, DeviceInfo, IpcCommandResult};
use crate::error::code;
use crate::ipc::context::IpcContext;
use crate::ipc::request::IoctlvRequest;
use log::info;

pub const WD_GET_MODE: u32 = 0x1001;
pub const WD_SET_LINKSTATE: u32 = 0x1002;
pub const WD_GET_LINKSTATE: u32 = 0x1003;
pub const WD_SET_CONFIG: u32 = 0x1004;
pub const WD_GET_CONFIG: u32 = 0x1005;
pub const WD_CHANGE_BEACON: u32 = 0x1006;
pub const WD_DISASSOC: u32 = 0x1007;
pub const WD_MP_SEND_FRAME: u32 = 0x1008;
pub const WD_SEND_FRAME: u32 = 0x1009;
pub const WD_SCAN: u32 = 0x100a;
pub const WD_CALL_WL: u32 = 0x100c;
pub const WD_MEASURE_CHANNEL: u32 = 0x100b;
pub const WD_GET_LASTERROR: u32 = 0x100d;
pub const WD_GET_INFO: u32 = 0x100e;
pub const WD_CHANGE_GAMEINFO: u32 = 0x100f;
pub const WD_CHANGE_VTSF: u32 = 0x1010;
pub const WD_RECV_FRAME: u32 = 0x8000;
pub const WD_RECV_NOTIFICATION: u32 = 0x8001;

/// Packed BSSInfo record returned by SCAN.
pub const BSS_INFO_SIZE: u32 = 0x40;
const BSS_LENGTH: u32 = 0x00;
const BSS_RSSI: u32 = 0x02;
const BSS_BSSID: u32 = 0x04;
const BSS_SSID_LENGTH: u32 = 0x0a;
const BSS_SSID: u32 = 0x0c;
const BSS_CHANNEL: u32 = 0x36;

/// Packed Info record returned by GET_INFO.
pub const WD_INFO_SIZE: u32 = 0x90;
const INFO_MAC: u32 = 0x00;
const INFO_NTR_ALLOWED_CHANNELS: u32 = 0x06;
const INFO_COUNTRY: u32 = 0x0a;

pub const FAKE_SSID: &str = "dolphin-emu";
const FAKE_CHANNEL: u16 = 2;

pub struct NetWdCommand {
    info: DeviceInfo,
}

impl NetWdCommand {
    pub fn new(info: DeviceInfo) -> Self {
        Self { info }
    }

    /// One fake access point so titles that insist on a scan result proceed.
    fn scan(ctx: &mut IpcContext, out: u32) {
        let mem = &mut *ctx.memory;
        mem.write_u16(out, 1);
        let bss = out.wrapping_add(2);
        mem.fill(bss, 0, BSS_INFO_SIZE as usize);
        mem.write_u16(bss.wrapping_add(BSS_LENGTH), BSS_INFO_SIZE as u16);
        mem.write_u16(bss.wrapping_add(BSS_RSSI), 0xffff);
        mem.write_bytes(bss.wrapping_add(BSS_BSSID), &[0, 1, 2, 3, 4, 5]);
        mem.write_u16(bss.wrapping_add(BSS_SSID_LENGTH), FAKE_SSID.len() as u16);
        mem.write_cstring(bss.wrapping_add(BSS_SSID), FAKE_SSID);
        mem.write_u16(bss.wrapping_add(BSS_CHANNEL), FAKE_CHANNEL);
    }

    fn get_info(ctx: &mut IpcContext, out: u32) {
        let mac = get_mac_address(&ctx.config);
        let mem = &mut *ctx.memory;
        mem.fill(out, 0, WD_INFO_SIZE as usize);
        mem.write_bytes(out.wrapping_add(INFO_MAC), &mac);
        mem.write_u16(out.wrapping_add(INFO_NTR_ALLOWED_CHANNELS), 0xfffe);
        mem.write_bytes(out.wrapping_add(INFO_COUNTRY), b"US");
    }
}

impl Device for NetWdCommand {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    fn ioctlv(&mut self, ctx: &mut IpcContext, request: &IoctlvRequest) -> IpcCommandResult {
        match request.request {
            WD_SCAN => {
                info!("WD: SCAN");
                Self::scan(ctx, request.output(0).address);
            }
            WD_GET_INFO => {
                info!("WD: GET_INFO");
                Self::get_info(ctx, request.output(0).address);
            }
            _ => request.dump(self.name()),
        }
        ctx.default_reply(code::IPC_SUCCESS)
    }
}
