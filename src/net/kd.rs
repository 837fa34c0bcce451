// CLASSIFICATION: COMMUNITY
// Filename: kd.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! `/dev/net/kd/request`: WiiConnect24 scheduler control and user ids.

use crate::device::{Device, DeviceInfo, IpcCommandResult};
use crate::error::IpcResult;
use crate::ipc::context::IpcContext;
use crate::ipc::request::IoctlRequest;
use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const NWC24_SUSPEND_SCHEDULAR: u32 = 0x01;
pub const NWC24_EXEC_TRY_SUSPEND_SCHEDULAR: u32 = 0x02;
pub const NWC24_EXEC_RESUME_SCHEDULAR: u32 = 0x03;
pub const NWC24_STARTUP_SOCKET: u32 = 0x06;
pub const NWC24_CLEANUP_SOCKET: u32 = 0x07;
pub const NWC24_LOCK_SOCKET: u32 = 0x08;
pub const NWC24_UNLOCK_SOCKET: u32 = 0x09;
pub const NWC24_SAVE_MAIL_NOW: u32 = 0x0D;
pub const NWC24_REQUEST_GENERATED_USER_ID: u32 = 0x0F;
pub const NWC24_REQUEST_REGISTER_USER_ID: u32 = 0x10;
pub const NWC24_GET_SCHEDULAR_STAT: u32 = 0x1E;
pub const NWC24_REQUEST_SHUTDOWN: u32 = 0x28;

/// WiiConnect24 result codes.
pub mod wc24 {
    pub const OK: i32 = 0;
    pub const ERR_FATAL: i32 = -1;
    pub const ERR_ID_GENERATED: i32 = -35;
    pub const ERR_ID_REGISTERED: i32 = -36;
}

pub const MODEL_RVT: u8 = 0;
pub const MODEL_RVV: u8 = 0;
pub const MODEL_RVL: u8 = 1;
pub const MODEL_RVD: u8 = 2;
pub const MODEL_ELSE: u8 = 7;
pub const AREA_UNKNOWN: u8 = 7;

static AREA_CODES: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        ("JPN", 0),
        ("USA", 1),
        ("EUR", 2),
        ("AUS", 2),
        ("BRA", 1),
        ("TWN", 3),
        ("ROC", 3),
        ("KOR", 4),
        ("HKG", 5),
        ("ASI", 5),
        ("LTN", 1),
        ("SAF", 2),
        ("CHN", 6),
    ])
});

static HARDWARE_MODELS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    HashMap::from([
        ("RVL", MODEL_RVL),
        ("RVT", MODEL_RVT),
        ("RVV", MODEL_RVV),
        ("RVD", MODEL_RVD),
    ])
});

pub fn area_code(area: &str) -> u8 {
    AREA_CODES.get(area).copied().unwrap_or(AREA_UNKNOWN)
}

pub fn hardware_model(model: &str) -> u8 {
    HARDWARE_MODELS.get(model).copied().unwrap_or(MODEL_ELSE)
}

/// How far the console's WiiConnect24 identity has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum CreationStage {
    #[default]
    Initial = 0,
    Generated = 1,
    Registered = 2,
}

/// Persistent part of the WiiConnect24 configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nwc24Config {
    pub id: u64,
    pub id_gen: u16,
    pub creation_stage: CreationStage,
}

fn get_byte(value: u64, shift: u32) -> u8 {
    (value >> (shift * 8)) as u8
}

fn insert_byte(value: u64, shift: u32, byte: u8) -> u64 {
    let mask = 0xffu64 << (shift * 8);
    (value & !mask) | (u64::from(byte) << (shift * 8))
}

/// Derive the 16-digit WiiConnect24 friend code from console identity.
///
/// Returns the id and `wc24::OK`, or `wc24::ERR_FATAL` when the result does
/// not fit in 16 decimal digits.
pub fn make_user_id(hollywood_id: u32, id_ctr: u16, hardware_model: u8, area_code: u8) -> (u64, i32) {
    const TABLE2: [u32; 8] = [0x1, 0x5, 0x0, 0x4, 0x2, 0x3, 0x6, 0x7];
    const TABLE1: [u8; 16] = [
        0x4, 0xB, 0x7, 0x9, 0xF, 0x1, 0xD, 0x3, 0xC, 0x2, 0x6, 0xE, 0x8, 0x0, 0xA, 0x5,
    ];

    let mut mix_id = (u64::from(area_code) << 50)
        | (u64::from(hardware_model) << 47)
        | (u64::from(hollywood_id) << 15)
        | (u64::from(id_ctr) << 10);
    let copy1 = mix_id;

    for ctr in 0..=42u32 {
        if (mix_id >> (52 - ctr)) & 1 != 0 {
            mix_id ^= 0x635u64 << (42 - ctr);
        }
    }

    mix_id = (copy1 | (mix_id & 0xFFFF_FFFF)) ^ 0x0000_B3B3_B3B3_B3B3;
    mix_id = (mix_id >> 10) | ((mix_id & 0x3FF) << (11 + 32));

    for ctr in 0..=5 {
        let b = get_byte(mix_id, ctr);
        let sub = (TABLE1[usize::from(b >> 4)] << 4) | TABLE1[usize::from(b & 0xF)];
        mix_id = insert_byte(mix_id, ctr, sub);
    }

    let copy2 = mix_id;
    for ctr in 0..=5 {
        mix_id = insert_byte(mix_id, TABLE2[ctr as usize], get_byte(copy2, ctr));
    }

    mix_id &= 0x001F_FFFF_FFFF_FFFF;
    mix_id = (mix_id << 1) | ((mix_id >> 52) & 1);
    mix_id ^= 0x0000_5E5E_5E5E_5E5E;
    mix_id &= 0x001F_FFFF_FFFF_FFFF;

    let ret = if mix_id > 9_999_999_999_999_999 {
        wc24::ERR_FATAL
    } else {
        wc24::OK
    };
    (mix_id, ret)
}

pub struct NetKdRequest {
    info: DeviceInfo,
    config: Nwc24Config,
}

impl NetKdRequest {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            config: Nwc24Config::default(),
        }
    }

    pub fn nwc24_config(&self) -> &Nwc24Config {
        &self.config
    }

    fn request_generated_user_id(&mut self, ctx: &mut IpcContext, out: u32) {
        let status = match self.config.creation_stage {
            CreationStage::Initial => {
                let area = area_code(&ctx.config.area);
                let model = hardware_model(&ctx.config.model);
                let (id, ret) =
                    make_user_id(ctx.config.hollywood_id, self.config.id_gen, model, area);
                self.config.id = id;
                self.config.id_gen = self.config.id_gen.wrapping_add(1);
                self.config.creation_stage = CreationStage::Generated;
                info!("KD: generated user id {id:016} (area {area}, model {model})");
                ret
            }
            CreationStage::Generated => wc24::ERR_ID_GENERATED,
            CreationStage::Registered => wc24::ERR_ID_REGISTERED,
        };
        ctx.memory.write_u32(out, status as u32);
        ctx.memory.write_u64(out.wrapping_add(4), self.config.id);
        ctx.memory.write_u32(out.wrapping_add(0xc), self.config.creation_stage as u32);
    }
}

impl Device for NetKdRequest {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    fn ioctl(&mut self, ctx: &mut IpcContext, request: &IoctlRequest) -> IpcCommandResult {
        let out = request.buffer_out;
        match request.request {
            NWC24_SUSPEND_SCHEDULAR | NWC24_EXEC_RESUME_SCHEDULAR => {
                info!("KD: scheduler request {:#x} - NI", request.request);
                ctx.memory.write_u32(out, 0);
            }
            NWC24_STARTUP_SOCKET | NWC24_REQUEST_REGISTER_USER_ID => {
                info!("KD: request {:#x}", request.request);
                ctx.memory.write_u32(out, 0);
                ctx.memory.write_u32(out.wrapping_add(4), 0);
            }
            NWC24_REQUEST_GENERATED_USER_ID => self.request_generated_user_id(ctx, out),
            NWC24_EXEC_TRY_SUSPEND_SCHEDULAR
            | NWC24_CLEANUP_SOCKET
            | NWC24_LOCK_SOCKET
            | NWC24_UNLOCK_SOCKET
            | NWC24_GET_SCHEDULAR_STAT
            | NWC24_SAVE_MAIL_NOW
            | NWC24_REQUEST_SHUTDOWN => info!("KD: request {:#x} - NI", request.request),
            _ => request.log(self.name()),
        }
        ctx.default_reply(0)
    }

    fn save_state(&self) -> IpcResult<Value> {
        Ok(serde_json::to_value(&self.config)?)
    }

    fn load_state(&mut self, state: Value) -> IpcResult<()> {
        self.config = serde_json::from_value(state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_and_model_lookup() {
        assert_eq!(area_code("JPN"), 0);
        assert_eq!(area_code("AUS"), 2);
        assert_eq!(area_code("CHN"), 6);
        assert_eq!(area_code("XYZ"), AREA_UNKNOWN);
        assert_eq!(hardware_model("RVL"), 1);
        assert_eq!(hardware_model("RVD"), 2);
        assert_eq!(hardware_model("???"), MODEL_ELSE);
    }

    #[test]
    fn user_id_is_sixteen_digits_or_less() {
        let (id, ret) = make_user_id(0x0403_ac68, 0, MODEL_RVL, 1);
        assert!(id <= 0x001F_FFFF_FFFF_FFFF);
        assert_eq!(ret == wc24::OK, id <= 9_999_999_999_999_999);
        // counter feeds the id
        let (next, _) = make_user_id(0x0403_ac68, 1, MODEL_RVL, 1);
        assert_ne!(id, next);
        // same inputs, same id
        assert_eq!(make_user_id(0x0403_ac68, 0, MODEL_RVL, 1).0, id);
    }
}
