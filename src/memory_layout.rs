// CLASSIFICATION: COMMUNITY
// Filename: memory_layout.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Low-memory constants each IOS version leaves behind at boot.

use crate::error::{IpcError, IpcResult};
use crate::memory::GuestMemory;
use log::{error, info};

pub const MEM1_SIZE: u32 = 0x0180_0000;
pub const MEM1_END: u32 = 0x8180_0000;
pub const MEM1_ARENA_BEGIN: u32 = 0x0000_0000;
pub const MEM1_ARENA_END: u32 = 0x8180_0000;
pub const MEM2_SIZE: u32 = 0x0400_0000;
pub const MEM2_ARENA_BEGIN: u32 = 0x9000_0800;
pub const HOLLYWOOD_REVISION: u32 = 0x0000_0011;
pub const PLACEHOLDER: u32 = 0xDEAD_BEEF;
pub const RAM_VENDOR: u32 = 0x0000_FF01;
pub const RAM_VENDOR_MIOS: u32 = 0xCAFE_BABE;
pub const MIOS_NUMBER: u32 = 257;

/// Boundary values one IOS build expects to find in low memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IosMemoryValues {
    pub ios_number: u16,
    pub ios_version: u32,
    pub ios_date: u32,
    pub mem1_physical_size: u32,
    pub mem1_simulated_size: u32,
    pub mem1_end: u32,
    pub mem1_arena_begin: u32,
    pub mem1_arena_end: u32,
    pub mem2_physical_size: u32,
    pub mem2_simulated_size: u32,
    pub mem2_end: u32,
    pub mem2_arena_begin: u32,
    pub mem2_arena_end: u32,
    pub ipc_buffer_begin: u32,
    pub ipc_buffer_end: u32,
    pub hollywood_revision: u32,
    pub ram_vendor: u32,
    pub unknown_begin: u32,
    pub unknown_end: u32,
}

const fn ios(
    ios_number: u16,
    ios_version: u32,
    ios_date: u32,
    mem2_end: u32,
    ram_vendor: u32,
    unknown: (u32, u32),
) -> IosMemoryValues {
    IosMemoryValues {
        ios_number,
        ios_version,
        ios_date,
        mem1_physical_size: MEM1_SIZE,
        mem1_simulated_size: MEM1_SIZE,
        mem1_end: MEM1_END,
        mem1_arena_begin: MEM1_ARENA_BEGIN,
        mem1_arena_end: MEM1_ARENA_END,
        mem2_physical_size: MEM2_SIZE,
        mem2_simulated_size: MEM2_SIZE,
        mem2_end,
        mem2_arena_begin: MEM2_ARENA_BEGIN,
        mem2_arena_end: mem2_end - 0x2_0000,
        ipc_buffer_begin: mem2_end - 0x2_0000,
        ipc_buffer_end: mem2_end,
        hollywood_revision: HOLLYWOOD_REVISION,
        ram_vendor,
        unknown_begin: unknown.0,
        unknown_end: unknown.1,
    }
}

// Three MEM2 layouts cover every known IOS.
const OLD: u32 = 0x9340_0000;
const IOS28: u32 = 0x9380_0000;
const NEW: u32 = 0x9360_0000;
const NO_UNKNOWN: (u32, u32) = (PLACEHOLDER, PLACEHOLDER);
const NEW_UNKNOWN: (u32, u32) = (0x9360_0000, 0x9362_0000);
const DATE: u32 = 0x0003_0110;

pub static IOS_MEMORY_VALUES: [IosMemoryValues; 31] = [
    ios(9, 0x9040a, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(12, 0xc020e, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(13, 0xd0408, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(14, 0xe0408, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(15, 0xf0408, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(17, 0x110408, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(21, 0x15040f, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(22, 0x16050e, DATE, OLD, RAM_VENDOR, NO_UNKNOWN),
    ios(28, 0x1c070f, DATE, IOS28, RAM_VENDOR, (0x9380_0000, 0x9382_0000)),
    ios(31, 0x1f0e18, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(33, 0x210e18, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(34, 0x220e18, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(35, 0x230e18, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(36, 0x240e18, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(37, 0x25161f, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(38, 0x26101c, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(41, 0x290e17, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(43, 0x2b0e17, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(45, 0x2d0e17, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(46, 0x2e0e17, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(48, 0x30101c, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(53, 0x35161f, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(55, 0x37161f, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(56, 0x38161e, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(57, 0x39171f, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(58, 0x3a1820, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(59, 0x3b1c21, 0x0010_1811, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(61, 0x3d161e, DATE, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(62, 0x3e191e, 0x0002_2712, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(80, 0x501b20, 0x0003_0310, NEW, RAM_VENDOR, NEW_UNKNOWN),
    ios(257, 0x707, 0x0008_2209, NEW, RAM_VENDOR_MIOS, NO_UNKNOWN),
];

/// Entry for the IOS in the low 16 bits of `ios_title_id`.
pub fn lookup(ios_title_id: u64) -> Option<&'static IosMemoryValues> {
    let number = (ios_title_id & 0xffff) as u16;
    IOS_MEMORY_VALUES.iter().find(|v| v.ios_number == number)
}

/// Populate 0x3100..0x3164 the way the given IOS would before launching a title.
pub fn setup_memory(mem: &mut dyn GuestMemory, ios_title_id: u64) -> IpcResult<()> {
    let number = (ios_title_id & 0xffff) as u32;
    let Some(v) = lookup(ios_title_id) else {
        error!("IOS{number} is unknown; cannot set up low memory");
        return Err(IpcError::UnknownIosVersion(number));
    };

    let words = [
        (0x3100, v.mem1_physical_size),
        (0x3104, v.mem1_simulated_size),
        (0x3108, v.mem1_end),
        (0x310c, v.mem1_arena_begin),
        (0x3110, v.mem1_arena_end),
        (0x3114, PLACEHOLDER),
        (0x3118, v.mem2_physical_size),
        (0x311c, v.mem2_simulated_size),
        (0x3120, v.mem2_end),
        (0x3124, v.mem2_arena_begin),
        (0x3128, v.mem2_arena_end),
        (0x312c, PLACEHOLDER),
        (0x3130, v.ipc_buffer_begin),
        (0x3134, v.ipc_buffer_end),
        (0x3138, v.hollywood_revision),
        (0x313c, PLACEHOLDER),
        (0x3140, v.ios_version),
        (0x3144, v.ios_date),
        (0x3148, v.unknown_begin),
        (0x314c, v.unknown_end),
        (0x3150, PLACEHOLDER),
        (0x3154, PLACEHOLDER),
        (0x3158, v.ram_vendor),
    ];
    for (addr, value) in words {
        mem.write_u32(addr, value);
    }
    mem.write_u8(0x315c, 0xDE); // boot flag
    mem.write_u8(0x315d, 0xAD); // apploader flag
    mem.write_u16(0x315e, 0xBEEF);
    mem.write_u32(0x3160, 0);
    info!("low memory set up for IOS{number} (version {:#x})", v.ios_version);
    Ok(())
}
