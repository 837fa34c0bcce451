// CLASSIFICATION: COMMUNITY
// Filename: request.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Decoding of IPC request records from guest memory.

use crate::error::{IpcError, IpcResult};
use crate::memory::GuestMemory;
use log::debug;

/// Command word at offset 0 of a request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum IpcCommand {
    Open = 1,
    Close = 2,
    Read = 3,
    Write = 4,
    Seek = 5,
    Ioctl = 6,
    Ioctlv = 7,
    Reply = 8,
}

impl IpcCommand {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Open,
            2 => Self::Close,
            3 => Self::Read,
            4 => Self::Write,
            5 => Self::Seek,
            6 => Self::Ioctl,
            7 => Self::Ioctlv,
            8 => Self::Reply,
            _ => return None,
        })
    }
}

pub const OFFSET_COMMAND: u32 = 0x00;
pub const OFFSET_RETURN: u32 = 0x04;
pub const OFFSET_FD: u32 = 0x08;
const OFFSET_ARG0: u32 = 0x0c;
const OFFSET_ARG1: u32 = 0x10;
const OFFSET_ARG2: u32 = 0x14;
const OFFSET_ARG3: u32 = 0x18;
const OFFSET_ARG4: u32 = 0x1c;

/// Longest path accepted by Open.
pub const MAX_PATH_LEN: usize = 64;

/// Upper bound on `in_count + io_count` of an IOCtlV record.
pub const MAX_IOCTLV_VECTORS: u32 = 32;

/// Header shared by every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub address: u32,
    pub command: u32,
    pub fd: u32,
}

impl Request {
    pub fn read(mem: &dyn GuestMemory, address: u32) -> Self {
        Self {
            address,
            command: mem.read_u32(address.wrapping_add(OFFSET_COMMAND)),
            fd: mem.read_u32(address.wrapping_add(OFFSET_FD)),
        }
    }

    pub fn kind(&self) -> IpcResult<IpcCommand> {
        IpcCommand::from_u32(self.command).ok_or(IpcError::InvalidCommand {
            command: self.command,
            address: self.address,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub base: Request,
    pub path: String,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWriteRequest {
    pub base: Request,
    pub buffer: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    pub base: Request,
    pub offset: u32,
    pub mode: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoctlRequest {
    pub base: Request,
    pub request: u32,
    pub buffer_in: u32,
    pub buffer_in_size: u32,
    pub buffer_out: u32,
    pub buffer_out_size: u32,
}

/// One `(address, size)` entry of an IOCtlV vector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoVector {
    pub address: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoctlvRequest {
    pub base: Request,
    pub request: u32,
    pub in_vectors: Vec<IoVector>,
    pub io_vectors: Vec<IoVector>,
}

impl OpenRequest {
    pub fn read(mem: &dyn GuestMemory, base: Request) -> Self {
        let path_ptr = mem.read_u32(base.address.wrapping_add(OFFSET_ARG0));
        Self {
            base,
            path: mem.read_cstring(path_ptr, MAX_PATH_LEN),
            flags: mem.read_u32(base.address.wrapping_add(OFFSET_ARG1)),
        }
    }
}

impl ReadWriteRequest {
    pub fn read(mem: &dyn GuestMemory, base: Request) -> Self {
        Self {
            base,
            buffer: mem.read_u32(base.address.wrapping_add(OFFSET_ARG0)),
            size: mem.read_u32(base.address.wrapping_add(OFFSET_ARG1)),
        }
    }
}

impl SeekRequest {
    pub fn read(mem: &dyn GuestMemory, base: Request) -> Self {
        Self {
            base,
            offset: mem.read_u32(base.address.wrapping_add(OFFSET_ARG0)),
            mode: mem.read_u32(base.address.wrapping_add(OFFSET_ARG1)),
        }
    }
}

impl IoctlRequest {
    pub fn read(mem: &dyn GuestMemory, base: Request) -> Self {
        Self {
            base,
            request: mem.read_u32(base.address.wrapping_add(OFFSET_ARG0)),
            buffer_in: mem.read_u32(base.address.wrapping_add(OFFSET_ARG1)),
            buffer_in_size: mem.read_u32(base.address.wrapping_add(OFFSET_ARG2)),
            buffer_out: mem.read_u32(base.address.wrapping_add(OFFSET_ARG3)),
            buffer_out_size: mem.read_u32(base.address.wrapping_add(OFFSET_ARG4)),
        }
    }

    pub fn log(&self, device: &str) {
        debug!(
            "{device}: ioctl {:#x} in {:#010x}/{:#x} out {:#010x}/{:#x}",
            self.request, self.buffer_in, self.buffer_in_size, self.buffer_out, self.buffer_out_size
        );
    }
}

impl IoctlvRequest {
    /// Decode the record and its vector table.
    ///
    /// Returns `None` when the vector counts exceed [`MAX_IOCTLV_VECTORS`].
    pub fn read(mem: &dyn GuestMemory, base: Request) -> Option<Self> {
        let request = mem.read_u32(base.address.wrapping_add(OFFSET_ARG0));
        let in_count = mem.read_u32(base.address.wrapping_add(OFFSET_ARG1));
        let io_count = mem.read_u32(base.address.wrapping_add(OFFSET_ARG2));
        let table = mem.read_u32(base.address.wrapping_add(OFFSET_ARG3));
        let total = in_count.checked_add(io_count)?;
        if total > MAX_IOCTLV_VECTORS {
            return None;
        }
        let mut vectors = (0..total).map(|i| {
            let entry = table.wrapping_add(i * 8);
            IoVector {
                address: mem.read_u32(entry),
                size: mem.read_u32(entry.wrapping_add(4)),
            }
        });
        let in_vectors = vectors.by_ref().take(in_count as usize).collect();
        let io_vectors = vectors.collect();
        Some(Self {
            base,
            request,
            in_vectors,
            io_vectors,
        })
    }

    /// Input vector `i`, or an empty vector when the guest sent fewer.
    pub fn input(&self, i: usize) -> IoVector {
        self.in_vectors.get(i).copied().unwrap_or_default()
    }

    /// Output vector `i`, or an empty vector when the guest sent fewer.
    pub fn output(&self, i: usize) -> IoVector {
        self.io_vectors.get(i).copied().unwrap_or_default()
    }

    pub fn dump(&self, device: &str) {
        debug!(
            "{device}: ioctlv {:#x} in {:?} io {:?}",
            self.request, self.in_vectors, self.io_vectors
        );
    }
}
