// CLASSIFICATION: COMMUNITY
// Filename: file_io.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Per-handle NAND file backed by a host directory.
//!
//! Unlike table devices a `FileIo` belongs to exactly one descriptor slot and
//! is rebuilt from [`FileIoState`] when a savestate is loaded.

use super::{Device, DeviceInfo, DeviceType, IpcCommandResult};
use crate::error::{code, IpcResult};
use crate::ipc::context::IpcContext;
use crate::ipc::request::{OpenRequest, ReadWriteRequest, SeekRequest};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

pub const MODE_READ: u32 = 1;
pub const MODE_WRITE: u32 = 2;
pub const MODE_RW: u32 = MODE_READ | MODE_WRITE;

pub const SEEK_SET: u32 = 0;
pub const SEEK_CUR: u32 = 1;
pub const SEEK_END: u32 = 2;

/// What a savestate keeps for an open file handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIoState {
    pub path: String,
    pub mode: u32,
    pub position: u32,
}

pub struct FileIo {
    info: DeviceInfo,
    mode: u32,
    position: u32,
    file: Option<File>,
}

impl FileIo {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            mode: 0,
            position: 0,
            file: None,
        }
    }

    pub fn state(&self) -> FileIoState {
        FileIoState {
            path: self.info.name.clone(),
            mode: self.mode,
            position: self.position,
        }
    }

    /// Rebuild a handle from a savestate entry.
    pub fn restore(ctx: &IpcContext, id: u32, state: &FileIoState) -> Self {
        let mut dev = Self::new(DeviceInfo::new(id, &state.path));
        dev.mode = state.mode;
        dev.position = state.position;
        if dev.open_host(ctx, state.mode) == code::IPC_SUCCESS {
            dev.info.opened = true;
        } else {
            warn!("{}: backing file vanished across savestate", state.path);
        }
        dev
    }

    fn open_host(&mut self, ctx: &IpcContext, mode: u32) -> i32 {
        let Some(path) = ctx.config.nand_path(&self.info.name) else {
            return code::FS_ENOENT;
        };
        let file = OpenOptions::new()
            .read(mode & MODE_READ != 0)
            .write(mode & MODE_WRITE != 0)
            .open(&path);
        match file {
            Ok(f) => {
                self.file = Some(f);
                code::IPC_SUCCESS
            }
            Err(e) => {
                debug!("{}: {e}", path.display());
                code::FS_ENOENT
            }
        }
    }

    fn size(&self) -> u32 {
        self.file
            .as_ref()
            .and_then(|f| f.metadata().ok())
            .map(|m| m.len() as u32)
            .unwrap_or(0)
    }
}

impl Device for FileIo {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::FileIo
    }

    fn open(&mut self, ctx: &mut IpcContext, request: &OpenRequest) -> i32 {
        let mode = request.flags & MODE_RW;
        if mode == 0 {
            return code::FS_EINVAL;
        }
        let rc = self.open_host(ctx, mode);
        if rc == code::IPC_SUCCESS {
            info!("FileIO: open {} mode {mode}", self.info.name);
            self.mode = mode;
            self.position = 0;
            self.info.opened = true;
        }
        rc
    }

    fn close(&mut self, _ctx: &mut IpcContext, _fd: u32) -> i32 {
        self.file = None;
        self.info.opened = false;
        code::IPC_SUCCESS
    }

    fn read(&mut self, ctx: &mut IpcContext, request: &ReadWriteRequest) -> IpcCommandResult {
        if self.mode & MODE_READ == 0 {
            return ctx.default_reply(code::FS_EACCESS);
        }
        let Some(file) = self.file.as_mut() else {
            return ctx.default_reply(code::FS_ENOENT);
        };
        let mut buf = vec![0u8; ctx.memory.span(request.buffer, request.size)];
        let result = file
            .seek(SeekFrom::Start(self.position as u64))
            .and_then(|_| file.read(&mut buf));
        match result {
            Ok(n) => {
                ctx.memory.write_bytes(request.buffer, &buf[..n]);
                self.position += n as u32;
                ctx.default_reply(n as i32)
            }
            Err(e) => {
                warn!("FileIO: read {}: {e}", self.info.name);
                ctx.default_reply(code::FS_EACCESS)
            }
        }
    }

    fn write(&mut self, ctx: &mut IpcContext, request: &ReadWriteRequest) -> IpcCommandResult {
        if self.mode & MODE_WRITE == 0 {
            return ctx.default_reply(code::FS_EACCESS);
        }
        let Some(file) = self.file.as_mut() else {
            return ctx.default_reply(code::FS_ENOENT);
        };
        let len = ctx.memory.span(request.buffer, request.size);
        let data = ctx.memory.read_vec(request.buffer, len);
        let result = file
            .seek(SeekFrom::Start(self.position as u64))
            .and_then(|_| file.write_all(&data));
        match result {
            Ok(()) => {
                self.position += data.len() as u32;
                ctx.default_reply(data.len() as i32)
            }
            Err(e) => {
                warn!("FileIO: write {}: {e}", self.info.name);
                ctx.default_reply(code::FS_EACCESS)
            }
        }
    }

    fn seek(&mut self, ctx: &mut IpcContext, request: &SeekRequest) -> IpcCommandResult {
        let size = self.size() as i64;
        let offset = request.offset as i32 as i64;
        let target = match request.mode {
            SEEK_SET => offset,
            SEEK_CUR => self.position as i64 + offset,
            SEEK_END => size + offset,
            _ => return ctx.default_reply(code::FS_EINVAL),
        };
        if !(0..=size).contains(&target) {
            return ctx.default_reply(code::FS_EINVAL);
        }
        self.position = target as u32;
        ctx.default_reply(target as i32)
    }

    fn save_state(&self) -> IpcResult<Value> {
        Ok(serde_json::to_value(self.state())?)
    }
}
