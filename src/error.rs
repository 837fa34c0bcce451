// CLASSIFICATION: COMMUNITY
// Filename: error.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Guest return codes and host-side error types.
//!
//! Anything the guest can observe is an `i32` written into the reply record;
//! [`IpcError`] is reserved for failures the emulator itself has to handle.

use thiserror::Error;

/// Return codes written into the reply slot of an IPC record.
pub mod code {
    pub const IPC_SUCCESS: i32 = 0;
    pub const IPC_EACCES: i32 = -1;
    pub const IPC_EEXIST: i32 = -2;
    pub const IPC_EINVAL: i32 = -4;
    pub const IPC_ENOENT: i32 = -6;
    pub const IPC_EQUEUEFULL: i32 = -8;
    pub const FS_EINVAL: i32 = -101;
    pub const FS_EACCESS: i32 = -102;
    pub const FS_ENOENT: i32 = -106;
    /// No free slot in the 24-entry descriptor table.
    pub const FS_EFDEXHAUSTED: i32 = -109;
    /// Every handle of a handle-bounded device is in use.
    pub const IPC_EESEXHAUSTED: i32 = -1016;
}

/// Errors raised to the embedding emulator.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("invalid IPC command {command:#x} in record at {address:#010x}")]
    InvalidCommand { command: u32, address: u32 },
    #[error("no memory layout known for IOS{0}")]
    UnknownIosVersion(u32),
    #[error("device table lock poisoned")]
    LockPoisoned,
    #[error("savestate: {0}")]
    State(String),
    #[error("savestate encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("config parse: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type IpcResult<T> = Result<T, IpcError>;
