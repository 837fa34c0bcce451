// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v1.1
// Date Modified: 2027-08-13
// Author: Lukas Bower

//! High-level emulation of the IOS inter-processor communication layer.
//!
//! The guest posts request records into shared memory; [`ipc::Kernel`]
//! routes them to virtual devices and writes replies back in order. Network
//! devices forward socket calls to non-blocking host sockets.

/// Runtime configuration
pub mod config;

/// Virtual devices and the device table
pub mod device;

/// Guest return codes and host errors
pub mod error;

/// Hollywood IPC register interface
pub mod interface;

/// Dispatcher, descriptor table and savestate
pub mod ipc;

/// Guest memory access
pub mod memory;

/// Per-IOS low-memory constants
pub mod memory_layout;

/// Network devices and the socket bridge
pub mod net;

/// Tick scheduler
pub mod timing;

/// Utilities and common helpers used across modules
pub mod utils;

pub use config::IpcConfig;
pub use error::{IpcError, IpcResult};
pub use interface::{IpcInterface, RecordingInterface, Signal};
pub use ipc::Kernel;
pub use memory::{FlatMemory, GuestMemory};
