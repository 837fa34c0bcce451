// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Guest-side helpers shared by the integration tests.
#![allow(dead_code)]

use ios_ipc::error::code;
use ios_ipc::{FlatMemory, GuestMemory, IpcConfig, Kernel, RecordingInterface};

pub const MEM_SIZE: usize = 0x2_0000;
/// Enough ticks for request latency plus the default reply delay.
pub const SETTLE_TICKS: u64 = 20_000;

pub const CMD_OPEN: u32 = 1;
pub const CMD_CLOSE: u32 = 2;
pub const CMD_READ: u32 = 3;
pub const CMD_WRITE: u32 = 4;
pub const CMD_SEEK: u32 = 5;
pub const CMD_IOCTL: u32 = 6;
pub const CMD_IOCTLV: u32 = 7;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A kernel on flat memory with an observable interface.
pub struct Guest {
    pub kernel: Kernel,
    pub iface: RecordingInterface,
}

impl Guest {
    pub fn with_config(config: IpcConfig) -> Self {
        init_logger();
        let iface = RecordingInterface::new();
        let kernel = Kernel::new(
            config,
            Box::new(FlatMemory::new(MEM_SIZE)),
            Box::new(iface.clone()),
        )
        .expect("standard device table registers");
        Self { kernel, iface }
    }

    pub fn deterministic() -> Self {
        Self::with_config(IpcConfig {
            want_determinism: true,
            nand_root: None,
            ..IpcConfig::default()
        })
    }

    pub fn networked() -> Self {
        Self::with_config(IpcConfig {
            want_determinism: false,
            wireless_mac: Some("00:17:ab:12:34:56".into()),
            nand_root: None,
            ..IpcConfig::default()
        })
    }

    pub fn mem(&mut self) -> &mut dyn GuestMemory {
        self.kernel.memory_mut()
    }

    pub fn submit(&mut self, record: u32) {
        self.kernel.enqueue_request(record);
    }

    pub fn run(&mut self, ticks: u64) {
        self.kernel.advance(ticks).expect("IPC traffic is valid");
    }

    pub fn settle(&mut self) {
        self.run(SETTLE_TICKS);
    }

    /// Poll host sockets, then let any replies they produced land.
    pub fn pump(&mut self) {
        self.kernel.update_devices().expect("device table lock");
        self.settle();
    }

    pub fn ret(&self, record: u32) -> i32 {
        self.kernel.memory().read_u32(record + 4) as i32
    }

    pub fn replies_to(&self, record: u32) -> usize {
        self.iface.replies().iter().filter(|a| **a == record).count()
    }

    fn header(&mut self, record: u32, command: u32, fd: u32) {
        let mem = self.mem();
        mem.fill(record, 0, 0x20);
        mem.write_u32(record, command);
        mem.write_u32(record + 8, fd);
    }

    /// Open `path` and run until the reply lands. The path string lives at
    /// `record + 0x40`.
    pub fn open(&mut self, record: u32, path: &str, flags: u32) -> i32 {
        self.header(record, CMD_OPEN, 0);
        let mem = self.mem();
        mem.write_cstring(record + 0x40, path);
        mem.write_u32(record + 0x0c, record + 0x40);
        mem.write_u32(record + 0x10, flags);
        self.submit(record);
        self.settle();
        self.ret(record)
    }

    pub fn close(&mut self, record: u32, fd: i32) -> i32 {
        self.header(record, CMD_CLOSE, fd as u32);
        self.submit(record);
        self.settle();
        self.ret(record)
    }

    pub fn read(&mut self, record: u32, fd: i32, buffer: u32, size: u32) -> i32 {
        self.header(record, CMD_READ, fd as u32);
        let mem = self.mem();
        mem.write_u32(record + 0x0c, buffer);
        mem.write_u32(record + 0x10, size);
        self.submit(record);
        self.settle();
        self.ret(record)
    }

    pub fn seek(&mut self, record: u32, fd: i32, offset: i32, mode: u32) -> i32 {
        self.header(record, CMD_SEEK, fd as u32);
        let mem = self.mem();
        mem.write_u32(record + 0x0c, offset as u32);
        mem.write_u32(record + 0x10, mode);
        self.submit(record);
        self.settle();
        self.ret(record)
    }

    /// Post an IOCtl without waiting for it.
    pub fn post_ioctl(&mut self, record: u32, fd: i32, request: u32, input: (u32, u32), output: (u32, u32)) {
        self.header(record, CMD_IOCTL, fd as u32);
        let mem = self.mem();
        mem.write_u32(record + 0x0c, request);
        mem.write_u32(record + 0x10, input.0);
        mem.write_u32(record + 0x14, input.1);
        mem.write_u32(record + 0x18, output.0);
        mem.write_u32(record + 0x1c, output.1);
        self.submit(record);
    }

    pub fn ioctl(&mut self, record: u32, fd: i32, request: u32, input: (u32, u32), output: (u32, u32)) -> i32 {
        self.post_ioctl(record, fd, request, input, output);
        self.settle();
        self.ret(record)
    }

    /// Post an IOCtlV without waiting for it. The vector table lives at
    /// `record + 0x40`.
    pub fn post_ioctlv(&mut self, record: u32, fd: i32, request: u32, ins: &[(u32, u32)], ios: &[(u32, u32)]) {
        self.header(record, CMD_IOCTLV, fd as u32);
        let table = record + 0x40;
        let mem = self.mem();
        mem.write_u32(record + 0x0c, request);
        mem.write_u32(record + 0x10, ins.len() as u32);
        mem.write_u32(record + 0x14, ios.len() as u32);
        mem.write_u32(record + 0x18, table);
        for (i, (addr, size)) in ins.iter().chain(ios).enumerate() {
            mem.write_u32(table + i as u32 * 8, *addr);
            mem.write_u32(table + i as u32 * 8 + 4, *size);
        }
        self.submit(record);
    }

    pub fn ioctlv(&mut self, record: u32, fd: i32, request: u32, ins: &[(u32, u32)], ios: &[(u32, u32)]) -> i32 {
        self.post_ioctlv(record, fd, request, ins, ios);
        self.settle();
        self.ret(record)
    }
}

/// Fresh scratch directory under the host temp dir.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("ios-ipc-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

pub fn is_success(rc: i32) -> bool {
    rc >= code::IPC_SUCCESS
}
