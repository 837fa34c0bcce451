// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! IOS IPC dispatcher.
//!
//! The guest posts request records; [`Kernel`] queues them, acknowledges and
//! executes one per tick, routes the command to the bound device, and writes
//! replies back in watermark order.

pub mod context;
pub mod fd_table;
pub mod request;
pub mod state;

use crate::config::{nand_relative, IpcConfig};
use crate::device::file_io::FileIo;
use crate::device::stub::StubDevice;
use crate::device::{lock, share, Device, DeviceInfo, DeviceRef, DeviceTable, IpcCommandResult};
use crate::error::{code, IpcError, IpcResult};
use crate::interface::IpcInterface;
use crate::memory::GuestMemory;
use crate::net::{ip_top::NetIpTop, kd::NetKdRequest, ncd::NetNcdManage, wd::NetWdCommand};
use crate::timing::IpcEvent;
use context::IpcContext;
use fd_table::{FdTable, IPC_MAX_FDS};
use log::{debug, info, warn};
use request::{
    IoctlRequest, IoctlvRequest, IpcCommand, OpenRequest, ReadWriteRequest, Request, SeekRequest,
};

/// Concurrent handles `/dev/es` allows.
pub const ES_MAX_COUNT: usize = 3;

/// Devices registered by [`Kernel::reinit`] that only answer with stubs.
const STUB_DEVICES_HEAD: &[&str] = &[
    "/dev/usb/oh1/57e/305",
    "/dev/stm/immediate",
    "/dev/stm/eventhook",
    "/dev/fs",
];

/// The IPC layer of one emulation session.
pub struct Kernel {
    ctx: IpcContext,
    devices: DeviceTable,
    fds: FdTable,
}

impl Kernel {
    /// Build a kernel with the standard device table registered.
    pub fn new(
        config: IpcConfig,
        memory: Box<dyn GuestMemory>,
        interface: Box<dyn IpcInterface>,
    ) -> IpcResult<Self> {
        let mut kernel = Self::empty(config, memory, interface);
        kernel.reinit()?;
        Ok(kernel)
    }

    /// Build a kernel with no devices registered.
    pub fn empty(
        config: IpcConfig,
        memory: Box<dyn GuestMemory>,
        interface: Box<dyn IpcInterface>,
    ) -> Self {
        Self {
            ctx: IpcContext::new(config, memory, interface),
            devices: DeviceTable::new(),
            fds: FdTable::new(),
        }
    }

    /// Register the standard device table in its fixed order.
    pub fn reinit(&mut self) -> IpcResult<()> {
        let t = &mut self.devices;
        for path in STUB_DEVICES_HEAD {
            t.add_device(path, StubDevice::new)?;
        }
        t.add_bounded("/dev/es", ES_MAX_COUNT, StubDevice::new)?;
        t.add_device("/dev/di", StubDevice::new)?;
        t.add_device("/dev/net/kd/request", NetKdRequest::new)?;
        t.add_device("/dev/net/kd/time", StubDevice::new)?;
        t.add_device("/dev/net/ncd/manage", NetNcdManage::new)?;
        t.add_device("/dev/net/wd/command", NetWdCommand::new)?;
        t.add_device("/dev/net/ip/top", NetIpTop::new)?;
        for path in [
            "/dev/net/ssl",
            "/dev/usb/kbd",
            "/dev/usb/ven",
            "/dev/sdio/slot0",
            "/dev/sdio/slot1",
            "/dev/usb/hid",
            "/dev/usb/oh1",
            "/dev/usb/wfssrv",
            "/dev/wfsi",
        ] {
            t.add_device(path, StubDevice::new)?;
        }
        info!("IPC: {} devices registered", t.len());
        Ok(())
    }

    pub fn context(&self) -> &IpcContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut IpcContext {
        &mut self.ctx
    }

    pub fn memory(&self) -> &dyn GuestMemory {
        &*self.ctx.memory
    }

    pub fn memory_mut(&mut self) -> &mut dyn GuestMemory {
        &mut *self.ctx.memory
    }

    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /// Register an extra device; ids continue after the standard table.
    pub fn add_device<D, F>(&mut self, path: &str, make: F) -> IpcResult<u32>
    where
        D: Device + 'static,
        F: FnOnce(DeviceInfo) -> D,
    {
        self.devices.add_device(path, make)
    }

    /// Device bound to descriptor `fd`.
    pub fn fd_device(&self, fd: u32) -> Option<DeviceRef> {
        self.fds.get(fd).cloned()
    }

    pub fn open_fds(&self) -> usize {
        self.fds.occupied()
    }

    /// The guest signalled a new request record at `address`.
    pub fn enqueue_request(&mut self, address: u32) {
        let latency = self.ctx.config.request_latency_ticks;
        self.ctx.timing.schedule(latency, IpcEvent::Request(address));
    }

    /// Run the scheduler forward `ticks`, firing every event that falls due.
    ///
    /// Ends with a periodic tick: whatever is still queued because the
    /// interface was busy drains while the interface stays ready.
    pub fn advance(&mut self, ticks: u64) -> IpcResult<()> {
        let target = self.ctx.timing.ticks().saturating_add(ticks);
        while let Some(event) = self.ctx.timing.pop_due(target) {
            self.ctx.enqueue_event(event);
            self.update()?;
        }
        self.ctx.timing.advance_to(target);
        self.periodic_update()
    }

    /// Drain queued items one [`Kernel::update`] at a time until the queues
    /// empty or the interface stops accepting.
    pub fn periodic_update(&mut self) -> IpcResult<()> {
        while self.ctx.interface_ready() && !self.ctx.queues.is_empty() {
            self.update()?;
        }
        Ok(())
    }

    /// Move at most one item through the queues: requests first, then
    /// replies, then acknowledgements.
    pub fn update(&mut self) -> IpcResult<()> {
        if !self.ctx.interface_ready() {
            return Ok(());
        }
        if let Some(address) = self.ctx.queues.requests.pop_front() {
            self.ctx.acknowledge(address);
            debug!("||-- Acknowledge IPC Request @ {address:#010x}");
            return self.execute_command(address);
        }
        self.ctx.deliver_one();
        Ok(())
    }

    /// Tick every open device.
    pub fn update_devices(&mut self) -> IpcResult<()> {
        if !self.ctx.timing.is_running() {
            return Ok(());
        }
        for device in self.devices.all()? {
            let mut dev = lock(&device);
            if dev.is_opened() {
                dev.update(&mut self.ctx);
            }
        }
        Ok(())
    }

    fn execute_command(&mut self, address: u32) -> IpcResult<()> {
        let request = Request::read(&*self.ctx.memory, address);
        let result = self.handle_command(request)?;
        if result.send_reply {
            let delay = self.ctx.ordered_reply_delay(result.reply_delay_ticks);
            self.ctx.enqueue_reply(&request, result.return_value, delay);
        }
        Ok(())
    }

    fn handle_command(&mut self, request: Request) -> IpcResult<IpcCommandResult> {
        let kind = request.kind()?;
        if kind == IpcCommand::Open {
            let open = OpenRequest::read(&*self.ctx.memory, request);
            let fd = self.open_device(&open)?;
            return Ok(self.ctx.default_reply(fd));
        }

        let Some(device) = self.fds.get(request.fd).cloned() else {
            warn!("IPC: command {kind:?} on invalid fd {}", request.fd);
            return Ok(self.ctx.default_reply(code::IPC_EINVAL));
        };
        let mut dev = lock(&device);
        let mem = &*self.ctx.memory;
        let result = match kind {
            IpcCommand::Close => {
                self.fds.take(request.fd);
                dev.close(&mut self.ctx, request.fd);
                self.ctx.default_reply(code::IPC_SUCCESS)
            }
            IpcCommand::Read => {
                let rw = ReadWriteRequest::read(mem, request);
                dev.read(&mut self.ctx, &rw)
            }
            IpcCommand::Write => {
                let rw = ReadWriteRequest::read(mem, request);
                dev.write(&mut self.ctx, &rw)
            }
            IpcCommand::Seek => {
                let seek = SeekRequest::read(mem, request);
                dev.seek(&mut self.ctx, &seek)
            }
            IpcCommand::Ioctl => {
                let ioctl = IoctlRequest::read(mem, request);
                dev.ioctl(&mut self.ctx, &ioctl)
            }
            IpcCommand::Ioctlv => match IoctlvRequest::read(mem, request) {
                Some(ioctlv) => dev.ioctlv(&mut self.ctx, &ioctlv),
                None => {
                    warn!("IPC: ioctlv @ {:#010x} has too many vectors", request.address);
                    self.ctx.default_reply(code::IPC_EINVAL)
                }
            },
            IpcCommand::Open | IpcCommand::Reply => {
                return Err(IpcError::InvalidCommand {
                    command: request.command,
                    address: request.address,
                })
            }
        };
        Ok(result)
    }

    /// Resolve `request.path`, bind a descriptor and open the device.
    ///
    /// Returns the new descriptor or a negative guest code.
    pub fn open_device(&mut self, request: &OpenRequest) -> IpcResult<i32> {
        let Some(fd) = self.fds.free_slot() else {
            warn!("IPC: no free descriptor for {}", request.path);
            return Ok(code::FS_EFDEXHAUSTED);
        };

        let path = request.path.as_str();
        let device = if let Some(ids) = self.devices.bounded_ids(path) {
            let mut free = None;
            for id in ids {
                if let Some(d) = self.devices.access_by_id(*id)? {
                    if !self.fds.references(&d) {
                        free = Some(d);
                        break;
                    }
                }
            }
            match free {
                Some(d) => d,
                None => {
                    warn!("IPC: all {path} handles in use");
                    return Ok(code::IPC_EESEXHAUSTED);
                }
            }
        } else if path.starts_with("/dev/") {
            match self.devices.get_by_name(path)? {
                Some(d) => d,
                None => {
                    warn!("IPC: unknown device {path}");
                    return Ok(code::IPC_ENOENT);
                }
            }
        } else if path.starts_with('/') {
            if nand_relative(path).is_none() {
                warn!("IPC: {path} escapes the NAND root");
                return Ok(code::IPC_ENOENT);
            }
            share(FileIo::new(DeviceInfo::new(fd as u32, path)))
        } else {
            warn!("IPC: invalid path {path:?}");
            return Ok(code::IPC_ENOENT);
        };

        let rc = lock(&device).open(&mut self.ctx, request);
        if rc < code::IPC_SUCCESS {
            return Ok(rc);
        }
        info!("IPC: opened {path} as fd {fd}");
        self.fds.bind(fd, device);
        Ok(fd as i32)
    }

    /// Tear down every open descriptor and drop all IPC traffic.
    ///
    /// A hard reset also empties the device table; call [`Kernel::reinit`]
    /// before using the kernel again.
    pub fn reset(&mut self, hard: bool) -> IpcResult<()> {
        for fd in 0..IPC_MAX_FDS as u32 {
            if let Some(device) = self.fds.take(fd) {
                lock(&device).close(&mut self.ctx, fd);
            }
        }
        // Cancellation replies are already in guest memory; their
        // notifications go with everything else.
        self.ctx.timing.remove_all();
        self.ctx.queues.clear();
        self.ctx.last_reply_time = 0;
        if hard {
            self.devices.clear()?;
        }
        Ok(())
    }
}
