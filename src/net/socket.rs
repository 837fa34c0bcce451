// CLASSIFICATION: COMMUNITY
// Filename: socket.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Guest socket table backed by non-blocking host sockets.
//!
//! Guest calls that would block become [`PendingOp`] records. `update` polls
//! the host with a zero timeout once per frame and completes whatever became
//! ready through the ordinary IPC reply path.

use super::errno::{is_would_block, last_errno, so, translate_errno};
use super::icmp;
use super::translate::{
    from_native_sockaddr, guest_to_native_events, native_to_guest_revents, read_sockaddr,
    to_native_sockaddr, write_sockaddr, GuestPollFlags,
};
use crate::ipc::context::IpcContext;
use crate::ipc::request::{IoctlRequest, IoctlvRequest, Request};
use crate::memory::GuestMemory;
use libc::{c_int, c_void, pollfd, socklen_t};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::RawFd;

/// Guest handles are allocated from `0..WII_SOCKET_MAX`.
pub const WII_SOCKET_MAX: i32 = 64;

pub const WII_F_GETFL: u32 = 3;
pub const WII_F_SETFL: u32 = 4;
pub const WII_O_NONBLOCK: u32 = 4;

pub const SO_MSG_OOB: u32 = 0x01;
pub const SO_MSG_PEEK: u32 = 0x02;
pub const SO_MSG_NONBLOCK: u32 = 0x04;

/// Size of one guest pollfd entry: fd, events, revents.
pub const POLL_ENTRY_SIZE: u32 = 0xc;

#[cfg(target_os = "linux")]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: c_int = 0;

/// Socket calls that may complete later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOp {
    Accept,
    Bind,
    Connect,
    Fcntl,
    SendTo,
    RecvFrom,
    IcmpEcho,
}

impl SocketOp {
    fn name(self) -> &'static str {
        match self {
            Self::Accept => "SO_ACCEPT",
            Self::Bind => "SO_BIND",
            Self::Connect => "SO_CONNECT",
            Self::Fcntl => "SO_FCNTL",
            Self::SendTo => "SO_SENDTO",
            Self::RecvFrom => "SO_RECVFROM",
            Self::IcmpEcho => "SO_ICMPPING",
        }
    }

    /// Host readiness that lets the call make progress.
    fn wait_events(self) -> libc::c_short {
        match self {
            Self::Accept | Self::RecvFrom | Self::IcmpEcho => libc::POLLIN,
            Self::Connect | Self::SendTo | Self::Bind | Self::Fcntl => libc::POLLOUT,
        }
    }
}

/// The guest request a socket call answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketRequest {
    Ioctl(IoctlRequest),
    Ioctlv(IoctlvRequest),
}

impl SocketRequest {
    pub fn base(&self) -> &Request {
        match self {
            Self::Ioctl(r) => &r.base,
            Self::Ioctlv(r) => &r.base,
        }
    }
}

/// A blocking-class call parked until its socket is ready.
#[derive(Debug, Clone)]
pub struct PendingOp {
    pub op: SocketOp,
    pub request: SocketRequest,
    /// Tick after which the call fails with a timeout.
    pub deadline: Option<u64>,
}

/// A guest poll that found nothing ready and has not yet timed out.
#[derive(Debug, Clone)]
struct PendingPoll {
    request: IoctlRequest,
    deadline: Option<u64>,
}

#[derive(Debug)]
struct GuestSocket {
    host_fd: RawFd,
    /// Guest-visible O_NONBLOCK; the host side is always non-blocking.
    nonblock: bool,
    pending: Option<PendingOp>,
}

// === SocketManager Struct ===

/// Translation table from guest socket handles to host descriptors.
#[derive(Debug, Default)]
pub struct SocketManager {
    sockets: BTreeMap<i32, GuestSocket>,
    polls: Vec<PendingPoll>,
    last_error: i32,
}

impl SocketManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error of the most recent failed socket call, as a guest code.
    pub fn last_net_error(&self) -> i32 {
        self.last_error
    }

    pub fn set_last_net_error(&mut self, error: i32) {
        self.last_error = error;
    }

    /// Translate a host return value, recording failures as the last error.
    ///
    /// Must run before anything else can clobber the host errno.
    pub fn get_net_error_code(&mut self, ret: i32, caller: &str, is_rw: bool) -> i32 {
        if ret >= 0 {
            self.last_error = so::SO_SUCCESS;
            return ret;
        }
        let code = translate_errno(last_errno(), caller, is_rw);
        self.last_error = code;
        code
    }

    /// Host descriptor behind a guest handle.
    pub fn host_fd(&self, fd: i32) -> Option<RawFd> {
        self.sockets.get(&fd).map(|s| s.host_fd)
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    pub fn has_pending(&self, fd: i32) -> bool {
        self.sockets.get(&fd).is_some_and(|s| s.pending.is_some())
    }

    pub fn pending_polls(&self) -> usize {
        self.polls.len()
    }

    fn add_socket(&mut self, host_fd: RawFd) -> i32 {
        let Some(fd) = (0..WII_SOCKET_MAX).find(|h| !self.sockets.contains_key(h)) else {
            warn!("guest socket table full, closing host fd {host_fd}");
            // SAFETY: host_fd was just returned by socket()/accept() and is owned here.
            unsafe { libc::close(host_fd) };
            return -so::SO_EMFILE;
        };
        if set_host_nonblocking(host_fd).is_err() {
            warn!("could not make host fd {host_fd} non-blocking");
        }
        self.sockets.insert(
            fd,
            GuestSocket {
                host_fd,
                nonblock: false,
                pending: None,
            },
        );
        fd
    }

    /// Create a host socket and return its guest handle.
    pub fn new_socket(&mut self, family: c_int, ty: c_int, protocol: c_int) -> i32 {
        // SAFETY: plain socket(2) call with integer arguments.
        let host_fd = unsafe { libc::socket(family, ty, protocol) };
        let ret = self.get_net_error_code(host_fd, "SO_SOCKET", false);
        if ret < 0 {
            return ret;
        }
        let fd = self.add_socket(host_fd);
        info!("socket({family}, {ty}, {protocol}) = guest {fd} host {host_fd}");
        fd
    }

    /// Close a guest socket, resolving whatever was waiting on it.
    pub fn delete_socket(&mut self, ctx: &mut IpcContext, fd: i32) -> i32 {
        let Some(sock) = self.sockets.remove(&fd) else {
            return -so::SO_EBADF;
        };
        if let Some(pending) = sock.pending {
            debug!("{}: cancelled by close of {fd}", pending.op.name());
            ctx.enqueue_reply(pending.request.base(), -so::SO_ECANCELED, 0);
        }
        // SAFETY: the descriptor was owned by the removed entry.
        let ret = unsafe { libc::close(sock.host_fd) };
        self.get_net_error_code(ret, "SO_CLOSE", false)
    }

    /// Run or park a blocking-class call.
    ///
    /// Returns the result when the call completed at once; `None` means it
    /// was parked and [`SocketManager::update`] will reply later.
    pub fn do_sock(
        &mut self,
        ctx: &mut IpcContext,
        fd: i32,
        op: SocketOp,
        request: SocketRequest,
    ) -> Option<i32> {
        let Some(sock) = self.sockets.get(&fd) else {
            warn!("{}: unknown guest socket {fd}", op.name());
            return Some(-so::SO_EBADF);
        };
        let (host_fd, nonblock, busy) = (sock.host_fd, sock.nonblock, sock.pending.is_some());

        if op == SocketOp::Fcntl {
            let rc = match &request {
                SocketRequest::Ioctl(r) => self.fcntl(&*ctx.memory, fd, r),
                SocketRequest::Ioctlv(_) => -so::SO_EINVAL,
            };
            return Some(rc);
        }
        if busy {
            warn!("{}: guest socket {fd} already has a call in flight", op.name());
            return Some(-so::SO_EALREADY);
        }

        let force_nonblock = match &request {
            SocketRequest::Ioctlv(r) => msg_flags(&*ctx.memory, op, r) & SO_MSG_NONBLOCK != 0,
            SocketRequest::Ioctl(_) => false,
        };
        let rc = self.attempt(&mut *ctx.memory, host_fd, op, &request, false);
        let rc = self.finish_accept(op, rc);
        if is_would_block(rc) && !nonblock && !force_nonblock {
            debug!("{}: guest socket {fd} deferred", op.name());
            if let Some(sock) = self.sockets.get_mut(&fd) {
                sock.pending = Some(PendingOp {
                    op,
                    request,
                    deadline: None,
                });
            }
            return None;
        }
        Some(rc)
    }

    /// Send an echo request on an ICMP socket and park until a reply
    /// arrives or `timeout_ms` passes.
    ///
    /// Returns the error when the request could not be sent.
    pub fn icmp_ping(
        &mut self,
        ctx: &mut IpcContext,
        fd: i32,
        dest: Ipv4Addr,
        data: &[u8],
        timeout_ms: u64,
        request: IoctlvRequest,
    ) -> Option<i32> {
        let (host_fd, busy) = match self.sockets.get(&fd) {
            Some(sock) => (sock.host_fd, sock.pending.is_some()),
            None => return Some(-so::SO_EBADF),
        };
        if busy {
            return Some(-so::SO_EALREADY);
        }
        let packet = icmp::echo_request(data);
        let sa = to_native_sockaddr(&SocketAddrV4::new(dest, 0));
        // SAFETY: packet outlives the call; sa is a valid sockaddr_in.
        let ret = unsafe {
            libc::sendto(
                host_fd,
                packet.as_ptr() as *const c_void,
                packet.len(),
                SEND_FLAGS,
                &sa as *const _ as *const libc::sockaddr,
                sockaddr_len(),
            )
        };
        let rc = self.get_net_error_code(ret as i32, "SO_ICMPPING", true);
        if rc as usize != packet.len() {
            warn!("SO_ICMPPING: echo request to {dest} failed ({rc})");
            return Some(if rc < 0 { rc } else { -so::SO_EMSGSIZE });
        }
        let deadline = ctx.timing.ticks() + ctx.config.ms_to_ticks(timeout_ms);
        if let Some(sock) = self.sockets.get_mut(&fd) {
            sock.pending = Some(PendingOp {
                op: SocketOp::IcmpEcho,
                request: SocketRequest::Ioctlv(request),
                deadline: Some(deadline),
            });
        }
        None
    }

    fn fcntl(&mut self, mem: &dyn GuestMemory, fd: i32, request: &IoctlRequest) -> i32 {
        let cmd = mem.read_u32(request.buffer_in.wrapping_add(4));
        let arg = mem.read_u32(request.buffer_in.wrapping_add(8));
        let Some(sock) = self.sockets.get_mut(&fd) else {
            return -so::SO_EBADF;
        };
        match cmd {
            WII_F_GETFL => {
                if sock.nonblock {
                    WII_O_NONBLOCK as i32
                } else {
                    0
                }
            }
            WII_F_SETFL => {
                sock.nonblock = arg & WII_O_NONBLOCK != 0;
                0
            }
            _ => {
                warn!("SO_FCNTL: unknown command {cmd} on guest socket {fd}");
                0
            }
        }
    }

    /// Register the host descriptor a successful accept produced.
    fn finish_accept(&mut self, op: SocketOp, rc: i32) -> i32 {
        if op == SocketOp::Accept && rc >= 0 {
            self.add_socket(rc)
        } else {
            rc
        }
    }

    /// Issue the host call once. For `Accept` a non-negative result is the
    /// new host descriptor.
    fn attempt(
        &mut self,
        mem: &mut dyn GuestMemory,
        host_fd: RawFd,
        op: SocketOp,
        request: &SocketRequest,
        retry: bool,
    ) -> i32 {
        match (op, request) {
            (SocketOp::Accept, SocketRequest::Ioctl(r)) => {
                // SAFETY: zeroed sockaddr_in is valid; len matches its size.
                let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
                let mut len = std::mem::size_of::<libc::sockaddr_in>() as socklen_t;
                let ret = unsafe {
                    libc::accept(host_fd, &mut sa as *mut _ as *mut libc::sockaddr, &mut len)
                };
                let rc = self.get_net_error_code(ret, op.name(), true);
                if rc >= 0 && r.buffer_out_size > 0 {
                    write_sockaddr(mem, r.buffer_out, &from_native_sockaddr(&sa));
                }
                rc
            }
            (SocketOp::Bind, SocketRequest::Ioctl(r)) => {
                let sa = to_native_sockaddr(&read_sockaddr(mem, r.buffer_in.wrapping_add(8)));
                // SAFETY: sa is a valid sockaddr_in for the given length.
                let ret = unsafe {
                    libc::bind(host_fd, &sa as *const _ as *const libc::sockaddr, sockaddr_len())
                };
                self.get_net_error_code(ret, op.name(), false)
            }
            (SocketOp::Connect, SocketRequest::Ioctl(r)) => {
                if retry {
                    return self.connect_result(host_fd);
                }
                let sa = to_native_sockaddr(&read_sockaddr(mem, r.buffer_in.wrapping_add(8)));
                // SAFETY: sa is a valid sockaddr_in for the given length.
                let ret = unsafe {
                    libc::connect(host_fd, &sa as *const _ as *const libc::sockaddr, sockaddr_len())
                };
                self.get_net_error_code(ret, op.name(), false)
            }
            (SocketOp::SendTo, SocketRequest::Ioctlv(r)) => {
                let data = r.input(0);
                let params = r.input(1).address;
                let flags = (mem.read_u32(params.wrapping_add(4)) & SO_MSG_OOB) as c_int;
                let has_dest = mem.read_u32(params.wrapping_add(8)) != 0;
                let payload = mem.read_vec(data.address, mem.span(data.address, data.size));
                let dest = to_native_sockaddr(&read_sockaddr(mem, params.wrapping_add(0x0c)));
                // SAFETY: payload outlives the call; dest is valid when passed.
                let ret = unsafe {
                    if has_dest {
                        libc::sendto(
                            host_fd,
                            payload.as_ptr() as *const c_void,
                            payload.len(),
                            flags | SEND_FLAGS,
                            &dest as *const _ as *const libc::sockaddr,
                            sockaddr_len(),
                        )
                    } else {
                        libc::send(
                            host_fd,
                            payload.as_ptr() as *const c_void,
                            payload.len(),
                            flags | SEND_FLAGS,
                        )
                    }
                };
                let caller = if has_dest { "SO_SENDTO" } else { "SO_SEND" };
                self.get_net_error_code(ret as i32, caller, true)
            }
            (SocketOp::RecvFrom, SocketRequest::Ioctlv(r)) => {
                let flags = (mem.read_u32(r.input(0).address.wrapping_add(4)) & (SO_MSG_PEEK | SO_MSG_OOB)) as c_int;
                let data = r.output(0);
                let from = r.output(1);
                let mut buf = vec![0u8; mem.span(data.address, data.size)];
                // SAFETY: zeroed sockaddr_in is valid; len matches its size.
                let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
                let mut len = sockaddr_len();
                let ret = unsafe {
                    if from.size > 0 {
                        libc::recvfrom(
                            host_fd,
                            buf.as_mut_ptr() as *mut c_void,
                            buf.len(),
                            flags,
                            &mut sa as *mut _ as *mut libc::sockaddr,
                            &mut len,
                        )
                    } else {
                        libc::recv(host_fd, buf.as_mut_ptr() as *mut c_void, buf.len(), flags)
                    }
                };
                let caller = if from.size > 0 { "SO_RECVFROM" } else { "SO_RECV" };
                let rc = self.get_net_error_code(ret as i32, caller, true);
                if rc >= 0 {
                    mem.write_bytes(data.address, &buf[..rc as usize]);
                    if from.size > 0 {
                        write_sockaddr(mem, from.address, &from_native_sockaddr(&sa));
                    }
                }
                rc
            }
            (SocketOp::IcmpEcho, SocketRequest::Ioctlv(_)) => {
                let mut buf = [0u8; 0x100];
                // SAFETY: buf is valid for its length.
                let ret = unsafe {
                    libc::recv(host_fd, buf.as_mut_ptr() as *mut c_void, buf.len(), 0)
                };
                let rc = self.get_net_error_code(ret as i32, op.name(), true);
                if rc >= 0 {
                    0
                } else {
                    rc
                }
            }
            (op, _) => {
                warn!("{}: request has the wrong shape", op.name());
                -so::SO_EINVAL
            }
        }
    }

    /// Outcome of a non-blocking connect that the host reported ready.
    fn connect_result(&mut self, host_fd: RawFd) -> i32 {
        let mut err: c_int = 0;
        let mut len = std::mem::size_of::<c_int>() as socklen_t;
        // SAFETY: err/len describe a valid c_int buffer.
        let ret = unsafe {
            libc::getsockopt(
                host_fd,
                libc::SOL_SOCKET,
                libc::SO_ERROR,
                &mut err as *mut _ as *mut c_void,
                &mut len,
            )
        };
        if ret < 0 {
            return self.get_net_error_code(ret, "SO_CONNECT", false);
        }
        if err == 0 {
            self.last_error = so::SO_SUCCESS;
            return 0;
        }
        let code = translate_errno(err, "SO_CONNECT", false);
        self.last_error = code;
        code
    }

    /// Guest POLL. Replies now when something is ready or the timeout is
    /// zero, otherwise parks until readiness or the deadline.
    pub fn poll(&mut self, ctx: &mut IpcContext, request: IoctlRequest) -> Option<i32> {
        let timeout = ctx.memory.read_u32(request.buffer_in.wrapping_add(4)) as i32;
        let ready = self.poll_once(&mut *ctx.memory, &request);
        if ready != 0 || timeout == 0 {
            return Some(ready);
        }
        let deadline = (timeout > 0)
            .then(|| ctx.timing.ticks() + ctx.config.ms_to_ticks(timeout as u64));
        debug!("SO_POLL: parked, timeout {timeout} ms");
        self.polls.push(PendingPoll { request, deadline });
        None
    }

    /// One zero-timeout host poll over the guest pollfd array.
    fn poll_once(&mut self, mem: &mut dyn GuestMemory, request: &IoctlRequest) -> i32 {
        let unknown = mem.read_u32(request.buffer_in);
        let nfds = mem.span(request.buffer_out, request.buffer_out_size) as u32 / POLL_ENTRY_SIZE;
        if nfds == 0 {
            warn!("SO_POLL: empty descriptor list");
        }
        let mut ufds = Vec::with_capacity(nfds as usize);
        let mut invalid = Vec::with_capacity(nfds as usize);
        for i in 0..nfds {
            let entry = request.buffer_out.wrapping_add(POLL_ENTRY_SIZE.wrapping_mul(i));
            let guest_fd = mem.read_u32(entry) as i32;
            let events = mem.read_u32(entry.wrapping_add(4));
            let (native, unhandled) = guest_to_native_events(events);
            if unhandled != 0 {
                warn!("SO_POLL: unhandled guest event bits {unhandled:#06x}");
            }
            let host_fd = self.host_fd(guest_fd);
            invalid.push(host_fd.is_none());
            debug!("SO_POLL({i}) fd {guest_fd} unknown {unknown:#x} events {events:#x} native {native:#x}");
            ufds.push(pollfd {
                fd: host_fd.unwrap_or(-1),
                events: native,
                revents: 0,
            });
        }

        // SAFETY: ufds is a valid array of nfds pollfd entries.
        let ret = unsafe { libc::poll(ufds.as_mut_ptr(), ufds.len() as libc::nfds_t, 0) };
        let mut ready = self.get_net_error_code(ret, "SO_POLL", false);

        for (i, (ufd, bad)) in ufds.iter().zip(&invalid).enumerate() {
            let mut revents = native_to_guest_revents(ufd.revents);
            if *bad {
                revents |= GuestPollFlags::NVAL;
                if ready >= 0 {
                    ready += 1;
                }
            }
            mem.write_u32(
                request.buffer_out
                    .wrapping_add(POLL_ENTRY_SIZE.wrapping_mul(i as u32))
                    .wrapping_add(8),
                revents.bits(),
            );
        }
        ready
    }

    /// Resolve every parked call the host now reports ready. Never blocks.
    pub fn update(&mut self, ctx: &mut IpcContext) {
        let now = ctx.timing.ticks();
        let waiting: Vec<(i32, RawFd, libc::c_short)> = self
            .sockets
            .iter()
            .filter_map(|(fd, s)| s.pending.as_ref().map(|p| (*fd, s.host_fd, p.op.wait_events())))
            .collect();

        if !waiting.is_empty() {
            let mut ufds: Vec<pollfd> = waiting
                .iter()
                .map(|&(_, host_fd, events)| pollfd {
                    fd: host_fd,
                    events,
                    revents: 0,
                })
                .collect();
            // SAFETY: ufds is a valid pollfd array.
            let ret = unsafe { libc::poll(ufds.as_mut_ptr(), ufds.len() as libc::nfds_t, 0) };
            if ret < 0 {
                let code = self.get_net_error_code(ret, "Update", false);
                warn!("socket update poll failed: {code}");
            }
            for (&(fd, host_fd, _), ufd) in waiting.iter().zip(&ufds) {
                self.resolve(ctx, fd, host_fd, ufd.revents, now);
            }
        }

        let polls = std::mem::take(&mut self.polls);
        for parked in polls {
            let ready = self.poll_once(&mut *ctx.memory, &parked.request);
            let expired = parked.deadline.is_some_and(|d| now >= d);
            if ready != 0 || expired {
                ctx.enqueue_reply(&parked.request.base, ready, 0);
            } else {
                self.polls.push(parked);
            }
        }
    }

    fn resolve(&mut self, ctx: &mut IpcContext, fd: i32, host_fd: RawFd, revents: libc::c_short, now: u64) {
        let Some(pending) = self.sockets.get(&fd).and_then(|s| s.pending.clone()) else {
            return;
        };
        let rc = if revents != 0 {
            let rc = self.attempt(&mut *ctx.memory, host_fd, pending.op, &pending.request, true);
            self.finish_accept(pending.op, rc)
        } else if pending.deadline.is_some_and(|d| now >= d) {
            -so::SO_ETIMEDOUT
        } else {
            return;
        };
        if is_would_block(rc) && pending.op != SocketOp::Connect {
            if pending.deadline.is_some_and(|d| now >= d) {
                self.complete(ctx, fd, -so::SO_ETIMEDOUT);
            }
            return;
        }
        self.complete(ctx, fd, rc);
    }

    fn complete(&mut self, ctx: &mut IpcContext, fd: i32, rc: i32) {
        let Some(pending) = self.sockets.get_mut(&fd).and_then(|s| s.pending.take()) else {
            return;
        };
        debug!("{}: guest socket {fd} completed with {rc}", pending.op.name());
        ctx.enqueue_reply(pending.request.base(), rc, 0);
    }

    /// Close every socket, cancelling parked calls and polls.
    pub fn clean(&mut self, ctx: &mut IpcContext) {
        for parked in std::mem::take(&mut self.polls) {
            ctx.enqueue_reply(&parked.request.base, -so::SO_ECANCELED, 0);
        }
        let fds: Vec<i32> = self.sockets.keys().copied().collect();
        for fd in fds {
            self.delete_socket(ctx, fd);
        }
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        for sock in self.sockets.values() {
            // SAFETY: descriptors in the table are owned by it.
            unsafe { libc::close(sock.host_fd) };
        }
    }
}

fn sockaddr_len() -> socklen_t {
    std::mem::size_of::<libc::sockaddr_in>() as socklen_t
}

fn set_host_nonblocking(fd: RawFd) -> std::io::Result<()> {
    // SAFETY: fcntl on a descriptor we own.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Message flags of a send/recv vector request.
fn msg_flags(mem: &dyn GuestMemory, op: SocketOp, r: &IoctlvRequest) -> u32 {
    match op {
        SocketOp::SendTo => mem.read_u32(r.input(1).address.wrapping_add(4)),
        SocketOp::RecvFrom => mem.read_u32(r.input(0).address.wrapping_add(4)),
        _ => 0,
    }
}
