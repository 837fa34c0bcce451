// CLASSIFICATION: COMMUNITY
// Filename: ip_top.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! `/dev/net/ip/top`: the guest socket API.
//!
//! Connection-class calls go through [`SocketManager::do_sock`] and reply
//! when the host socket is ready. Everything else answers immediately.

use super::errno::so;
use super::icmp::{default_echo_data, ICMP_DATA_LEN};
use super::socket::{SocketManager, SocketOp, SocketRequest};
use super::translate::{
    family_to_native, opt_level_to_native, opt_name_to_native, protocol_to_native,
    type_to_native, WII_AF_INET, WII_IPPROTO_TCP, WII_SO_ERROR,
};
use super::{get_mac_address, MacAddress};
use crate::device::{Device, DeviceInfo, IpcCommandResult};
use crate::error::{code, IpcResult};
use crate::ipc::context::IpcContext;
use crate::ipc::request::{IoctlRequest, IoctlvRequest, OpenRequest};
use crate::memory::GuestMemory;
use libc::{c_int, c_void, socklen_t};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::{CStr, CString};
use std::net::{Ipv4Addr, ToSocketAddrs};

/// IOCtl codes.
pub mod ioctl {
    pub const SO_ACCEPT: u32 = 1;
    pub const SO_BIND: u32 = 2;
    pub const SO_CLOSE: u32 = 3;
    pub const SO_CONNECT: u32 = 4;
    pub const SO_FCNTL: u32 = 5;
    pub const SO_GETPEERNAME: u32 = 6;
    pub const SO_GETSOCKNAME: u32 = 7;
    pub const SO_GETSOCKOPT: u32 = 8;
    pub const SO_SETSOCKOPT: u32 = 9;
    pub const SO_LISTEN: u32 = 0x0A;
    pub const SO_POLL: u32 = 0x0B;
    pub const SO_SHUTDOWN: u32 = 0x0E;
    pub const SO_SOCKET: u32 = 0x0F;
    pub const SO_GETHOSTID: u32 = 0x10;
    pub const SO_GETHOSTBYNAME: u32 = 0x11;
    pub const SO_GETHOSTBYADDR: u32 = 0x12;
    pub const SO_GETNAMEINFO: u32 = 0x13;
    pub const SO_INETATON: u32 = 0x15;
    pub const SO_INETPTON: u32 = 0x16;
    pub const SO_INETNTOP: u32 = 0x17;
    pub const SO_SOCKATMARK: u32 = 0x19;
    pub const SO_SETINTERFACEOPT: u32 = 0x1D;
    pub const SO_SETINTERFACE: u32 = 0x1E;
    pub const SO_STARTUP: u32 = 0x1F;
    pub const SO_ICMPSOCKET: u32 = 0x30;
    pub const SO_ICMPCANCEL: u32 = 0x32;
    pub const SO_ICMPCLOSE: u32 = 0x33;
}

/// IOCtlV codes.
pub mod ioctlv {
    pub const SO_RECVFROM: u32 = 0x0C;
    pub const SO_SENDTO: u32 = 0x0D;
    pub const SO_GETADDRINFO: u32 = 0x18;
    pub const SO_GETINTERFACEOPT: u32 = 0x1C;
    pub const SO_ICMPPING: u32 = 0x31;
}

const GETHOSTBYNAME_BUFFER_SIZE: u32 = 0x460;
const GETHOSTBYNAME_STRUCT_SIZE: u32 = 0x10;
const GETHOSTBYNAME_IP_LIST_OFFSET: u32 = 0x110;
const GETHOSTBYNAME_IP_PTR_LIST_OFFSET: u32 = 0x340;
const GETHOSTBYNAME_MAX_ADDRESSES: usize = 71;

const ADDRINFO_SIZE: u32 = 0x20;
const ADDRINFO_SOCKADDR_OFFSET: u32 = 0x460;
const ADDRINFO_SOCKADDR_SIZE: u32 = 0x1C;
const EAI_HOST_NOT_FOUND: i32 = -305;

/// `sockaddr.sa_data` length: port, address, padding.
const SA_DATA_LEN: usize = 14;

/// Longest host name accepted from the guest.
const MAX_HOSTNAME_LEN: usize = 0x100;

/// Fixed interface values reported to the guest.
const DNS_PRIMARY: u32 = 0x0808_0808;
const DNS_SECONDARY: u32 = 0x0808_0404;
const INTERFACE_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 30);
const INTERFACE_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
const INTERFACE_BROADCAST: Ipv4Addr = Ipv4Addr::new(10, 0, 255, 255);

pub struct NetIpTop {
    info: DeviceInfo,
    sockets: SocketManager,
    handles: u32,
    mac: Option<MacAddress>,
}

/// Host sockets do not survive a savestate; only the handle count does.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IpTopState {
    handles: u32,
}

impl NetIpTop {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            sockets: SocketManager::new(),
            handles: 0,
            mac: None,
        }
    }

    pub fn sockets(&self) -> &SocketManager {
        &self.sockets
    }

    fn mac(&mut self, ctx: &IpcContext) -> MacAddress {
        *self.mac.get_or_insert_with(|| get_mac_address(&ctx.config))
    }

    fn shutdown(&mut self, mem: &dyn GuestMemory, request: &IoctlRequest) -> i32 {
        let fd = mem.read_u32(request.buffer_in) as i32;
        let how = mem.read_u32(request.buffer_in.wrapping_add(4)) as c_int;
        let Some(host_fd) = self.sockets.host_fd(fd) else {
            return -so::SO_EBADF;
        };
        // SAFETY: host_fd belongs to the socket table.
        let ret = unsafe { libc::shutdown(host_fd, how) };
        self.sockets.get_net_error_code(ret, "SO_SHUTDOWN", false)
    }

    fn listen(&mut self, mem: &dyn GuestMemory, request: &IoctlRequest) -> i32 {
        let fd = mem.read_u32(request.buffer_in) as i32;
        let backlog = mem.read_u32(request.buffer_in.wrapping_add(4)) as c_int;
        let Some(host_fd) = self.sockets.host_fd(fd) else {
            return -so::SO_EBADF;
        };
        // SAFETY: host_fd belongs to the socket table.
        let ret = unsafe { libc::listen(host_fd, backlog) };
        self.sockets.get_net_error_code(ret, "SO_LISTEN", false)
    }

    fn getsockopt(&mut self, mem: &mut dyn GuestMemory, request: &IoctlRequest) -> i32 {
        let out = request.buffer_out;
        let fd = mem.read_u32(out) as i32;
        let level = mem.read_u32(out.wrapping_add(4));
        let optname = mem.read_u32(out.wrapping_add(8));
        let Some(host_fd) = self.sockets.host_fd(fd) else {
            return -so::SO_EBADF;
        };

        let mut optval = [0u8; 20];
        let mut optlen: socklen_t = 4;
        // SAFETY: optval has room for optlen bytes.
        let ret = unsafe {
            libc::getsockopt(
                host_fd,
                opt_level_to_native(level),
                opt_name_to_native(level, optname),
                optval.as_mut_ptr() as *mut c_void,
                &mut optlen,
            )
        };
        let rc = self.sockets.get_net_error_code(ret, "SO_GETSOCKOPT", false);
        let optlen = (optlen as usize).min(optval.len());
        mem.write_u32(out.wrapping_add(0xc), optlen as u32);
        mem.write_bytes(out.wrapping_add(0x10), &optval[..optlen]);

        if optname == WII_SO_ERROR {
            mem.write_u32(out.wrapping_add(0xc), 4);
            mem.write_u32(out.wrapping_add(0x10), self.sockets.last_net_error() as u32);
        }
        rc
    }

    fn setsockopt(&mut self, mem: &dyn GuestMemory, request: &IoctlRequest) -> i32 {
        let input = request.buffer_in;
        let fd = mem.read_u32(input) as i32;
        let level = mem.read_u32(input.wrapping_add(4));
        let optname = mem.read_u32(input.wrapping_add(8));
        let optlen = mem.read_u32(input.wrapping_add(0xc)).min(20);
        let optval = mem.read_vec(input.wrapping_add(0x10), optlen as usize);
        info!("SO_SETSOCKOPT({fd}, {level:#x}, {optname:#x}, {optlen}) {optval:02x?}");

        // TCP tuning knobs the host has no equivalent for.
        if level == WII_IPPROTO_TCP && (optname == 0x2005 || optname == 0x2001) {
            return 0;
        }
        let Some(host_fd) = self.sockets.host_fd(fd) else {
            return -so::SO_EBADF;
        };
        // SAFETY: optval holds optlen bytes.
        let ret = unsafe {
            libc::setsockopt(
                host_fd,
                opt_level_to_native(level),
                opt_name_to_native(level, optname),
                optval.as_ptr() as *const c_void,
                optlen as socklen_t,
            )
        };
        self.sockets.get_net_error_code(ret, "SO_SETSOCKOPT", false)
    }

    /// GETSOCKNAME and GETPEERNAME share a truncating output layout.
    fn socket_name(&mut self, mem: &mut dyn GuestMemory, request: &IoctlRequest, peer: bool) -> i32 {
        let fd = mem.read_u32(request.buffer_in) as i32;
        let caller = if peer { "SO_GETPEERNAME" } else { "SO_GETSOCKNAME" };
        let Some(host_fd) = self.sockets.host_fd(fd) else {
            return -so::SO_EBADF;
        };
        // SAFETY: zeroed sockaddr_in is valid; len matches its size.
        let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_in>() as socklen_t;
        let sa_ptr = &mut sa as *mut _ as *mut libc::sockaddr;
        let ret = unsafe {
            if peer {
                libc::getpeername(host_fd, sa_ptr, &mut len)
            } else {
                libc::getsockname(host_fd, sa_ptr, &mut len)
            }
        };
        let rc = self.sockets.get_net_error_code(ret, caller, false);

        let size = request.buffer_out_size;
        if (size as usize) < 2 + SA_DATA_LEN {
            warn!("{caller}: output buffer is too small, truncating");
        }
        let mut sa_data = [0u8; SA_DATA_LEN];
        sa_data[..2].copy_from_slice(&u16::from_be(sa.sin_port).to_be_bytes());
        sa_data[2..6].copy_from_slice(&u32::from_be(sa.sin_addr.s_addr).to_be_bytes());
        if size > 0 {
            mem.write_u8(request.buffer_out, size as u8);
        }
        if size > 1 {
            mem.write_u8(request.buffer_out.wrapping_add(1), WII_AF_INET as u8);
        }
        if size > 2 {
            let n = SA_DATA_LEN.min(size as usize - 2);
            mem.write_bytes(request.buffer_out.wrapping_add(2), &sa_data[..n]);
        }
        rc
    }

    fn gethostbyname(&mut self, mem: &mut dyn GuestMemory, request: &IoctlRequest) -> i32 {
        if request.buffer_out_size != GETHOSTBYNAME_BUFFER_SIZE {
            error!("SO_GETHOSTBYNAME: bad buffer size {:#x}", request.buffer_out_size);
            return -1;
        }
        let hostname = mem.read_cstring(request.buffer_in, MAX_HOSTNAME_LEN);
        let addrs = resolve_ipv4(&hostname);
        info!("SO_GETHOSTBYNAME({hostname}) = {addrs:?}");
        if addrs.is_empty() {
            return -1;
        }
        if hostname.len() + 1 > (GETHOSTBYNAME_IP_LIST_OFFSET - GETHOSTBYNAME_STRUCT_SIZE) as usize {
            error!("SO_GETHOSTBYNAME: host name too long");
            return -1;
        }

        let out = request.buffer_out;
        mem.write_cstring(out.wrapping_add(GETHOSTBYNAME_STRUCT_SIZE), &hostname);
        mem.write_u32(out, out.wrapping_add(GETHOSTBYNAME_STRUCT_SIZE));

        let count = addrs.len().min(GETHOSTBYNAME_MAX_ADDRESSES);
        for (i, ip) in addrs.iter().take(count).enumerate() {
            let slot = out.wrapping_add(GETHOSTBYNAME_IP_LIST_OFFSET + i as u32 * 4);
            mem.write_u32(slot, u32::from(*ip));
            mem.write_u32(out.wrapping_add(GETHOSTBYNAME_IP_PTR_LIST_OFFSET + i as u32 * 4), slot);
        }
        let terminator = out.wrapping_add(GETHOSTBYNAME_IP_PTR_LIST_OFFSET + count as u32 * 4);
        mem.write_u32(terminator, 0);
        // Aliases: an empty list sharing the terminator.
        mem.write_u32(out.wrapping_add(4), terminator);
        mem.write_u16(out.wrapping_add(8), WII_AF_INET as u16);
        mem.write_u16(out.wrapping_add(10), 4);
        mem.write_u32(out.wrapping_add(12), out.wrapping_add(GETHOSTBYNAME_IP_PTR_LIST_OFFSET));
        0
    }

    fn poll(&mut self, ctx: &mut IpcContext, request: &IoctlRequest) -> IpcCommandResult {
        match self.sockets.poll(ctx, *request) {
            Some(rc) => ctx.default_reply(rc),
            None => IpcCommandResult::no_reply(),
        }
    }

    fn get_interface_opt(&mut self, ctx: &mut IpcContext, request: &IoctlvRequest) -> i32 {
        let param = ctx.memory.read_u32(request.input(0).address.wrapping_add(4));
        let out0 = request.output(0).address;
        let out1 = request.output(1).address;
        info!("SO_GETINTERFACEOPT({param:#06x})");
        match param {
            // DNS servers
            0xb003 => {
                ctx.memory.write_u32(out0, DNS_PRIMARY);
                ctx.memory.write_u32(out0.wrapping_add(4), DNS_SECONDARY);
            }
            0x1003 => ctx.memory.write_u32(out0, 0),
            0x1004 => {
                let mac = self.mac(ctx);
                ctx.memory.write_bytes(out0, &mac);
            }
            0x1005 | 0x4002 => ctx.memory.write_u32(out0, 1),
            // Interface address, netmask, broadcast
            0x4003 => {
                ctx.memory.write_u32(out1, 0xc);
                ctx.memory.write_u32(out0, u32::from(INTERFACE_ADDRESS));
                ctx.memory.write_u32(out0.wrapping_add(4), u32::from(INTERFACE_NETMASK));
                ctx.memory.write_u32(out0.wrapping_add(8), u32::from(INTERFACE_BROADCAST));
            }
            _ => error!("SO_GETINTERFACEOPT: unknown option {param:#x}"),
        }
        0
    }

    fn getaddrinfo(&mut self, mem: &mut dyn GuestMemory, request: &IoctlvRequest) -> i32 {
        let node = guest_string(mem, request, 0);
        let service = guest_string(mem, request, 1);
        let hints_vec = request.input(2);
        // SAFETY: zeroed addrinfo is a valid "no hints" value.
        let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
        let use_hints = request.in_vectors.len() > 2 && hints_vec.size > 0;
        if use_hints {
            let h = hints_vec.address;
            hints.ai_flags = mem.read_u32(h) as c_int;
            hints.ai_family = family_to_native(mem.read_u32(h.wrapping_add(4)));
            hints.ai_socktype = type_to_native(mem.read_u32(h.wrapping_add(8)));
            hints.ai_protocol = protocol_to_native(mem.read_u32(h.wrapping_add(0xc)));
        }
        info!("SO_GETADDRINFO({node:?}, {service:?})");

        let node_c = node.as_deref().map(CString::new).transpose();
        let service_c = service.as_deref().map(CString::new).transpose();
        let (Ok(node_c), Ok(service_c)) = (node_c, service_c) else {
            return EAI_HOST_NOT_FOUND;
        };
        let mut result: *mut libc::addrinfo = std::ptr::null_mut();
        // SAFETY: the C strings and hints live across the call; result is
        // freed below.
        let ret = unsafe {
            libc::getaddrinfo(
                node_c.as_ref().map_or(std::ptr::null(), |c| c.as_ptr()),
                service_c.as_ref().map_or(std::ptr::null(), |c| c.as_ptr()),
                if use_hints { &hints as *const libc::addrinfo } else { std::ptr::null() },
                &mut result,
            )
        };
        if ret != 0 {
            return EAI_HOST_NOT_FOUND;
        }

        let mut entries = Vec::new();
        let mut cursor = result;
        while !cursor.is_null() {
            // SAFETY: cursor walks the list getaddrinfo returned.
            let ai = unsafe { &*cursor };
            if ai.ai_family == libc::AF_INET && !ai.ai_addr.is_null() {
                // SAFETY: AF_INET entries carry a sockaddr_in.
                let sa = unsafe { *(ai.ai_addr as *const libc::sockaddr_in) };
                entries.push((ai.ai_flags, ai.ai_socktype, ai.ai_protocol, ai.ai_addrlen, sa));
            }
            cursor = ai.ai_next;
        }
        // SAFETY: result came from getaddrinfo and is not used afterwards.
        unsafe { libc::freeaddrinfo(result) };
        if entries.is_empty() {
            return EAI_HOST_NOT_FOUND;
        }

        let base = request.output(0).address;
        let mut sock_offset = base.wrapping_add(ADDRINFO_SOCKADDR_OFFSET);
        for (i, (flags, socktype, protocol, addrlen, sa)) in entries.iter().enumerate() {
            let addr = base + i as u32 * ADDRINFO_SIZE;
            mem.write_u32(addr, *flags as u32);
            mem.write_u32(addr.wrapping_add(4), WII_AF_INET);
            mem.write_u32(addr.wrapping_add(8), *socktype as u32);
            mem.write_u32(addr.wrapping_add(0xc), *protocol as u32);
            mem.write_u32(addr.wrapping_add(0x10), *addrlen);
            mem.write_u32(addr.wrapping_add(0x14), 0);
            mem.write_u32(addr.wrapping_add(0x18), sock_offset);
            mem.write_u16(sock_offset, ((WII_AF_INET as u16) << 8) | (*addrlen as u16 & 0xff));
            mem.write_u16(sock_offset.wrapping_add(2), u16::from_be(sa.sin_port));
            mem.write_u32(sock_offset.wrapping_add(4), u32::from_be(sa.sin_addr.s_addr));
            mem.fill(sock_offset.wrapping_add(8), 0, SA_DATA_LEN - 6);
            sock_offset += ADDRINFO_SOCKADDR_SIZE;
            let next = if i + 1 < entries.len() { addr.wrapping_add(ADDRINFO_SIZE) } else { 0 };
            mem.write_u32(addr.wrapping_add(0x1c), next);
        }
        request.dump(self.name());
        0
    }

    fn icmp_ping(&mut self, ctx: &mut IpcContext, request: &IoctlvRequest) -> IpcCommandResult {
        let params = request.input(0).address;
        let mem = &*ctx.memory;
        let fd = mem.read_u32(params) as i32;
        let num_ip = mem.read_u32(params.wrapping_add(4));
        let timeout_ms = mem.read_u64(params.wrapping_add(8));
        let length = mem.read_u8(params.wrapping_add(16));
        let family = mem.read_u8(params.wrapping_add(17));
        let icmp_id = mem.read_u16(params.wrapping_add(18));
        let ip = Ipv4Addr::from(mem.read_u32(params.wrapping_add(20)));
        if num_ip != 1 {
            info!("SO_ICMPPING: {num_ip} addresses, using the first");
        }
        if length != 8 || u32::from(family) != WII_AF_INET {
            info!("SO_ICMPPING: unusual address info, length {length:#x} family {family:#x}");
        }
        let data = match request.in_vectors.get(1) {
            Some(v) if v.size as usize == ICMP_DATA_LEN => mem.read_vec(v.address, ICMP_DATA_LEN),
            _ => default_echo_data(icmp_id),
        };
        info!("SO_ICMPPING({fd}) {ip} timeout {timeout_ms} ms");
        sock_result(self.sockets.icmp_ping(ctx, fd, ip, &data, timeout_ms, request.clone()))
    }
}

impl Device for NetIpTop {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    fn open(&mut self, _ctx: &mut IpcContext, _request: &OpenRequest) -> i32 {
        self.handles += 1;
        self.info.opened = true;
        code::IPC_SUCCESS
    }

    fn close(&mut self, ctx: &mut IpcContext, _fd: u32) -> i32 {
        self.handles = self.handles.saturating_sub(1);
        if self.handles == 0 {
            self.sockets.clean(ctx);
            self.info.opened = false;
        }
        code::IPC_SUCCESS
    }

    fn ioctl(&mut self, ctx: &mut IpcContext, request: &IoctlRequest) -> IpcCommandResult {
        if ctx.config.want_determinism {
            return ctx.default_reply(code::IPC_EACCES);
        }
        let input = request.buffer_in;
        let rc = match request.request {
            ioctl::SO_STARTUP => {
                request.log(self.name());
                0
            }
            ioctl::SO_SOCKET => {
                let mem = &*ctx.memory;
                let (af, ty, proto) = (mem.read_u32(input), mem.read_u32(input.wrapping_add(4)), mem.read_u32(input.wrapping_add(8)));
                let fd = self.sockets.new_socket(
                    family_to_native(af),
                    type_to_native(ty),
                    protocol_to_native(proto),
                );
                info!("SO_SOCKET({af}, {ty}, {proto}) = {fd}");
                fd
            }
            ioctl::SO_ICMPSOCKET => {
                let pf = ctx.memory.read_u32(input);
                let fd = self
                    .sockets
                    .new_socket(family_to_native(pf), libc::SOCK_RAW, libc::IPPROTO_ICMP);
                info!("SO_ICMPSOCKET({pf:#x}) = {fd}");
                fd
            }
            ioctl::SO_CLOSE | ioctl::SO_ICMPCLOSE => {
                let fd = ctx.memory.read_u32(input) as i32;
                let rc = self.sockets.delete_socket(ctx, fd);
                info!("SO_CLOSE({fd}) = {rc}");
                rc
            }
            ioctl::SO_ACCEPT | ioctl::SO_BIND | ioctl::SO_CONNECT | ioctl::SO_FCNTL => {
                let fd = ctx.memory.read_u32(input) as i32;
                let op = match request.request {
                    ioctl::SO_ACCEPT => SocketOp::Accept,
                    ioctl::SO_BIND => SocketOp::Bind,
                    ioctl::SO_CONNECT => SocketOp::Connect,
                    _ => SocketOp::Fcntl,
                };
                let rc = self.sockets.do_sock(ctx, fd, op, SocketRequest::Ioctl(*request));
                return sock_result(rc);
            }
            ioctl::SO_SHUTDOWN => self.shutdown(&*ctx.memory, request),
            ioctl::SO_LISTEN => self.listen(&*ctx.memory, request),
            ioctl::SO_GETSOCKOPT => self.getsockopt(&mut *ctx.memory, request),
            ioctl::SO_SETSOCKOPT => self.setsockopt(&*ctx.memory, request),
            ioctl::SO_GETSOCKNAME => self.socket_name(&mut *ctx.memory, request, false),
            ioctl::SO_GETPEERNAME => self.socket_name(&mut *ctx.memory, request, true),
            ioctl::SO_GETHOSTID => u32::from(ctx.config.host_id) as i32,
            ioctl::SO_INETATON => {
                let hostname = ctx.memory.read_cstring(input, MAX_HOSTNAME_LEN);
                match resolve_ipv4(&hostname).first() {
                    Some(ip) => {
                        ctx.memory.write_u32(request.buffer_out, u32::from(*ip));
                        info!("SO_INETATON({hostname}) = {ip}");
                        1
                    }
                    None => {
                        info!("SO_INETATON({hostname}): no address found");
                        0
                    }
                }
            }
            ioctl::SO_INETPTON => {
                let text = ctx.memory.read_cstring(input, MAX_HOSTNAME_LEN);
                info!("SO_INETPTON({text})");
                match inet_pton(&text) {
                    Some(octets) => {
                        ctx.memory.write_bytes(request.buffer_out.wrapping_add(4), &octets);
                        1
                    }
                    None => 0,
                }
            }
            ioctl::SO_INETNTOP => {
                let octets = ctx.memory.read_vec(input.wrapping_add(8), 4);
                let text = format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]);
                info!("SO_INETNTOP {text}");
                ctx.memory.write_bytes(request.buffer_out, text.as_bytes());
                0
            }
            ioctl::SO_POLL => return self.poll(ctx, request),
            ioctl::SO_GETHOSTBYNAME => self.gethostbyname(&mut *ctx.memory, request),
            ioctl::SO_ICMPCANCEL => {
                error!("SO_ICMPCANCEL is not supported");
                0
            }
            other => {
                warn!("{}: unknown ioctl {other:#x}", self.name());
                request.log(self.name());
                0
            }
        };
        ctx.default_reply(rc)
    }

    fn ioctlv(&mut self, ctx: &mut IpcContext, request: &IoctlvRequest) -> IpcCommandResult {
        let rc = match request.request {
            ioctlv::SO_GETINTERFACEOPT => self.get_interface_opt(ctx, request),
            ioctlv::SO_SENDTO => {
                let fd = ctx.memory.read_u32(request.input(1).address) as i32;
                let request = SocketRequest::Ioctlv(request.clone());
                return sock_result(self.sockets.do_sock(ctx, fd, SocketOp::SendTo, request));
            }
            ioctlv::SO_RECVFROM => {
                let fd = ctx.memory.read_u32(request.input(0).address) as i32;
                let request = SocketRequest::Ioctlv(request.clone());
                return sock_result(self.sockets.do_sock(ctx, fd, SocketOp::RecvFrom, request));
            }
            ioctlv::SO_GETADDRINFO => self.getaddrinfo(&mut *ctx.memory, request),
            ioctlv::SO_ICMPPING => return self.icmp_ping(ctx, request),
            other => {
                warn!("{}: unknown ioctlv {other:#x}", self.name());
                request.dump(self.name());
                0
            }
        };
        ctx.default_reply(rc)
    }

    fn update(&mut self, ctx: &mut IpcContext) {
        self.sockets.update(ctx);
    }

    fn save_state(&self) -> IpcResult<Value> {
        Ok(serde_json::to_value(IpTopState {
            handles: self.handles,
        })?)
    }

    fn load_state(&mut self, state: Value) -> IpcResult<()> {
        let state: IpTopState = serde_json::from_value(state)?;
        self.handles = state.handles;
        Ok(())
    }
}

/// Strict dotted-quad parser: exactly four decimal octets.
pub fn inet_pton(text: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() {
            return None;
        }
        let mut value: u32 = 0;
        for b in part.bytes() {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value * 10 + u32::from(b - b'0');
            if value > 255 {
                return None;
            }
        }
        *octet = value as u8;
    }
    parts.next().is_none().then_some(octets)
}

/// IPv4 addresses for `hostname`, resolved synchronously on the host.
fn resolve_ipv4(hostname: &str) -> Vec<Ipv4Addr> {
    if hostname.is_empty() {
        return Vec::new();
    }
    match (hostname, 0).to_socket_addrs() {
        Ok(addrs) => {
            let mut ips: Vec<Ipv4Addr> = Vec::new();
            for addr in addrs {
                if let std::net::SocketAddr::V4(v4) = addr {
                    if !ips.contains(v4.ip()) {
                        ips.push(*v4.ip());
                    }
                }
            }
            ips
        }
        Err(e) => {
            debug!("resolve {hostname}: {e}");
            Vec::new()
        }
    }
}

/// Reply now for a completed socket call, or leave a parked one to the
/// socket manager.
fn sock_result(rc: Option<i32>) -> IpcCommandResult {
    match rc {
        Some(rc) => IpcCommandResult::reply(rc, 0),
        None => IpcCommandResult::no_reply(),
    }
}

/// String in input vector `i`, if the guest supplied one.
fn guest_string(mem: &dyn GuestMemory, request: &IoctlvRequest, i: usize) -> Option<String> {
    let v = request.in_vectors.get(i)?;
    if v.size == 0 {
        return None;
    }
    let raw = mem.read_vec(v.address, mem.span(v.address, v.size));
    let text = match CStr::from_bytes_until_nul(&raw) {
        Ok(c) => c.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(&raw).into_owned(),
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inet_pton_is_strict() {
        assert_eq!(inet_pton("10.0.1.30"), Some([10, 0, 1, 30]));
        assert_eq!(inet_pton("255.255.255.255"), Some([255; 4]));
        assert_eq!(inet_pton("256.0.0.1"), None);
        assert_eq!(inet_pton("1.2.3"), None);
        assert_eq!(inet_pton("1.2.3.4.5"), None);
        assert_eq!(inet_pton("1.2.3.x"), None);
        assert_eq!(inet_pton("1..3.4"), None);
        assert_eq!(inet_pton("+1.2.3.4"), None);
        assert_eq!(inet_pton("0010.0.0.1"), Some([10, 0, 0, 1]));
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        assert!(resolve_ipv4("127.0.0.1").contains(&Ipv4Addr::LOCALHOST));
        assert!(resolve_ipv4("").is_empty());
    }
}
