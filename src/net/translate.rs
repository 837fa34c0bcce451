// CLASSIFICATION: COMMUNITY
// Filename: translate.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Static guest <-> host constant tables for the socket bridge.
//!
//! The option tables are deliberately partial. Values missing from them pass
//! through unchanged with a warning because several guest option codes happen
//! to coincide with the host's on common platforms.

use crate::memory::GuestMemory;
use bitflags::bitflags;
use libc::{c_int, c_short};
use log::warn;
use std::net::{Ipv4Addr, SocketAddrV4};

bitflags! {
    /// Guest poll event bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GuestPollFlags: u32 {
        const RDNORM = 0x0001;
        const RDBAND = 0x0002;
        const PRI = 0x0004;
        const WRNORM = 0x0008;
        const WRBAND = 0x0010;
        const ERR = 0x0020;
        const HUP = 0x0040;
        const NVAL = 0x0080;
    }
}

impl GuestPollFlags {
    /// Flags the host only ever reports, never accepts as a request.
    pub const RETURN_ONLY: Self = Self::ERR.union(Self::HUP).union(Self::NVAL);
}

const POLL_MAP: [(GuestPollFlags, c_short); 8] = [
    (GuestPollFlags::RDNORM, libc::POLLRDNORM),
    (GuestPollFlags::RDBAND, libc::POLLRDBAND),
    (GuestPollFlags::PRI, libc::POLLPRI),
    (GuestPollFlags::WRNORM, libc::POLLWRNORM),
    (GuestPollFlags::WRBAND, libc::POLLWRBAND),
    (GuestPollFlags::ERR, libc::POLLERR),
    (GuestPollFlags::HUP, libc::POLLHUP),
    (GuestPollFlags::NVAL, libc::POLLNVAL),
];

/// Convert a guest request mask to host `events`, dropping return-only flags.
///
/// Returns the host mask and any guest bits the table does not know.
pub fn guest_to_native_events(guest: u32) -> (c_short, u32) {
    let known = GuestPollFlags::from_bits_truncate(guest);
    let unhandled = guest & !GuestPollFlags::all().bits();
    let requested = known - GuestPollFlags::RETURN_ONLY;
    let native = POLL_MAP
        .iter()
        .filter(|(g, _)| requested.contains(*g))
        .fold(0, |acc, (_, n)| acc | n);
    (native, unhandled)
}

/// Convert host `revents` to guest bits.
pub fn native_to_guest_revents(native: c_short) -> GuestPollFlags {
    POLL_MAP
        .iter()
        .filter(|(_, n)| native & n != 0)
        .fold(GuestPollFlags::empty(), |acc, (g, _)| acc | *g)
}

pub const WII_SOL_SOCKET: u32 = 0xFFFF;
pub const WII_IPPROTO_TCP: u32 = 6;
pub const WII_SO_ERROR: u32 = 0x1009;

const OPT_LEVEL_MAP: &[(c_int, u32)] = &[(libc::SOL_SOCKET, WII_SOL_SOCKET)];

const OPT_NAME_MAP: &[(c_int, u32)] = &[
    (libc::SO_REUSEADDR, 0x0004),
    (libc::SO_SNDBUF, 0x1001),
    (libc::SO_RCVBUF, 0x1002),
    (libc::SO_ERROR, WII_SO_ERROR),
];

fn to_native(table: &[(c_int, u32)], guest: u32, what: &str) -> c_int {
    match table.iter().find(|(_, g)| *g == guest) {
        Some((n, _)) => *n,
        None => {
            warn!("no host {what} for guest value {guest:#x}, passing through");
            guest as c_int
        }
    }
}

fn to_guest(table: &[(c_int, u32)], native: c_int) -> u32 {
    table
        .iter()
        .find(|(n, _)| *n == native)
        .map(|(_, g)| *g)
        .unwrap_or(native as u32)
}

pub fn opt_level_to_native(level: u32) -> c_int {
    to_native(OPT_LEVEL_MAP, level, "sockopt level")
}

pub fn opt_level_to_guest(level: c_int) -> u32 {
    to_guest(OPT_LEVEL_MAP, level)
}

/// Option names are only remapped at socket level.
pub fn opt_name_to_native(level: u32, name: u32) -> c_int {
    if level == WII_SOL_SOCKET {
        to_native(OPT_NAME_MAP, name, "sockopt name")
    } else {
        name as c_int
    }
}

pub fn opt_name_to_guest(level: c_int, name: c_int) -> u32 {
    if level == libc::SOL_SOCKET {
        to_guest(OPT_NAME_MAP, name)
    } else {
        name as u32
    }
}

const FAMILY_MAP: &[(c_int, u32)] = &[(libc::AF_INET, 2)];
const TYPE_MAP: &[(c_int, u32)] = &[
    (0, 0),
    (libc::SOCK_STREAM, 1),
    (libc::SOCK_DGRAM, 2),
    (libc::SOCK_RAW, 3),
];
const PROTO_MAP: &[(c_int, u32)] = &[
    (0, 0),
    (libc::IPPROTO_ICMP, 1),
    (libc::IPPROTO_TCP, 6),
    (libc::IPPROTO_UDP, 17),
];

pub const WII_AF_INET: u32 = 2;
pub const WII_SOCK_RAW: u32 = 3;
pub const WII_IPPROTO_ICMP: u32 = 1;

pub fn family_to_native(af: u32) -> c_int {
    to_native(FAMILY_MAP, af, "address family")
}

pub fn type_to_native(ty: u32) -> c_int {
    to_native(TYPE_MAP, ty, "socket type")
}

pub fn protocol_to_native(proto: u32) -> c_int {
    to_native(PROTO_MAP, proto, "protocol")
}

/// Size of the guest `sockaddr_in`.
pub const WII_SOCKADDR_IN_SIZE: u32 = 8;

/// Read a guest `sockaddr_in`: len u8, family u8, port u16, addr u32.
pub fn read_sockaddr(mem: &dyn GuestMemory, addr: u32) -> SocketAddrV4 {
    let port = mem.read_u16(addr.wrapping_add(2));
    let ip = Ipv4Addr::from(mem.read_u32(addr.wrapping_add(4)));
    SocketAddrV4::new(ip, port)
}

pub fn write_sockaddr(mem: &mut dyn GuestMemory, addr: u32, sa: &SocketAddrV4) {
    mem.write_u8(addr, WII_SOCKADDR_IN_SIZE as u8);
    mem.write_u8(addr.wrapping_add(1), WII_AF_INET as u8);
    mem.write_u16(addr.wrapping_add(2), sa.port());
    mem.write_u32(addr.wrapping_add(4), u32::from(*sa.ip()));
}

/// Host `sockaddr_in` for `sa`.
pub fn to_native_sockaddr(sa: &SocketAddrV4) -> libc::sockaddr_in {
    // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
    let mut native: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    native.sin_family = libc::AF_INET as libc::sa_family_t;
    native.sin_port = sa.port().to_be();
    native.sin_addr.s_addr = u32::from(*sa.ip()).to_be();
    native
}

pub fn from_native_sockaddr(native: &libc::sockaddr_in) -> SocketAddrV4 {
    SocketAddrV4::new(
        Ipv4Addr::from(u32::from_be(native.sin_addr.s_addr)),
        u16::from_be(native.sin_port),
    )
}
