// CLASSIFICATION: COMMUNITY
// Filename: socket_bridge.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

mod common;

use common::Guest;
use ios_ipc::error::code;
use ios_ipc::net::errno::so;
use ios_ipc::net::ip_top::{ioctl, ioctlv};
use ios_ipc::net::translate::GuestPollFlags;
use ios_ipc::{GuestMemory, Signal};
use serial_test::serial;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

const LOOPBACK: u32 = 0x7f00_0001;

fn put(guest: &mut Guest, addr: u32, words: &[u32]) {
    for (i, w) in words.iter().enumerate() {
        guest.mem().write_u32(addr + i as u32 * 4, *w);
    }
}

/// Guest `sockaddr_in` at `addr`.
fn put_sockaddr(guest: &mut Guest, addr: u32, ip: u32, port: u16) {
    let mem = guest.mem();
    mem.write_u8(addr, 8);
    mem.write_u8(addr + 1, 2);
    mem.write_u16(addr + 2, port);
    mem.write_u32(addr + 4, ip);
}

/// Keep polling host sockets until `record` has been replied to.
fn pump_until_reply(guest: &mut Guest, record: u32) -> bool {
    pump_within(guest, record, Duration::from_secs(1))
}

fn pump_within(guest: &mut Guest, record: u32, limit: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        guest.pump();
        if guest.replies_to(record) > 0 {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

fn open_top(guest: &mut Guest) -> i32 {
    let fd = guest.open(0x1000, "/dev/net/ip/top", 0);
    assert!(fd >= 0);
    fd
}

fn tcp_socket(guest: &mut Guest, top: i32) -> i32 {
    put(guest, 0x8000, &[2, 1, 0]);
    let s = guest.ioctl(0x1100, top, ioctl::SO_SOCKET, (0x8000, 12), (0, 0));
    assert!(s >= 0, "SO_SOCKET failed with {s}");
    s
}

/// Listening guest socket on an ephemeral loopback port.
fn guest_listener(guest: &mut Guest, top: i32) -> (i32, u16) {
    guest_listener_with_backlog(guest, top, 4)
}

fn guest_listener_with_backlog(guest: &mut Guest, top: i32, backlog: u32) -> (i32, u16) {
    let s = tcp_socket(guest, top);
    put(guest, 0x8100, &[s as u32, 1]);
    put_sockaddr(guest, 0x8108, LOOPBACK, 0);
    assert_eq!(guest.ioctl(0x1200, top, ioctl::SO_BIND, (0x8100, 0x10), (0, 0)), 0);
    put(guest, 0x8200, &[s as u32, backlog]);
    assert_eq!(guest.ioctl(0x1300, top, ioctl::SO_LISTEN, (0x8200, 8), (0, 0)), 0);
    put(guest, 0x8280, &[s as u32]);
    assert_eq!(
        guest.ioctl(0x1400, top, ioctl::SO_GETSOCKNAME, (0x8280, 4), (0x8300, 0x10)),
        0
    );
    let port = guest.kernel.memory().read_u16(0x8302);
    assert_ne!(port, 0);
    (s, port)
}

fn post_recv(guest: &mut Guest, record: u32, top: i32, s: i32, buffer: u32, size: u32) {
    put(guest, 0x8500, &[s as u32, 0]);
    guest.post_ioctlv(record, top, ioctlv::SO_RECVFROM, &[(0x8500, 8)], &[(buffer, size), (0, 0)]);
}

#[test]
#[serial]
fn deferred_accept_replies_once_a_client_connects() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let (listener, port) = guest_listener(&mut guest, top);

    let accept_rec = 0x2000;
    put(&mut guest, 0x8400, &[listener as u32]);
    guest.post_ioctl(accept_rec, top, ioctl::SO_ACCEPT, (0x8400, 4), (0x8480, 8));
    guest.settle();
    guest.pump();
    assert_eq!(guest.replies_to(accept_rec), 0);

    let client = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
    assert!(pump_until_reply(&mut guest, accept_rec));
    let accepted = guest.ret(accept_rec);
    assert!(accepted >= 0 && accepted != listener);
    assert_eq!(guest.kernel.memory().read_u8(0x8481), 2);

    guest.pump();
    guest.pump();
    assert_eq!(guest.replies_to(accept_rec), 1);
    drop(client);
}

#[test]
#[serial]
fn deferred_recv_delivers_data_and_send_goes_out() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let (listener, port) = guest_listener(&mut guest, top);

    let mut client = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
    put(&mut guest, 0x8400, &[listener as u32]);
    guest.post_ioctl(0x2000, top, ioctl::SO_ACCEPT, (0x8400, 4), (0x8480, 8));
    assert!(pump_until_reply(&mut guest, 0x2000));
    let conn = guest.ret(0x2000);
    assert!(conn >= 0);

    let recv_rec = 0x2100;
    post_recv(&mut guest, recv_rec, top, conn, 0x9000, 64);
    guest.settle();
    assert_eq!(guest.replies_to(recv_rec), 0);

    client.write_all(b"ping").unwrap();
    assert!(pump_until_reply(&mut guest, recv_rec));
    assert_eq!(guest.ret(recv_rec), 4);
    assert_eq!(guest.kernel.memory().read_vec(0x9000, 4), b"ping".to_vec());

    guest.mem().write_bytes(0x9100, b"pong");
    put(&mut guest, 0x8600, &[conn as u32, 0, 0]);
    let sent = guest.ioctlv(0x2200, top, ioctlv::SO_SENDTO, &[(0x9100, 4), (0x8600, 0x20)], &[]);
    assert_eq!(sent, 4);
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut buf = [0u8; 4];
    client.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"pong");
}

#[test]
#[serial]
fn connect_replies_exactly_once() {
    let host = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = host.local_addr().unwrap().port();
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let s = tcp_socket(&mut guest, top);

    let connect_rec = 0x2000;
    put(&mut guest, 0x8100, &[s as u32, 1]);
    put_sockaddr(&mut guest, 0x8108, LOOPBACK, port);
    guest.post_ioctl(connect_rec, top, ioctl::SO_CONNECT, (0x8100, 0x10), (0, 0));
    guest.settle();
    assert!(pump_until_reply(&mut guest, connect_rec));
    assert_eq!(guest.ret(connect_rec), 0);

    guest.pump();
    guest.pump();
    assert_eq!(guest.replies_to(connect_rec), 1);
    assert!(host.accept().is_ok());
}

#[test]
#[serial]
fn second_call_on_a_busy_socket_is_refused() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let (listener, port) = guest_listener(&mut guest, top);
    let mut client = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
    put(&mut guest, 0x8400, &[listener as u32]);
    guest.post_ioctl(0x2000, top, ioctl::SO_ACCEPT, (0x8400, 4), (0x8480, 8));
    assert!(pump_until_reply(&mut guest, 0x2000));
    let conn = guest.ret(0x2000);
    assert!(conn >= 0);

    let first = 0x2100;
    post_recv(&mut guest, first, top, conn, 0x9000, 64);
    guest.settle();
    assert_eq!(guest.replies_to(first), 0);

    let second = 0x2200;
    post_recv(&mut guest, second, top, conn, 0x9100, 64);
    guest.settle();
    assert_eq!(guest.replies_to(second), 1);
    assert_eq!(guest.ret(second), -so::SO_EALREADY);
    assert_eq!(guest.replies_to(first), 0);

    // the parked call is untouched and still completes
    client.write_all(b"hi").unwrap();
    assert!(pump_until_reply(&mut guest, first));
    assert_eq!(guest.ret(first), 2);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn connect_to_a_full_backlog_resolves_through_update() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    // backlog 0 leaves room for one queued connection
    let (listener, port) = guest_listener_with_backlog(&mut guest, top, 0);
    let _queued = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();

    let s = tcp_socket(&mut guest, top);
    let connect_rec = 0x2000;
    put(&mut guest, 0x8100, &[s as u32, 1]);
    put_sockaddr(&mut guest, 0x8108, LOOPBACK, port);
    guest.post_ioctl(connect_rec, top, ioctl::SO_CONNECT, (0x8100, 0x10), (0, 0));
    guest.settle();
    guest.pump();
    assert_eq!(guest.replies_to(connect_rec), 0);

    put(&mut guest, 0x8400, &[listener as u32]);
    guest.post_ioctl(0x2100, top, ioctl::SO_ACCEPT, (0x8400, 4), (0x8480, 8));
    assert!(pump_until_reply(&mut guest, 0x2100));
    assert!(guest.ret(0x2100) >= 0);

    // the host retries the dropped handshake on its own schedule
    assert!(pump_within(&mut guest, connect_rec, Duration::from_secs(8)));
    assert_eq!(guest.ret(connect_rec), 0);
    guest.pump();
    assert_eq!(guest.replies_to(connect_rec), 1);
}

#[test]
#[serial]
fn close_cancels_a_parked_call() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let (listener, port) = guest_listener(&mut guest, top);
    let _client = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
    put(&mut guest, 0x8400, &[listener as u32]);
    guest.post_ioctl(0x2000, top, ioctl::SO_ACCEPT, (0x8400, 4), (0x8480, 8));
    assert!(pump_until_reply(&mut guest, 0x2000));
    let conn = guest.ret(0x2000);

    let recv_rec = 0x2100;
    post_recv(&mut guest, recv_rec, top, conn, 0x9000, 64);
    guest.settle();
    assert_eq!(guest.replies_to(recv_rec), 0);

    put(&mut guest, 0x8700, &[conn as u32]);
    assert_eq!(guest.ioctl(0x2200, top, ioctl::SO_CLOSE, (0x8700, 4), (0, 0)), 0);
    assert_eq!(guest.replies_to(recv_rec), 1);
    assert_eq!(guest.ret(recv_rec), -so::SO_ECANCELED);

    // the handle is gone
    assert_eq!(guest.ioctl(0x2300, top, ioctl::SO_CLOSE, (0x8700, 4), (0, 0)), -so::SO_EBADF);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn poll_reports_hangup_and_unknown_handles() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let s = tcp_socket(&mut guest, top);

    let events = (GuestPollFlags::RDNORM | GuestPollFlags::WRNORM).bits();
    put(&mut guest, 0x8800, &[0, 0]);
    put(&mut guest, 0x8900, &[s as u32, events, 0, 50, events, 0]);
    let ready = guest.ioctl(0x2000, top, ioctl::SO_POLL, (0x8800, 8), (0x8900, 0x18));
    assert_eq!(ready, 2);
    let mem = guest.kernel.memory();
    let first = GuestPollFlags::from_bits_truncate(mem.read_u32(0x8908));
    let second = GuestPollFlags::from_bits_truncate(mem.read_u32(0x8914));
    assert!(first.contains(GuestPollFlags::HUP));
    assert_eq!(second, GuestPollFlags::NVAL);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn poll_with_return_only_mask_still_reports_hangup() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let s = tcp_socket(&mut guest, top);

    let events = GuestPollFlags::RETURN_ONLY.bits();
    put(&mut guest, 0x8800, &[0, 0]);
    put(&mut guest, 0x8900, &[s as u32, events, 0]);
    let ready = guest.ioctl(0x2000, top, ioctl::SO_POLL, (0x8800, 8), (0x8900, 0xc));
    assert_eq!(ready, 1);
    let revents = GuestPollFlags::from_bits_truncate(guest.kernel.memory().read_u32(0x8908));
    assert!(revents.contains(GuestPollFlags::HUP));
    assert!(!revents.intersects(GuestPollFlags::RDNORM | GuestPollFlags::WRNORM));
}

#[test]
#[serial]
fn immediate_poll_reply_takes_the_default_delay() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);

    let poll_rec = 0x2000;
    put(&mut guest, 0x8800, &[0, 0]);
    put(&mut guest, 0x8900, &[77, GuestPollFlags::RDNORM.bits(), 0]);
    guest.post_ioctl(poll_rec, top, ioctl::SO_POLL, (0x8800, 8), (0x8900, 0xc));
    // request latency plus a little, well short of the default reply delay
    guest.run(2_000);
    assert!(guest.iface.signals().contains(&Signal::Ack(poll_rec)));
    assert_eq!(guest.replies_to(poll_rec), 0);

    guest.settle();
    assert_eq!(guest.replies_to(poll_rec), 1);
    assert_eq!(guest.ret(poll_rec), 1);
}

#[test]
#[serial]
fn parked_poll_times_out() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let (listener, _) = guest_listener(&mut guest, top);

    let poll_rec = 0x2000;
    put(&mut guest, 0x8800, &[0, 5]);
    put(&mut guest, 0x8900, &[listener as u32, GuestPollFlags::RDNORM.bits(), 0]);
    guest.post_ioctl(poll_rec, top, ioctl::SO_POLL, (0x8800, 8), (0x8900, 0xc));
    guest.settle();
    guest.pump();
    assert_eq!(guest.replies_to(poll_rec), 0);

    // 5 ms at 729000 ticks per ms
    guest.run(4_000_000);
    guest.pump();
    assert_eq!(guest.replies_to(poll_rec), 1);
    assert_eq!(guest.ret(poll_rec), 0);
}

#[test]
#[serial]
fn host_id_and_address_helpers() {
    let mut guest = Guest::networked();
    let top = open_top(&mut guest);
    let id = guest.ioctl(0x2000, top, ioctl::SO_GETHOSTID, (0, 0), (0, 0));
    assert_eq!(id as u32, u32::from(Ipv4Addr::new(192, 168, 1, 150)));

    guest.mem().write_cstring(0x8000, "10.0.1.30");
    assert_eq!(guest.ioctl(0x2100, top, ioctl::SO_INETPTON, (0x8000, 16), (0x8100, 8)), 1);
    assert_eq!(guest.kernel.memory().read_vec(0x8104, 4), vec![10, 0, 1, 30]);

    guest.mem().write_cstring(0x8000, "1.2.3.999");
    assert_eq!(guest.ioctl(0x2200, top, ioctl::SO_INETPTON, (0x8000, 16), (0x8100, 8)), 0);
}

#[test]
#[serial]
fn determinism_refuses_socket_calls() {
    let mut guest = Guest::deterministic();
    let top = open_top(&mut guest);
    put(&mut guest, 0x8000, &[2, 1, 0]);
    assert_eq!(
        guest.ioctl(0x1100, top, ioctl::SO_SOCKET, (0x8000, 12), (0, 0)),
        code::IPC_EACCES
    );
}
