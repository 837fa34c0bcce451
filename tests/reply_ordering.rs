// CLASSIFICATION: COMMUNITY
// Filename: reply_ordering.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

mod common;

use common::Guest;
use ios_ipc::device::{Device, DeviceInfo, IpcCommandResult};
use ios_ipc::ipc::context::IpcContext;
use ios_ipc::ipc::request::IoctlRequest;
use ios_ipc::Signal;
use serial_test::serial;

/// Replies to IOCtl `n` after `n` ticks, or later via `update` when `n` is 0.
struct DelayDevice {
    info: DeviceInfo,
    parked: Vec<IoctlRequest>,
}

impl Device for DelayDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    fn ioctl(&mut self, _ctx: &mut IpcContext, request: &IoctlRequest) -> IpcCommandResult {
        if request.request == 0 {
            self.parked.push(*request);
            return IpcCommandResult::no_reply();
        }
        IpcCommandResult::reply(request.request as i32, u64::from(request.request))
    }

    fn update(&mut self, ctx: &mut IpcContext) {
        for request in self.parked.drain(..) {
            ctx.enqueue_reply(&request.base, 7, 0);
        }
    }
}

fn guest_with_delay_device() -> (Guest, i32) {
    let mut guest = Guest::deterministic();
    guest
        .kernel
        .add_device("/dev/test/delay", |info| DelayDevice {
            info,
            parked: Vec::new(),
        })
        .unwrap();
    let fd = guest.open(0x1000, "/dev/test/delay", 0);
    assert_eq!(fd, 0);
    (guest, fd)
}

#[test]
#[serial]
fn later_reply_never_overtakes_earlier_one() {
    let (mut guest, fd) = guest_with_delay_device();
    let (r1, r2) = (0x2000, 0x2100);
    guest.post_ioctl(r1, fd, 50_000, (0, 0), (0, 0));
    guest.post_ioctl(r2, fd, 1, (0, 0), (0, 0));
    guest.run(30_000);
    assert_eq!(guest.replies_to(r1), 0);
    assert_eq!(guest.replies_to(r2), 0);

    guest.run(60_000);
    let replies = guest.iface.replies();
    let tail = &replies[replies.len() - 2..];
    assert_eq!(tail, &[r1, r2]);
    assert_eq!(guest.ret(r1), 50_000);
    assert_eq!(guest.ret(r2), 1);
}

#[test]
#[serial]
fn deferred_completion_is_not_held_behind_a_later_reply() {
    let (mut guest, fd) = guest_with_delay_device();
    let (r1, r2) = (0x2000, 0x2100);
    guest.post_ioctl(r1, fd, 0, (0, 0), (0, 0));
    guest.post_ioctl(r2, fd, 4_000, (0, 0), (0, 0));
    guest.run(1_100);
    assert_eq!(guest.replies_to(r1), 0);
    assert_eq!(guest.replies_to(r2), 0);

    // r1 completes while r2 is still scheduled
    guest.kernel.update_devices().unwrap();
    guest.run(20_000);
    let replies = guest.iface.replies();
    let p1 = replies.iter().position(|a| *a == r1).unwrap();
    let p2 = replies.iter().position(|a| *a == r2).unwrap();
    assert!(p1 < p2, "reply order {replies:?}");
    assert_eq!(guest.ret(r1), 7);
    assert_eq!(guest.ret(r2), 4_000);
}

#[test]
#[serial]
fn watermark_tracks_latest_scheduled_reply() {
    let (mut guest, fd) = guest_with_delay_device();
    let before = guest.kernel.context().timing.ticks();
    guest.post_ioctl(0x2000, fd, 100, (0, 0), (0, 0));
    guest.run(1_000);
    let watermark = guest.kernel.context().last_reply_time();
    assert!(watermark >= before + 1_000 + 100);
    guest.run(1_000);
    assert_eq!(guest.replies_to(0x2000), 1);
}

#[test]
#[serial]
fn deferred_reply_is_delivered_once() {
    let (mut guest, fd) = guest_with_delay_device();
    let rec = 0x2000;
    guest.post_ioctl(rec, fd, 0, (0, 0), (0, 0));
    guest.settle();
    assert_eq!(guest.replies_to(rec), 0);

    guest.pump();
    assert_eq!(guest.replies_to(rec), 1);
    assert_eq!(guest.ret(rec), 7);

    guest.pump();
    assert_eq!(guest.replies_to(rec), 1);
}

#[test]
#[serial]
fn busy_interface_holds_requests_back() {
    let (mut guest, fd) = guest_with_delay_device();
    let rec = 0x2000;
    guest.iface.set_ready(false);
    guest.post_ioctl(rec, fd, 5, (0, 0), (0, 0));
    guest.settle();
    assert!(!guest.iface.signals().contains(&Signal::Ack(rec)));
    assert_eq!(guest.kernel.context().queues().requests.len(), 1);

    guest.iface.set_ready(true);
    guest.kernel.update().unwrap();
    guest.settle();
    let signals = guest.iface.signals();
    let ack = signals.iter().position(|s| *s == Signal::Ack(rec)).unwrap();
    let reply = signals.iter().position(|s| *s == Signal::Reply(rec)).unwrap();
    assert!(ack < reply);
}

#[test]
#[serial]
fn queued_request_drains_on_periodic_tick() {
    let (mut guest, fd) = guest_with_delay_device();
    let rec = 0x2000;
    guest.iface.set_ready(false);
    guest.post_ioctl(rec, fd, 5, (0, 0), (0, 0));
    guest.settle();
    assert_eq!(guest.kernel.context().queues().requests.len(), 1);

    // no event is due for this record any more
    guest.iface.set_ready(true);
    guest.run(1);
    assert!(guest.iface.signals().contains(&Signal::Ack(rec)));
    assert!(guest.kernel.context().queues().requests.is_empty());
    guest.settle();
    assert_eq!(guest.replies_to(rec), 1);
    assert_eq!(guest.ret(rec), 5);
}
