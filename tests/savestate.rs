// CLASSIFICATION: COMMUNITY
// Filename: savestate.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

mod common;

use common::Guest;
use ios_ipc::device::lock;
use ios_ipc::error::code;
use ios_ipc::ipc::state::IpcState;
use ios_ipc::net::kd::{wc24, NWC24_REQUEST_GENERATED_USER_ID};
use ios_ipc::{GuestMemory, IpcConfig, IpcError};
use serial_test::serial;
use std::path::PathBuf;

fn config(root: PathBuf) -> IpcConfig {
    IpcConfig {
        want_determinism: true,
        nand_root: Some(root),
        ..IpcConfig::default()
    }
}

fn request_user_id(guest: &mut Guest, record: u32, fd: i32) -> i32 {
    let rc = guest.ioctl(record, fd, NWC24_REQUEST_GENERATED_USER_ID, (0, 0), (0x8000, 0x20));
    assert_eq!(rc, 0);
    guest.kernel.memory().read_u32(0x8000) as i32
}

#[test]
#[serial]
fn descriptors_survive_save_and_load() {
    let root = common::scratch_dir("savestate");
    std::fs::write(root.join("data.bin"), b"hello nand").unwrap();

    let mut first = Guest::with_config(config(root.clone()));
    assert_eq!(first.open(0x1000, "/dev/es", 0), 0);
    assert_eq!(first.open(0x1100, "/dev/es", 0), 1);
    assert_eq!(first.open(0x1200, "/data.bin", 1), 2);
    assert_eq!(first.open(0x1300, "/dev/net/kd/request", 0), 3);
    assert_eq!(first.read(0x1400, 2, 0x9000, 5), 5);
    assert_eq!(request_user_id(&mut first, 0x1500, 3), wc24::OK);

    let bytes = first.kernel.save_state().unwrap().to_bytes().unwrap();
    first.kernel.reset(false).unwrap();
    assert_eq!(first.kernel.open_fds(), 0);

    let mut second = Guest::with_config(config(root.clone()));
    second
        .kernel
        .load_state(IpcState::from_bytes(&bytes).unwrap())
        .unwrap();
    assert_eq!(second.kernel.open_fds(), 4);

    // fd 0 still points at the first /dev/es handle
    let es0 = second.kernel.fd_device(0).unwrap();
    let es_ids = second.kernel.devices().bounded_ids("/dev/es").unwrap().to_vec();
    assert_eq!(lock(&es0).id(), es_ids[0]);
    assert_eq!(second.open(0x1000, "/dev/es", 0), 4);
    assert_eq!(second.open(0x1100, "/dev/es", 0), code::IPC_EESEXHAUSTED);

    // the file handle resumes where it was
    assert_eq!(second.read(0x1200, 2, 0x9100, 16), 5);
    assert_eq!(second.kernel.memory().read_vec(0x9100, 5), b" nand".to_vec());

    // an id was generated before the save
    assert_eq!(request_user_id(&mut second, 0x1300, 3), wc24::ERR_ID_GENERATED);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
#[serial]
fn reset_clears_queued_traffic() {
    let mut guest = Guest::deterministic();
    assert_eq!(guest.open(0x1000, "/dev/di", 0), 0);
    guest.post_ioctl(0x1100, 0, 0x1, (0, 0), (0, 0));
    guest.kernel.reset(false).unwrap();
    guest.settle();
    assert_eq!(guest.replies_to(0x1100), 0);
    assert!(guest.kernel.context().queues().is_empty());
    assert_eq!(guest.kernel.context().last_reply_time(), 0);
}

#[test]
#[serial]
fn corrupt_savestate_is_rejected() {
    let err = IpcState::from_bytes(b"not a savestate").unwrap_err();
    assert!(matches!(err, IpcError::Encoding(_)));
}

#[test]
#[serial]
fn socket_device_handle_count_survives_restore() {
    let mut first = Guest::deterministic();
    assert_eq!(first.open(0x1000, "/dev/net/ip/top", 0), 0);
    assert_eq!(first.open(0x1100, "/dev/net/ip/top", 0), 1);
    let bytes = first.kernel.save_state().unwrap().to_bytes().unwrap();

    let mut second = Guest::deterministic();
    second
        .kernel
        .load_state(IpcState::from_bytes(&bytes).unwrap())
        .unwrap();
    let top = second.kernel.fd_device(1).unwrap();

    // one handle is still open after the first close
    assert_eq!(second.close(0x1200, 0), code::IPC_SUCCESS);
    assert!(lock(&top).is_opened());
    assert_eq!(second.close(0x1300, 1), code::IPC_SUCCESS);
    assert!(!lock(&top).is_opened());
}
