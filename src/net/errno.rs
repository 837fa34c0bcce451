// CLASSIFICATION: COMMUNITY
// Filename: errno.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Guest socket error space and host errno translation.

use log::{debug, error};

/// Guest socket error numbers; replies carry their negation.
pub mod so {
    pub const SO_SUCCESS: i32 = 0;
    pub const SO_EACCES: i32 = 2;
    pub const SO_EADDRINUSE: i32 = 3;
    pub const SO_EADDRNOTAVAIL: i32 = 4;
    pub const SO_EAFNOSUPPORT: i32 = 5;
    pub const SO_EAGAIN: i32 = 6;
    pub const SO_EALREADY: i32 = 7;
    pub const SO_EBADF: i32 = 8;
    pub const SO_ECANCELED: i32 = 11;
    pub const SO_ECONNABORTED: i32 = 13;
    pub const SO_ECONNREFUSED: i32 = 14;
    pub const SO_ECONNRESET: i32 = 15;
    pub const SO_EDESTADDRREQ: i32 = 17;
    pub const SO_EHOSTUNREACH: i32 = 23;
    pub const SO_EINPROGRESS: i32 = 26;
    pub const SO_EINVAL: i32 = 28;
    pub const SO_EISCONN: i32 = 30;
    pub const SO_EMFILE: i32 = 33;
    pub const SO_EMSGSIZE: i32 = 35;
    pub const SO_ENETDOWN: i32 = 38;
    pub const SO_ENETUNREACH: i32 = 40;
    pub const SO_ENOBUFS: i32 = 42;
    pub const SO_ENOPROTOOPT: i32 = 51;
    pub const SO_ENOTCONN: i32 = 56;
    pub const SO_ENOTSOCK: i32 = 59;
    pub const SO_EOPNOTSUPP: i32 = 63;
    pub const SO_EPERM: i32 = 65;
    pub const SO_EPIPE: i32 = 66;
    pub const SO_EPROTONOSUPPORT: i32 = 68;
    pub const SO_ETIMEDOUT: i32 = 76;
}

/// Code used for host errors with no guest equivalent.
pub const SO_FATAL: i32 = -1;

/// Host errno to guest code. `EWOULDBLOCK` is handled separately because
/// its meaning depends on the operation.
const ERRNO_TABLE: &[(i32, i32)] = &[
    (libc::EMSGSIZE, so::SO_EMSGSIZE),
    (libc::ECONNRESET, so::SO_ECONNRESET),
    (libc::EISCONN, so::SO_EISCONN),
    (libc::ENOTCONN, so::SO_EAGAIN),
    (libc::EINPROGRESS, so::SO_EINPROGRESS),
    (libc::EALREADY, so::SO_EALREADY),
    (libc::EACCES, so::SO_EACCES),
    (libc::EPERM, so::SO_EPERM),
    (libc::EADDRINUSE, so::SO_EADDRINUSE),
    (libc::EADDRNOTAVAIL, so::SO_EADDRNOTAVAIL),
    (libc::EAFNOSUPPORT, so::SO_EAFNOSUPPORT),
    (libc::ECONNREFUSED, so::SO_ECONNREFUSED),
    (libc::ECONNABORTED, so::SO_ECONNABORTED),
    (libc::ENETUNREACH, so::SO_ENETUNREACH),
    (libc::ENETDOWN, so::SO_ENETDOWN),
    (libc::EHOSTUNREACH, so::SO_EHOSTUNREACH),
    (libc::ETIMEDOUT, so::SO_ETIMEDOUT),
    (libc::EPIPE, so::SO_EPIPE),
    (libc::EBADF, so::SO_EBADF),
    (libc::EINVAL, so::SO_EINVAL),
    (libc::ENOTSOCK, so::SO_ENOTSOCK),
    (libc::ENOPROTOOPT, so::SO_ENOPROTOOPT),
    (libc::EPROTONOSUPPORT, so::SO_EPROTONOSUPPORT),
    (libc::EOPNOTSUPP, so::SO_EOPNOTSUPP),
    (libc::EDESTADDRREQ, so::SO_EDESTADDRREQ),
    (libc::ENOBUFS, so::SO_ENOBUFS),
    (libc::EMFILE, so::SO_EMFILE),
];

/// Translate a host errno into a negative guest code.
///
/// `is_rw` selects how "would block" reads: `-SO_EAGAIN` for data transfer,
/// `-SO_EINPROGRESS` for connection setup.
pub fn translate_errno(errno: i32, caller: &str, is_rw: bool) -> i32 {
    if errno == libc::EWOULDBLOCK || errno == libc::EAGAIN {
        return if is_rw { -so::SO_EAGAIN } else { -so::SO_EINPROGRESS };
    }
    match ERRNO_TABLE.iter().find(|(host, _)| *host == errno) {
        Some((_, guest)) => {
            debug!("{caller}: errno {errno} -> {}", -guest);
            -guest
        }
        None => {
            error!("{caller}: unhandled host errno {errno}");
            SO_FATAL
        }
    }
}

/// Last errno of the calling thread.
pub fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Whether a guest code means "retry later".
pub fn is_would_block(code: i32) -> bool {
    code == -so::SO_EAGAIN || code == -so::SO_EINPROGRESS || code == -so::SO_EALREADY
}
