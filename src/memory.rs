// CLASSIFICATION: COMMUNITY
// Filename: memory.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Guest physical memory access.
//!
//! The emulator owns real guest RAM; this crate only needs byte-level read and
//! write at a guest address. All multi-byte values are big-endian, matching
//! the guest CPU.

use log::warn;

/// Byte-addressable view of guest memory.
pub trait GuestMemory: Send {
    /// Copy `buf.len()` bytes starting at `addr` into `buf`.
    fn read_bytes(&self, addr: u32, buf: &mut [u8]);
    /// Copy `data` into guest memory starting at `addr`.
    fn write_bytes(&mut self, addr: u32, data: &[u8]);
    /// Bytes of guest memory mapped from address zero.
    fn size(&self) -> usize;

    /// Clamp a guest-supplied length so `addr..addr + len` stays mapped.
    fn span(&self, addr: u32, len: u32) -> usize {
        (len as usize).min(self.size().saturating_sub(addr as usize))
    }

    fn read_u8(&self, addr: u32) -> u8 {
        let mut b = [0u8; 1];
        self.read_bytes(addr, &mut b);
        b[0]
    }

    fn read_u16(&self, addr: u32) -> u16 {
        let mut b = [0u8; 2];
        self.read_bytes(addr, &mut b);
        u16::from_be_bytes(b)
    }

    fn read_u32(&self, addr: u32) -> u32 {
        let mut b = [0u8; 4];
        self.read_bytes(addr, &mut b);
        u32::from_be_bytes(b)
    }

    fn read_u64(&self, addr: u32) -> u64 {
        let mut b = [0u8; 8];
        self.read_bytes(addr, &mut b);
        u64::from_be_bytes(b)
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        self.write_bytes(addr, &[value]);
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        self.write_bytes(addr, &value.to_be_bytes());
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.write_bytes(addr, &value.to_be_bytes());
    }

    fn write_u64(&mut self, addr: u32, value: u64) {
        self.write_bytes(addr, &value.to_be_bytes());
    }

    /// Read `len` bytes into a fresh buffer.
    fn read_vec(&self, addr: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.read_bytes(addr, &mut buf);
        buf
    }

    /// Read a NUL-terminated string of at most `max` bytes.
    fn read_cstring(&self, addr: u32, max: usize) -> String {
        let raw = self.read_vec(addr, max);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    /// Write `s` followed by a NUL terminator.
    fn write_cstring(&mut self, addr: u32, s: &str) {
        self.write_bytes(addr, s.as_bytes());
        self.write_u8(addr.wrapping_add(s.len() as u32), 0);
    }

    fn fill(&mut self, addr: u32, value: u8, len: usize) {
        self.write_bytes(addr, &vec![value; len]);
    }
}

/// Contiguous guest memory starting at address zero.
pub struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    /// Allocate `size` zeroed bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn range(&self, addr: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = addr as usize;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }
}

impl GuestMemory for FlatMemory {
    fn read_bytes(&self, addr: u32, buf: &mut [u8]) {
        match self.range(addr, buf.len()) {
            Some(r) => buf.copy_from_slice(&self.data[r]),
            None => {
                warn!("guest read of {} bytes at {addr:#010x} out of range", buf.len());
                buf.fill(0);
            }
        }
    }

    fn write_bytes(&mut self, addr: u32, data: &[u8]) {
        match self.range(addr, data.len()) {
            Some(r) => self.data[r].copy_from_slice(data),
            None => warn!("guest write of {} bytes at {addr:#010x} dropped", data.len()),
        }
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}
