// CLASSIFICATION: COMMUNITY
// Filename: tiny_rng.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-13

/// SplitMix64 byte source for the NIC half of a generated MAC address.
/// Not suitable for anything secret.
#[derive(Clone, Copy, Debug)]
pub struct TinyRng(u64);

impl TinyRng {
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Seed from the host clock and process id.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos ^ (u64::from(std::process::id()) << 32))
    }

    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let word = self.next().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }
}
