// CLASSIFICATION: COMMUNITY
// Filename: icmp.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! ICMP echo packet construction for the guest ping call.

pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_REPLY: u8 = 0;

/// Payload size when the guest supplies its own echo body.
pub const ICMP_DATA_LEN: usize = 0x20;
/// Payload size when only the identifier is known.
pub const ICMP_SHORT_DATA_LEN: usize = 22;

/// RFC 1071 one's-complement checksum.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut sum: u32 = bytes
        .chunks(2)
        .map(|c| u32::from(u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)])))
        .sum();
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Echo request: type, code, checksum, then `data` (identifier and
/// sequence number first).
pub fn echo_request(data: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(4 + data.len());
    packet.extend_from_slice(&[ICMP_ECHO_REQUEST, 0, 0, 0]);
    packet.extend_from_slice(data);
    let sum = checksum(&packet);
    packet[2..4].copy_from_slice(&sum.to_be_bytes());
    packet
}

/// Default echo body carrying only the identifier; the sequence stays 0.
pub fn default_echo_data(icmp_id: u16) -> Vec<u8> {
    let mut data = vec![0u8; ICMP_SHORT_DATA_LEN];
    data[..2].copy_from_slice(&icmp_id.to_be_bytes());
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_packet_verifies_to_zero() {
        let packet = echo_request(&default_echo_data(0x1234));
        assert_eq!(packet.len(), 4 + ICMP_SHORT_DATA_LEN);
        assert_eq!(packet[0], ICMP_ECHO_REQUEST);
        assert_eq!(&packet[4..6], &[0x12, 0x34]);
        assert_eq!(checksum(&packet), 0);
    }

    #[test]
    fn odd_length_is_padded() {
        assert_eq!(checksum(&[0xff]), !0xff00);
    }
}
