// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Network devices and the host socket bridge behind them.

pub mod errno;
pub mod icmp;
pub mod ip_top;
pub mod kd;
pub mod ncd;
pub mod socket;
pub mod translate;
pub mod wd;

use crate::config::IpcConfig;
use crate::utils::tiny_rng::TinyRng;
use log::{error, info};

pub type MacAddress = [u8; 6];

/// Address reported when determinism is requested.
pub const DETERMINISTIC_MAC: MacAddress = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc];

/// Nintendo OUI used for generated addresses.
const NINTENDO_OUI: [u8; 3] = [0x00, 0x17, 0xab];

/// Parse `aa:bb:cc:dd:ee:ff`; `-` separators are accepted too.
pub fn parse_mac(text: &str) -> Option<MacAddress> {
    let mut mac = [0u8; 6];
    let mut parts = text.trim().split([':', '-']);
    for byte in mac.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    parts.next().is_none().then_some(mac)
}

pub fn format_mac(mac: &MacAddress) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// A random address under the Nintendo OUI.
pub fn generate_mac(rng: &mut TinyRng) -> MacAddress {
    let mut mac = [0u8; 6];
    mac[..3].copy_from_slice(&NINTENDO_OUI);
    rng.fill_bytes(&mut mac[3..]);
    mac
}

/// The wireless MAC the network devices report.
pub fn get_mac_address(config: &IpcConfig) -> MacAddress {
    if config.want_determinism {
        return DETERMINISTIC_MAC;
    }
    if let Some(text) = config.wireless_mac.as_deref() {
        if let Some(mac) = parse_mac(text) {
            return mac;
        }
        error!("configured wireless MAC {text:?} is invalid, generating a new one");
    }
    let mac = generate_mac(&mut TinyRng::from_time());
    info!("using generated wireless MAC {}", format_mac(&mac));
    mac
}
