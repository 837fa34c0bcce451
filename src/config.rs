// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Runtime configuration for the IPC layer and its network devices.

use crate::error::{IpcError, IpcResult};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Component, Path, PathBuf};

/// Ticks between the guest signalling a request and it entering the queue.
pub const DEFAULT_REQUEST_LATENCY: u64 = 1000;
/// Reply latency for ordinary device commands.
pub const DEFAULT_REPLY_DELAY: u64 = 4000;
/// Broadway runs at 729 MHz.
pub const DEFAULT_TICKS_PER_MS: u64 = 729_000;

/// Settings consumed by the kernel and devices.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Refuse host networking and use fixed identifiers.
    pub want_determinism: bool,
    /// `aa:bb:cc:dd:ee:ff`; generated when absent or malformed.
    pub wireless_mac: Option<String>,
    /// Host directory standing in for the NAND root.
    pub nand_root: Option<PathBuf>,
    pub request_latency_ticks: u64,
    pub default_reply_delay_ticks: u64,
    pub ticks_per_ms: u64,
    /// SYSCONF area string, e.g. `USA`.
    pub area: String,
    /// SYSCONF model string, e.g. `RVL`.
    pub model: String,
    pub hollywood_id: u32,
    /// Address reported by GETHOSTID.
    pub host_id: Ipv4Addr,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            want_determinism: std::env::var("IOS_IPC_DETERMINISM")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            wireless_mac: std::env::var("IOS_IPC_WIRELESS_MAC").ok(),
            nand_root: std::env::var("IOS_IPC_NAND_ROOT").map(PathBuf::from).ok(),
            request_latency_ticks: DEFAULT_REQUEST_LATENCY,
            default_reply_delay_ticks: DEFAULT_REPLY_DELAY,
            ticks_per_ms: DEFAULT_TICKS_PER_MS,
            area: "USA".into(),
            model: "RVL".into(),
            hollywood_id: 0x0403_ac68,
            host_id: Ipv4Addr::new(192, 168, 1, 150),
        }
    }
}

impl IpcConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> IpcResult<Self> {
        toml::from_str(text).map_err(|e| IpcError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> IpcResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Host path for a NAND-relative guest path. `None` without a NAND
    /// root or when the path would leave it.
    pub fn nand_path(&self, guest_path: &str) -> Option<PathBuf> {
        let root = self.nand_root.as_ref()?;
        Some(root.join(nand_relative(guest_path)?))
    }

    /// Convert a millisecond timeout into emulated ticks.
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        ms.saturating_mul(self.ticks_per_ms)
    }
}

/// `guest_path` below the NAND root, or `None` if it climbs out of it.
pub fn nand_relative(guest_path: &str) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for part in Path::new(guest_path.trim_start_matches('/')).components() {
        match part {
            Component::Normal(p) => rel.push(p),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_defaults() {
        let cfg = IpcConfig::from_toml_str(
            "want_determinism = true\narea = \"EUR\"\nrequest_latency_ticks = 10\n",
        )
        .unwrap();
        assert!(cfg.want_determinism);
        assert_eq!(cfg.area, "EUR");
        assert_eq!(cfg.request_latency_ticks, 10);
        assert_eq!(cfg.default_reply_delay_ticks, DEFAULT_REPLY_DELAY);
    }

    #[test]
    fn nand_path_strips_leading_slash() {
        let cfg = IpcConfig {
            nand_root: Some(PathBuf::from("/tmp/nand")),
            ..IpcConfig::default()
        };
        assert_eq!(
            cfg.nand_path("/shared2/sys/SYSCONF"),
            Some(PathBuf::from("/tmp/nand/shared2/sys/SYSCONF"))
        );
    }

    #[test]
    fn nand_path_refuses_to_leave_the_root() {
        let cfg = IpcConfig {
            nand_root: Some(PathBuf::from("/tmp/nand")),
            ..IpcConfig::default()
        };
        assert_eq!(cfg.nand_path("/../secret.bin"), None);
        assert_eq!(cfg.nand_path("/title/../../etc/passwd"), None);
        assert_eq!(cfg.nand_path("//etc/passwd"), Some(PathBuf::from("/tmp/nand/etc/passwd")));
        assert_eq!(cfg.nand_path("/./tmp/a.bin"), Some(PathBuf::from("/tmp/nand/tmp/a.bin")));
    }
}
