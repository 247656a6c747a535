//! Client and discovery configuration.
//!
//! Priority: environment variables > values set in code > defaults. The defaults
//! suit consumer Wi-Fi cameras; the env vars exist for field debugging against slow
//! or oddly configured devices.

use std::env;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Standard PTP/IP command port.
pub const DEFAULT_PORT: u16 = 15740;

/// Addresses cameras commonly give themselves when they run their own access point.
pub const KNOWN_CAMERA_ADDRESSES: [Ipv4Addr; 7] = [
    Ipv4Addr::new(192, 168, 0, 1),
    Ipv4Addr::new(192, 168, 1, 1),
    Ipv4Addr::new(192, 168, 0, 10),
    Ipv4Addr::new(192, 168, 1, 2),
    Ipv4Addr::new(192, 168, 43, 1),
    Ipv4Addr::new(172, 16, 0, 1),
    Ipv4Addr::new(10, 0, 0, 1),
];

const ENV_CONNECT_TIMEOUT_MS: &str = "CAMLINK_CONNECT_TIMEOUT_MS";
const ENV_READ_TIMEOUT_MS: &str = "CAMLINK_READ_TIMEOUT_MS";
const ENV_EVENT_TIMEOUT_MS: &str = "CAMLINK_EVENT_TIMEOUT_MS";
const ENV_HOST_NAME: &str = "CAMLINK_HOST_NAME";
const ENV_PORT: &str = "CAMLINK_PORT";
const ENV_DISCOVERY_TIMEOUT_MS: &str = "CAMLINK_DISCOVERY_TIMEOUT_MS";
const ENV_PROBE_TIMEOUT_MS: &str = "CAMLINK_PROBE_TIMEOUT_MS";

/// Settings for [`crate::PtpIpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline for opening the command connection
    pub connect_timeout: Duration,
    /// Deadline for each blocking read on the command connection
    pub read_timeout: Duration,
    /// Connect and read deadline for each event-port attempt
    pub event_timeout: Duration,
    /// Name announced to the camera in the init request. Many cameras show it on screen.
    pub host_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            event_timeout: Duration::from_secs(3),
            host_name: "camlink".to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by any `CAMLINK_*` env vars that are set.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies env var overrides on top of values already set in code.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            connect_timeout: lookup_millis(&lookup, ENV_CONNECT_TIMEOUT_MS).unwrap_or(self.connect_timeout),
            read_timeout: lookup_millis(&lookup, ENV_READ_TIMEOUT_MS).unwrap_or(self.read_timeout),
            event_timeout: lookup_millis(&lookup, ENV_EVENT_TIMEOUT_MS).unwrap_or(self.event_timeout),
            host_name: lookup(ENV_HOST_NAME)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(self.host_name),
        }
    }
}

/// Settings for [`crate::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Port probed on every candidate
    pub port: u16,
    /// Per-probe TCP connect deadline
    pub probe_timeout: Duration,
    /// Wall-clock budget for the whole discovery run
    pub timeout: Duration,
    /// Delay before subnet probes start, so known addresses win ties
    pub subnet_head_start: Duration,
    /// Addresses tried first
    pub known_addresses: Vec<Ipv4Addr>,
    /// Upper bound on probes in flight at once
    pub max_concurrent_probes: usize,
    /// Whether to run the quick init handshake on each found camera to learn its name
    pub identify: bool,
    pub scan_subnet: bool,
    pub scan_interfaces: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            probe_timeout: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            subnet_head_start: Duration::from_millis(500),
            known_addresses: KNOWN_CAMERA_ADDRESSES.to_vec(),
            max_concurrent_probes: 32,
            identify: true,
            scan_subnet: true,
            scan_interfaces: true,
        }
    }
}

impl DiscoveryConfig {
    /// Defaults, overridden by any `CAMLINK_*` env vars that are set.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup_port(&lookup).unwrap_or(self.port),
            probe_timeout: lookup_millis(&lookup, ENV_PROBE_TIMEOUT_MS).unwrap_or(self.probe_timeout),
            timeout: lookup_millis(&lookup, ENV_DISCOVERY_TIMEOUT_MS).unwrap_or(self.timeout),
            ..self
        }
    }
}

/// Reads a positive millisecond count. Zero and garbage are ignored.
fn lookup_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn lookup_port(lookup: &impl Fn(&str) -> Option<String>) -> Option<u16> {
    lookup(ENV_PORT)
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|port| *port > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.event_timeout, Duration::from_secs(3));
        assert_eq!(config.host_name, "camlink");
    }

    #[test]
    fn test_client_env_overrides_code_values() {
        let config = ClientConfig {
            host_name: "from-code".to_string(),
            ..ClientConfig::default()
        }
        .with_overrides(lookup_from(&[
            (ENV_READ_TIMEOUT_MS, "2500"),
            (ENV_HOST_NAME, "from-env"),
        ]));
        assert_eq!(config.read_timeout, Duration::from_millis(2500));
        assert_eq!(config.host_name, "from-env");
        // Untouched fields keep their values
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_client_ignores_invalid_env_values() {
        let config = ClientConfig::default().with_overrides(lookup_from(&[
            (ENV_CONNECT_TIMEOUT_MS, "soon"),
            (ENV_EVENT_TIMEOUT_MS, "0"),
            (ENV_HOST_NAME, "   "),
        ]));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_discovery_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.port, 15740);
        assert_eq!(config.probe_timeout, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.subnet_head_start, Duration::from_millis(500));
        assert_eq!(config.known_addresses.len(), 7);
        assert_eq!(config.known_addresses[0], Ipv4Addr::new(192, 168, 0, 1));
        assert!(config.identify);
    }

    #[test]
    fn test_discovery_env_overrides() {
        let config = DiscoveryConfig::default().with_overrides(lookup_from(&[
            (ENV_PORT, "15800"),
            (ENV_PROBE_TIMEOUT_MS, "250"),
            (ENV_DISCOVERY_TIMEOUT_MS, "1500"),
        ]));
        assert_eq!(config.port, 15800);
        assert_eq!(config.probe_timeout, Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.known_addresses, KNOWN_CAMERA_ADDRESSES.to_vec());
    }

    #[test]
    fn test_discovery_rejects_port_zero_and_overflow() {
        let config = DiscoveryConfig::default().with_overrides(lookup_from(&[(ENV_PORT, "0")]));
        assert_eq!(config.port, DEFAULT_PORT);
        let config = DiscoveryConfig::default().with_overrides(lookup_from(&[(ENV_PORT, "70000")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_from_env_returns_config() {
        let config = DiscoveryConfig::from_env();
        assert!(config.port > 0);
        assert!(!ClientConfig::from_env().host_name.is_empty());
    }
}
