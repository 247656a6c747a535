//! Candidate addresses for the three probe strategies.
//!
//! Everything here is pure except [`local_interfaces`], which asks the OS. The plan
//! is ordered (known addresses, then Wi-Fi gateways, then the local subnet) and
//! de-duplicated, so an address is probed once under the first strategy that
//! names it.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use log::debug;
use sysinfo::Networks;

use super::DiscoveryMethod;
use crate::config::DiscoveryConfig;

/// Host octets probed on the local /24: the usual DHCP pool start plus common static picks.
const SUBNET_HOSTS: [u8; 22] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 100, 254,
];

/// Interface name fragments that indicate Wi-Fi or Wi-Fi Direct.
const WIFI_INTERFACE_KEYWORDS: [&str; 3] = ["wlan", "p2p", "wifi"];

/// One IPv4 address on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub address: Ipv4Addr,
    pub prefix: u8,
}

/// One address to probe and the strategy that proposed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub address: Ipv4Addr,
    pub method: DiscoveryMethod,
}

/// Non-loopback IPv4 addresses of all local interfaces, sorted by interface name.
pub fn local_interfaces() -> Vec<InterfaceAddress> {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces: Vec<InterfaceAddress> = networks
        .list()
        .iter()
        .flat_map(|(name, data)| {
            data.ip_networks().iter().filter_map(move |network| match network.addr {
                IpAddr::V4(address) if !address.is_loopback() && !address.is_unspecified() => Some(InterfaceAddress {
                    name: name.clone(),
                    address,
                    prefix: network.prefix,
                }),
                _ => None,
            })
        })
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name).then(a.address.cmp(&b.address)));
    debug!("Local IPv4 interfaces: {:?}", interfaces);
    interfaces
}

pub fn is_wifi_interface(name: &str) -> bool {
    let name = name.to_lowercase();
    WIFI_INTERFACE_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

/// The address whose /24 gets scanned: the first non-loopback, non-link-local
/// IPv4 address, preferring Wi-Fi interfaces.
pub fn primary_ipv4(interfaces: &[InterfaceAddress]) -> Option<Ipv4Addr> {
    let usable = || {
        interfaces
            .iter()
            .filter(|i| !i.address.is_loopback() && !i.address.is_link_local())
    };
    usable()
        .find(|i| is_wifi_interface(&i.name))
        .or_else(|| usable().next())
        .map(|i| i.address)
}

/// Replaces the last octet. Subnets are treated as /24 whatever the real prefix.
fn with_host(address: Ipv4Addr, host: u8) -> Ipv4Addr {
    let [a, b, c, _] = address.octets();
    Ipv4Addr::new(a, b, c, host)
}

/// `.1`..`.20`, `.100`, and `.254` of the local /24, minus the local address itself.
pub fn subnet_candidates(local: Ipv4Addr) -> Vec<Ipv4Addr> {
    SUBNET_HOSTS
        .iter()
        .map(|host| with_host(local, *host))
        .filter(|address| *address != local)
        .collect()
}

/// `.1` and `.0` of the interface's /24, where a Wi-Fi Direct group owner usually sits.
pub fn gateway_candidates(interface: Ipv4Addr) -> Vec<Ipv4Addr> {
    [1, 0]
        .into_iter()
        .map(|host| with_host(interface, host))
        .filter(|address| *address != interface)
        .collect()
}

/// Builds the ordered, de-duplicated probe plan.
pub fn plan(config: &DiscoveryConfig, interfaces: &[InterfaceAddress]) -> Vec<Candidate> {
    let mut plan = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |address: Ipv4Addr, method: DiscoveryMethod| {
        if seen.insert(address) {
            plan.push(Candidate { address, method });
        }
    };

    for address in &config.known_addresses {
        push(*address, DiscoveryMethod::CommonIp);
    }
    if config.scan_interfaces {
        for interface in interfaces.iter().filter(|i| is_wifi_interface(&i.name)) {
            for address in gateway_candidates(interface.address) {
                push(address, DiscoveryMethod::InterfaceGateway);
            }
        }
    }
    if config.scan_subnet
        && let Some(local) = primary_ipv4(interfaces)
    {
        for address in subnet_candidates(local) {
            push(address, DiscoveryMethod::SubnetScan);
        }
    }
    plan
}
