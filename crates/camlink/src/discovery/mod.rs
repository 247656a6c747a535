//! Finds PTP/IP cameras on the local IPv4 network.
//!
//! There's no directory service to ask, so discovery is a bounded port scan. Three
//! strategies feed one registry concurrently:
//!
//! - **Known addresses**: where cameras put themselves when they run their own access point
//! - **Interface gateways**: `.1` and `.0` behind Wi-Fi and Wi-Fi Direct interfaces
//! - **Local subnet**: a handful of hosts on the machine's own /24, started after a short
//!   head start so the other strategies win ties
//!
//! The whole run has one deadline. When it passes, outstanding probes are aborted
//! and whatever was found so far is returned. Partial results are the expected
//! outcome on a busy network, not an error.

pub mod candidates;
pub mod probe;
mod registry;


use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::DiscoveryConfig;
use candidates::Candidate;
use registry::Registry;

/// How a camera was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// One of the well-known camera access point addresses
    CommonIp,
    SubnetScan,
    InterfaceGateway,
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::CommonIp => "common_ip",
            Self::SubnetScan => "subnet_scan",
            Self::InterfaceGateway => "interface_gateway",
        };
        f.write_str(tag)
    }
}

/// A host with the PTP/IP port open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub address: Ipv4Addr,
    pub port: u16,
    /// Friendly name from the init handshake, if the camera answered it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    pub method: DiscoveryMethod,
}

impl Camera {
    pub fn new(address: Ipv4Addr, port: u16, method: DiscoveryMethod) -> Self {
        Self {
            address,
            port,
            name: None,
            manufacturer: None,
            method,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address.into(), self.port)
    }
}

/// Callback for each newly found camera.
pub type FoundCallback = Arc<dyn Fn(&Camera) + Send + Sync>;

/// State shared by every probe task of one run.
struct ProbeContext {
    port: u16,
    probe_timeout: Duration,
    subnet_head_start: Duration,
    identify: bool,
    registry: Registry,
    semaphore: Semaphore,
    on_found: FoundCallback,
}

/// Scans the local network for cameras until `config.timeout` elapses.
///
/// `on_found` runs once per camera, from a probe task, in whatever order probes
/// finish. Cameras whose name lookup was still running at the deadline are reported
/// to `on_found` just before returning. Never fails: no cameras is an empty list.
pub async fn discover<F>(config: &DiscoveryConfig, on_found: F) -> Vec<Camera>
where
    F: Fn(&Camera) + Send + Sync + 'static,
{
    let interfaces = if config.scan_subnet || config.scan_interfaces {
        candidates::local_interfaces()
    } else {
        Vec::new()
    };
    let plan = candidates::plan(config, &interfaces);
    discover_candidates(config, plan, Arc::new(on_found)).await
}

/// Probes an explicit candidate list. [`discover`] builds the list from the config
/// and the local interfaces.
pub async fn discover_candidates(config: &DiscoveryConfig, plan: Vec<Candidate>, on_found: FoundCallback) -> Vec<Camera> {
    info!(
        "Discovering cameras on port {}: {} candidates, {:?} budget",
        config.port,
        plan.len(),
        config.timeout
    );
    let context = Arc::new(ProbeContext {
        port: config.port,
        probe_timeout: config.probe_timeout,
        subnet_head_start: config.subnet_head_start,
        identify: config.identify,
        registry: Registry::default(),
        semaphore: Semaphore::new(config.max_concurrent_probes.max(1)),
        on_found,
    });

    let mut tasks = JoinSet::new();
    for candidate in plan {
        tasks.spawn(probe_candidate(Arc::clone(&context), candidate));
    }

    let all_done = tokio::time::timeout(config.timeout, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if all_done.is_err() {
        debug!(
            "Discovery deadline reached with {} probes outstanding, {} camera(s) found",
            tasks.len(),
            context.registry.len()
        );
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }

    for camera in context.registry.take_unnotified() {
        (context.on_found)(&camera);
    }
    let cameras = context.registry.snapshot();
    info!("Discovery finished: {} camera(s)", cameras.len());
    cameras
}

async fn probe_candidate(context: Arc<ProbeContext>, candidate: Candidate) {
    if candidate.method == DiscoveryMethod::SubnetScan && !context.subnet_head_start.is_zero() {
        tokio::time::sleep(context.subnet_head_start).await;
    }
    if context.registry.contains(candidate.address) {
        return;
    }
    let Ok(_permit) = context.semaphore.acquire().await else {
        return;
    };

    let addr = SocketAddr::new(candidate.address.into(), context.port);
    let Some(stream) = probe::probe(addr, context.probe_timeout).await else {
        return;
    };
    if !context
        .registry
        .insert_if_absent(Camera::new(candidate.address, context.port, candidate.method))
    {
        return;
    }
    info!("Found camera at {} ({})", addr, candidate.method);

    if context.identify {
        let name = probe::identify(stream, context.probe_timeout).await;
        debug!("{} identifies as {:?}", addr, name);
        context.registry.enrich(candidate.address, name);
    } else {
        drop(stream);
    }

    if let Some(camera) = context.registry.take_for_notify(candidate.address) {
        (context.on_found)(&camera);
    }
}
