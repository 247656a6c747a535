//! PTP/IP init exchanges on the command and event connections.

use std::io::{Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use log::{debug, info, warn};

use super::errors::PtpIpError;
use crate::ptp::PacketType;
use crate::ptp::packet::{
    InitCommandAck, init_command_request, init_event_request, parse_init_fail_reason, read_header, read_payload,
    skip_payload,
};

/// Fixed event ports some cameras use instead of the command port.
const FALLBACK_EVENT_PORTS: [u16; 2] = [15741, 15742];

/// Sends the Init Command Request and waits for the ack.
///
/// Anything other than an Init Command Ack (including Init Fail) is a protocol error.
pub(super) fn init_command<S: Read + Write>(
    stream: &mut S,
    guid: &[u8; 16],
    host_name: &str,
    address: &str,
) -> Result<InitCommandAck, PtpIpError> {
    stream
        .write_all(&init_command_request(guid, host_name))
        .and_then(|_| stream.flush())
        .map_err(|e| PtpIpError::from_io(&e, address))?;

    let header = read_header(stream).map_err(|e| PtpIpError::from_io(&e, address))?;
    let payload = read_payload(stream, &header).map_err(|e| PtpIpError::from_io(&e, address))?;

    match header.kind() {
        Some(PacketType::InitCommandAck) => {
            let ack = InitCommandAck::parse(&payload).map_err(|e| PtpIpError::from_decode(&e, address))?;
            debug!(
                "Init command ack from {}: connection {}, name {:?}, version {:?}",
                address, ack.connection_number, ack.name, ack.protocol_version
            );
            Ok(ack)
        }
        Some(PacketType::InitFail) => {
            let reason = parse_init_fail_reason(&payload)
                .map(|r| format!("0x{r:08X}"))
                .unwrap_or_else(|| "unknown".to_string());
            Err(PtpIpError::protocol(
                address,
                format!("camera rejected the connection (reason {reason})"),
            ))
        }
        _ => Err(PtpIpError::protocol(
            address,
            format!("expected Init Command Ack, got packet type {}", header.packet_type),
        )),
    }
}

/// Ports to try for the event connection, in order, without duplicates.
pub fn event_port_candidates(port: u16) -> Vec<u16> {
    let mut ports = Vec::with_capacity(4);
    let next = port.checked_add(1);
    for candidate in [Some(port), next, Some(FALLBACK_EVENT_PORTS[0]), Some(FALLBACK_EVENT_PORTS[1])]
        .into_iter()
        .flatten()
    {
        if !ports.contains(&candidate) {
            ports.push(candidate);
        }
    }
    ports
}

/// Tries each event port candidate until one acks. None succeeding is fine: many
/// cameras work without an event connection.
pub(super) fn open_event_channel(
    ip: IpAddr,
    port: u16,
    connection_number: u32,
    timeout: Duration,
) -> Option<TcpStream> {
    for candidate in event_port_candidates(port) {
        let addr = SocketAddr::new(ip, candidate);
        match try_event_port(addr, connection_number, timeout) {
            Ok(stream) => {
                info!("Event connection established on {}", addr);
                return Some(stream);
            }
            Err(e) => debug!("Event connection on {} failed: {}", addr, e),
        }
    }
    warn!("No event connection available for {}, continuing without events", ip);
    None
}

fn try_event_port(addr: SocketAddr, connection_number: u32, timeout: Duration) -> Result<TcpStream, PtpIpError> {
    let label = addr.to_string();
    let io_err = |e: std::io::Error| PtpIpError::from_io(&e, &label);

    let mut stream = TcpStream::connect_timeout(&addr, timeout).map_err(io_err)?;
    stream.set_read_timeout(Some(timeout)).map_err(io_err)?;
    stream.set_write_timeout(Some(timeout)).map_err(io_err)?;

    let result = (|| {
        stream.write_all(&init_event_request(connection_number)).map_err(io_err)?;
        let header = read_header(&mut stream).map_err(io_err)?;
        skip_payload(&mut stream, &header).map_err(io_err)?;
        match header.kind() {
            Some(PacketType::InitEventAck) => Ok(()),
            Some(PacketType::InitFail) => Err(PtpIpError::protocol(&label, "camera refused the event connection")),
            _ => Err(PtpIpError::protocol(
                &label,
                format!("expected Init Event Ack, got packet type {}", header.packet_type),
            )),
        }
    })();

    match result {
        Ok(()) => Ok(stream),
        Err(e) => {
            let _ = stream.shutdown(Shutdown::Both);
            Err(e)
        }
    }
}
