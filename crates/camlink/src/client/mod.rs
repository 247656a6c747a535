//! PTP/IP protocol client.
//!
//! One client owns one command connection (plus an optional event connection) to a
//! single camera and runs one PTP session over it. All methods take `&mut self`, so
//! commands are serialized by the borrow checker; wrap the client in a mutex to share
//! it.
//!
//! ## Lifecycle
//!
//! `connect` walks `Disconnected -> CommandConnected -> (EventConnected)? -> SessionOpen`.
//! Any failure before the session is open tears everything down again. After that,
//! failures are per call: a non-OK response code is returned to the caller and the
//! session stays open.
//!
//! ## Sync
//!
//! A response cycle always consumes whole packets. If an I/O error interrupts a
//! cycle halfway, the client can no longer tell where the next packet starts, so it
//! marks the command channel out of sync and refuses further commands until the next
//! `connect`. This keeps a late reply from being read as the answer to a newer command.

pub mod errors;
mod handshake;
mod operations;


pub use errors::PtpIpError;
pub use handshake::event_port_candidates;
pub use operations::ALL_STORAGES;

use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::ptp::packet::{
    MAX_OPERATION_PARAMS, OperationResponse, StartData, operation_request, read_header, read_payload, skip_payload,
    split_data_payload,
};
use crate::ptp::{DeviceInfo, OperationCode, PacketType, ResponseCode};

/// Session id used for the one session this client opens.
const SESSION_ID: u32 = 1;

/// Name reported when the camera didn't provide device info.
pub const UNKNOWN_CAMERA_NAME: &str = "Unknown Camera";

/// Session and transaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Zero when no session is open.
    pub session_id: u32,
    /// Id of the last command sent. Starts at 0; OpenSession uses 0 and doesn't advance it.
    pub transaction_id: u32,
    /// Assigned by the camera in the init ack.
    pub connection_number: u32,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.session_id != 0
    }
}

/// Outcome of one command exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtpResponse {
    pub code: ResponseCode,
    /// Concatenated data-phase payload. `None` if the camera sent no data phase.
    pub data: Option<Vec<u8>>,
    /// Response parameters, in order.
    pub params: Vec<u32>,
}

impl PtpResponse {
    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

/// Open command connection. Reads go through the buffer; writes go straight to the socket.
struct CommandChannel {
    stream: BufReader<TcpStream>,
    peer: SocketAddr,
    /// Set when a cycle was interrupted mid-packet.
    desynced: bool,
}

/// Client for one PTP/IP camera.
pub struct PtpIpClient {
    config: ClientConfig,
    /// `host:port` label used in errors and logs.
    address: String,
    command: Option<CommandChannel>,
    event: Option<TcpStream>,
    session: Session,
    device_info: Option<DeviceInfo>,
    peer_name: Option<String>,
}

impl PtpIpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            address: String::new(),
            command: None,
            event: None,
            session: Session::default(),
            device_info: None,
            peer_name: None,
        }
    }

    /// Connects, handshakes, and opens a session.
    ///
    /// An already connected client disconnects first. On error the client is left
    /// fully disconnected.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), PtpIpError> {
        if self.is_connected() {
            self.disconnect();
        }
        self.address = format!("{host}:{port}");

        let result = self.connect_inner(host, port);
        if let Err(e) = &result {
            warn!("Connecting to {} failed: {}", self.address, e);
            self.teardown();
        }
        result
    }

    fn connect_inner(&mut self, host: &str, port: u16) -> Result<(), PtpIpError> {
        if port == 0 {
            return Err(PtpIpError::Connection {
                address: self.address.clone(),
                message: "port must be non-zero".to_string(),
            });
        }

        info!("Opening command connection to {}", self.address);
        let mut stream = self.open_command_stream(host, port)?;
        let peer = stream.peer_addr().map_err(|e| PtpIpError::from_io(&e, &self.address))?;

        let guid = *uuid::Uuid::new_v4().as_bytes();
        let ack = handshake::init_command(&mut stream, &guid, &self.config.host_name, &self.address)?;
        self.session.connection_number = ack.connection_number;
        self.peer_name = Some(ack.name).filter(|name| !name.is_empty());
        self.command = Some(CommandChannel {
            stream: BufReader::new(stream),
            peer,
            desynced: false,
        });

        self.event = handshake::open_event_channel(
            peer.ip(),
            port,
            ack.connection_number,
            self.config.event_timeout,
        );

        // OpenSession goes out with transaction id 0 and leaves the counter alone, so the
        // first command inside the session is 1. Some clients send OpenSession as 1.
        let response = self.send_command(OperationCode::OpenSession, &[SESSION_ID])?;
        if !response.is_ok() {
            return Err(PtpIpError::Operation {
                address: self.address.clone(),
                operation: OperationCode::OpenSession.as_u16(),
                code: response.code,
            });
        }
        self.session.session_id = SESSION_ID;
        info!("Session opened with {}", self.address);

        // Convenience fetch; a camera that won't describe itself is still usable
        if self.get_device_info().is_none() {
            warn!("{} returned no device info", self.address);
        }
        info!("Connected to {} ({})", self.camera_name(), self.address);
        Ok(())
    }

    fn open_command_stream(&self, host: &str, port: u16) -> Result<TcpStream, PtpIpError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| PtpIpError::from_io(&e, &self.address))?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => {
                    let io_err = |e: std::io::Error| PtpIpError::from_io(&e, &self.address);
                    stream.set_read_timeout(Some(self.config.read_timeout)).map_err(io_err)?;
                    stream.set_write_timeout(Some(self.config.read_timeout)).map_err(io_err)?;
                    stream.set_nodelay(true).map_err(io_err)?;
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(PtpIpError::from_io(&e, &self.address));
                }
            }
        }
        Err(last_error.unwrap_or_else(|| PtpIpError::Connection {
            address: self.address.clone(),
            message: "host resolved to no addresses".to_string(),
        }))
    }

    /// Sends one command and reads its full response cycle.
    ///
    /// A non-OK response code is not an error here; it comes back in
    /// [`PtpResponse::code`]. Errors mean the exchange itself failed.
    pub fn send_command(&mut self, op: OperationCode, params: &[u32]) -> Result<PtpResponse, PtpIpError> {
        let address = self.address.clone();
        let Some(channel) = self.command.as_mut() else {
            return Err(PtpIpError::NotConnected);
        };
        if channel.desynced {
            return Err(PtpIpError::protocol(
                &address,
                "command connection is out of sync after an interrupted exchange; reconnect",
            ));
        }
        if op != OperationCode::OpenSession && !self.session.is_open() {
            return Err(PtpIpError::SessionNotOpen);
        }
        if params.len() > MAX_OPERATION_PARAMS {
            return Err(PtpIpError::protocol(
                &address,
                format!("{op:?} given {} parameters, at most {MAX_OPERATION_PARAMS} allowed", params.len()),
            ));
        }

        let transaction_id = if op == OperationCode::OpenSession {
            0
        } else {
            self.session.transaction_id = self.session.transaction_id.wrapping_add(1);
            self.session.transaction_id
        };
        debug!("-> {:?} tid={} params={:?}", op, transaction_id, params);

        let request = operation_request(op.as_u16(), transaction_id, params);
        let written = channel
            .stream
            .get_mut()
            .write_all(&request)
            .and_then(|_| channel.stream.get_mut().flush());
        if let Err(e) = written {
            channel.desynced = true;
            return Err(PtpIpError::from_io(&e, &address));
        }

        let result = read_response_cycle(&mut channel.stream, transaction_id, &address);
        match result {
            Ok(response) => {
                debug!(
                    "<- {:?} tid={} {} ({} data bytes)",
                    op,
                    transaction_id,
                    response.code,
                    response.data.as_ref().map_or(0, Vec::len)
                );
                Ok(response)
            }
            Err(CycleError::Io(e)) => {
                channel.desynced = true;
                Err(PtpIpError::from_io(&e, &address))
            }
            Err(CycleError::Rejected(e)) => Err(e),
        }
    }

    /// Closes the session (best effort) and both connections. Safe to call in any
    /// state, any number of times.
    pub fn disconnect(&mut self) {
        let was_connected = self.command.is_some();
        let in_sync = self.command.as_ref().is_some_and(|c| !c.desynced);
        if self.session.is_open() && in_sync {
            match self.send_command(OperationCode::CloseSession, &[]) {
                Ok(response) if !response.is_ok() => debug!("CloseSession answered {}", response.code),
                Ok(_) => {}
                Err(e) => debug!("CloseSession failed: {}", e),
            }
        }
        self.teardown();
        if was_connected {
            info!("Disconnected from {}", self.address);
        }
    }

    /// Shuts down both sockets and resets all session state.
    fn teardown(&mut self) {
        if let Some(channel) = self.command.take() {
            let _ = channel.stream.get_ref().shutdown(Shutdown::Both);
        }
        if let Some(event) = self.event.take() {
            let _ = event.shutdown(Shutdown::Both);
        }
        self.session = Session::default();
        self.device_info = None;
        self.peer_name = None;
    }

    pub fn is_connected(&self) -> bool {
        self.command.is_some()
    }

    pub fn has_event_channel(&self) -> bool {
        self.event.is_some()
    }

    pub fn session(&self) -> Session {
        self.session
    }

    /// Device info fetched during connect (or by the last successful `get_device_info`).
    pub fn cached_device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    /// The camera's model name, or "Unknown Camera".
    pub fn camera_name(&self) -> String {
        self.device_info
            .as_ref()
            .map(|info| info.model.clone())
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| UNKNOWN_CAMERA_NAME.to_string())
    }

    /// Friendly name from the init ack, if the camera sent one.
    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref()
    }

    /// A second handle to the command socket, for shutting it down from another
    /// thread while a command is in flight. The interrupted cycle fails with an I/O
    /// error and leaves the channel out of sync, so nothing it half-read is reused.
    pub fn shutdown_handle(&self) -> Option<TcpStream> {
        let channel = self.command.as_ref()?;
        match channel.stream.get_ref().try_clone() {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Couldn't clone the command socket for {}: {}", self.address, e);
                None
            }
        }
    }

    /// Address of the current command connection.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.command.as_ref().map(|c| c.peer)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for PtpIpClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Drop for PtpIpClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for PtpIpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtpIpClient")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .field("event_channel", &self.has_event_channel())
            .field("session", &self.session)
            .finish()
    }
}

enum CycleError {
    /// The stream failed mid-cycle; position in the stream is unknown.
    Io(std::io::Error),
    /// Every packet was consumed, but the exchange was invalid.
    Rejected(PtpIpError),
}

impl From<std::io::Error> for CycleError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Keeps the first packet whose transaction id differs from the request's.
fn note_mismatch(mismatch: &mut Option<(PacketType, u32)>, kind: PacketType, got: u32, expected: u32) {
    if got != expected && mismatch.is_none() {
        *mismatch = Some((kind, got));
    }
}

/// Reads packets until the Operation Response for `transaction_id`.
///
/// Data-phase payloads are concatenated in arrival order. Unknown packet types and
/// stray events are skipped by their declared length. A transaction id mismatch is
/// remembered and reported once the response packet has been consumed, so the
/// stream stays aligned for the next command.
fn read_response_cycle(
    stream: &mut BufReader<TcpStream>,
    transaction_id: u32,
    address: &str,
) -> Result<PtpResponse, CycleError> {
    let mut data: Option<Vec<u8>> = None;
    let mut mismatch: Option<(PacketType, u32)> = None;
    let decode_err = |e: crate::ptp::DecodeError| CycleError::Rejected(PtpIpError::from_decode(&e, address));

    loop {
        let header = read_header(stream)?;
        match header.kind() {
            Some(PacketType::StartData) => {
                let payload = read_payload(stream, &header)?;
                let start = StartData::parse(&payload).map_err(decode_err)?;
                note_mismatch(&mut mismatch, PacketType::StartData, start.transaction_id, transaction_id);
                debug!("Data phase starting, {} bytes announced", start.total_length);
                data.get_or_insert_with(Vec::new);
            }
            Some(kind @ (PacketType::Data | PacketType::EndData)) => {
                let payload = read_payload(stream, &header)?;
                let (tid, bytes) = split_data_payload(&payload).map_err(decode_err)?;
                note_mismatch(&mut mismatch, kind, tid, transaction_id);
                data.get_or_insert_with(Vec::new).extend_from_slice(bytes);
            }
            Some(PacketType::OperationResponse) => {
                let payload = read_payload(stream, &header)?;
                let response = OperationResponse::parse(&payload).map_err(decode_err)?;
                note_mismatch(&mut mismatch, PacketType::OperationResponse, response.transaction_id, transaction_id);
                if let Some((kind, got)) = mismatch {
                    return Err(CycleError::Rejected(PtpIpError::protocol(
                        address,
                        format!("{kind:?} carried transaction id {got}, expected {transaction_id}"),
                    )));
                }
                return Ok(PtpResponse {
                    code: response.code,
                    data,
                    params: response.params,
                });
            }
            other => {
                warn!(
                    "Skipping unexpected packet type {} ({:?}, {} bytes) from {}",
                    header.packet_type,
                    other,
                    header.length,
                    address
                );
                skip_payload(stream, &header)?;
            }
        }
    }
}
