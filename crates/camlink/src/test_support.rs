//! Test fixtures: dataset encoders, sample datasets, and a loopback fake camera.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ClientConfig;
use crate::ignore_poison::IgnorePoison;
use crate::ptp::packet::{encode_packet, read_packet};
use crate::ptp::{DeviceInfo, ObjectInfo, PacketType, PayloadReader, PayloadWriter, ResponseCode, StorageInfo};

// ============================================================================
// Dataset encoding
// ============================================================================

/// Encodes a dataset the way a camera would send it.
pub(crate) trait DatasetBytes {
    fn to_bytes(&self) -> Vec<u8>;
}

impl DatasetBytes for DeviceInfo {
    fn to_bytes(&self) -> Vec<u8> {
        let mut w = PayloadWriter::new();
        w.put_u16(self.standard_version)
            .put_u32(self.vendor_extension_id)
            .put_u16(self.vendor_extension_version);
        w.put_string(&self.vendor_extension_desc).unwrap();
        w.put_u16(self.functional_mode)
            .put_u16_array(&self.operations_supported)
            .put_u16_array(&self.events_supported)
            .put_u16_array(&self.device_properties_supported)
            .put_u16_array(&self.capture_formats)
            .put_u16_array(&self.image_formats);
        w.put_string(&self.manufacturer).unwrap();
        w.put_string(&self.model).unwrap();
        w.put_string(&self.device_version).unwrap();
        w.put_string(&self.serial_number).unwrap();
        w.into_vec()
    }
}

impl DatasetBytes for StorageInfo {
    fn to_bytes(&self) -> Vec<u8> {
        let mut w = PayloadWriter::new();
        w.put_u16(self.storage_type)
            .put_u16(self.filesystem_type)
            .put_u16(self.access_capability)
            .put_u64(self.max_capacity)
            .put_u64(self.free_space_in_bytes)
            .put_u32(self.free_space_in_images);
        w.put_string(&self.storage_description).unwrap();
        w.put_string(&self.volume_label).unwrap();
        w.into_vec()
    }
}

impl DatasetBytes for ObjectInfo {
    fn to_bytes(&self) -> Vec<u8> {
        let mut w = PayloadWriter::new();
        w.put_u32(self.storage_id)
            .put_u16(self.object_format)
            .put_u16(self.protection_status)
            .put_u32(self.object_compressed_size)
            .put_u16(self.thumb_format)
            .put_u32(self.thumb_compressed_size)
            .put_u32(self.thumb_pix_width)
            .put_u32(self.thumb_pix_height)
            .put_u32(self.image_pix_width)
            .put_u32(self.image_pix_height)
            .put_u32(self.image_bit_depth)
            .put_u32(self.parent_object)
            .put_u16(self.association_type)
            .put_u32(self.association_desc)
            .put_u32(self.sequence_number);
        w.put_string(&self.filename).unwrap();
        w.put_string(&self.capture_date).unwrap();
        w.put_string(&self.modification_date).unwrap();
        w.put_string(&self.keywords).unwrap();
        w.into_vec()
    }
}

// ============================================================================
// Sample datasets
// ============================================================================

pub(crate) const SAMPLE_STORAGE_ID: u32 = 0x0001_0001;

/// A Canon-like camera. Supports GetThumb but not GetNumObjects.
pub(crate) fn sample_device_info() -> DeviceInfo {
    DeviceInfo {
        standard_version: 100,
        vendor_extension_id: 0x0000_000B,
        vendor_extension_version: 100,
        vendor_extension_desc: "microsoft.com: 1.0".to_string(),
        functional_mode: 0,
        operations_supported: vec![
            0x1001, 0x1002, 0x1003, 0x1004, 0x1005, 0x1007, 0x1008, 0x1009, 0x100A,
        ],
        events_supported: vec![0x4002, 0x4003, 0x400C],
        device_properties_supported: vec![0x5001, 0x5003],
        capture_formats: vec![0x3800],
        image_formats: vec![0x3800, 0xB103, 0xB104],
        manufacturer: "Canon Inc.".to_string(),
        model: "Canon EOS R6".to_string(),
        device_version: "1-1.5.0".to_string(),
        serial_number: "012345678901".to_string(),
    }
}

pub(crate) fn sample_storage_info() -> StorageInfo {
    StorageInfo {
        storage_type: 4,
        filesystem_type: 2,
        access_capability: 0,
        max_capacity: 64_000_000_000,
        free_space_in_bytes: 32_000_000_000,
        free_space_in_images: 1234,
        storage_description: "SD1".to_string(),
        volume_label: "EOS_DIGITAL".to_string(),
    }
}

pub(crate) fn sample_object_info(format: u16, filename: &str) -> ObjectInfo {
    ObjectInfo {
        storage_id: SAMPLE_STORAGE_ID,
        object_format: format,
        protection_status: 0,
        object_compressed_size: 4_500_000,
        thumb_format: 0x3808,
        thumb_compressed_size: 12_000,
        thumb_pix_width: 160,
        thumb_pix_height: 120,
        image_pix_width: 6000,
        image_pix_height: 4000,
        image_bit_depth: 24,
        parent_object: 0,
        association_type: 0,
        association_desc: 0,
        sequence_number: 0,
        filename: filename.to_string(),
        capture_date: "20240315T142530".to_string(),
        modification_date: "20240315T142530".to_string(),
        keywords: String::new(),
    }
}

/// Deterministic object bytes: a JPEG SOI marker followed by a pattern.
pub(crate) fn sample_object_bytes(handle: u32, len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend((0..len.saturating_sub(2)).map(|i| (i as u32).wrapping_add(handle) as u8));
    bytes
}

pub(crate) fn sample_thumb_bytes(handle: u32) -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xDB, handle as u8, 0xFF, 0xD9]
}

/// Client settings with short deadlines so failing tests fail fast.
pub(crate) fn fast_client_config() -> ClientConfig {
    ClientConfig {
        connect_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(2),
        event_timeout: Duration::from_millis(500),
        host_name: "camlink-test".to_string(),
    }
}

// ============================================================================
// Fake camera
// ============================================================================

pub(crate) const FAKE_CONNECTION_NUMBER: u32 = 7;
pub(crate) const FAKE_CAMERA_NAME: &str = "FakeCam";

/// One object the fake camera serves.
#[derive(Debug, Clone)]
pub(crate) struct FakeObject {
    pub handle: u32,
    /// `None` makes GetObjectInfo fail for this handle.
    pub info: Option<ObjectInfo>,
    pub bytes: Vec<u8>,
}

/// Behavior switches for [`FakeCamera`].
#[derive(Debug, Clone)]
pub(crate) struct FakeCameraOptions {
    /// Ack Init Event Requests. When false they get Init Fail.
    pub event_channel: bool,
    /// Answer Init Command Requests with Init Fail.
    pub reject_init: bool,
    /// Answer OpenSession with this code instead of OK.
    pub open_session_code: ResponseCode,
    /// Refuse GetDeviceInfo.
    pub device_info: Option<DeviceInfo>,
    pub storages: Vec<(u32, StorageInfo)>,
    pub objects: Vec<FakeObject>,
    /// Serve thumbnails for every object.
    pub thumbnails: bool,
    /// Max payload bytes per Data packet.
    pub chunk_size: usize,
    /// Send an unknown packet and a stray Event before every response.
    pub stray_packets: bool,
    /// Tag data packets of this operation with a wrong transaction id.
    pub wrong_data_tid_for: Option<u16>,
    /// Send Start Data for this operation, then hang up.
    pub hang_up_on: Option<u16>,
    /// Never answer this operation.
    pub stall_on: Option<u16>,
    /// Answer GetNumObjects with this count as the first parameter.
    pub num_objects: Option<u32>,
}

impl Default for FakeCameraOptions {
    fn default() -> Self {
        let objects = (1..=3)
            .map(|handle| FakeObject {
                handle,
                info: Some(sample_object_info(0x3800, &format!("IMG_000{handle}.JPG"))),
                bytes: sample_object_bytes(handle, 2500),
            })
            .collect();
        Self {
            event_channel: true,
            reject_init: false,
            open_session_code: ResponseCode::OK,
            device_info: Some(sample_device_info()),
            storages: vec![(SAMPLE_STORAGE_ID, sample_storage_info())],
            objects,
            thumbnails: true,
            chunk_size: 1000,
            stray_packets: false,
            wrong_data_tid_for: None,
            hang_up_on: None,
            stall_on: None,
            num_objects: None,
        }
    }
}

/// A command the fake camera received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCommand {
    pub op_code: u16,
    pub transaction_id: u32,
    pub params: Vec<u32>,
}

/// An Init Event Request some endpoint received.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventRequest {
    pub connection_number: u32,
    pub accepted: bool,
    pub at: Instant,
}

type EventLog = Mutex<Vec<EventRequest>>;

/// A PTP/IP camera on a loopback port, one thread per connection.
pub(crate) struct FakeCamera {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<RecordedCommand>>>,
    events: Arc<EventLog>,
}

impl FakeCamera {
    pub fn start(options: FakeCameraOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(EventLog::default());
        let options = Arc::new(options);

        let accept_commands = Arc::clone(&commands);
        let accept_events = Arc::clone(&events);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let options = Arc::clone(&options);
                let commands = Arc::clone(&accept_commands);
                let events = Arc::clone(&accept_events);
                thread::spawn(move || {
                    let _ = serve_connection(stream, &options, &commands, &events);
                });
            }
        });

        Self { addr, commands, events }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock_ignore_poison().clone()
    }

    pub fn op_codes(&self) -> Vec<u16> {
        self.commands().iter().map(|c| c.op_code).collect()
    }

    /// Event connections that were acked.
    pub fn event_connections(&self) -> usize {
        self.event_requests().iter().filter(|r| r.accepted).count()
    }

    pub fn event_requests(&self) -> Vec<EventRequest> {
        self.events.lock_ignore_poison().clone()
    }

    /// Waits briefly for the server threads to record trailing commands (like
    /// CloseSession sent during disconnect).
    pub fn wait_for_op(&self, op_code: u16) -> bool {
        for _ in 0..100 {
            if self.op_codes().contains(&op_code) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

fn send(stream: &mut TcpStream, packet_type: PacketType, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(&encode_packet(packet_type.as_u32(), payload))
}

fn serve_connection(
    mut stream: TcpStream,
    options: &FakeCameraOptions,
    commands: &Mutex<Vec<RecordedCommand>>,
    events: &EventLog,
) -> std::io::Result<()> {
    let first = read_packet(&mut stream)?;
    match first.kind() {
        Some(PacketType::InitCommandRequest) => {
            if options.reject_init {
                return send(&mut stream, PacketType::InitFail, &1u32.to_le_bytes());
            }
            let mut ack = PayloadWriter::new();
            ack.put_u32(FAKE_CONNECTION_NUMBER)
                .put_bytes(&[0x42; 16])
                .put_null_terminated_utf16(FAKE_CAMERA_NAME)
                .put_u32(0x0001_0000);
            send(&mut stream, PacketType::InitCommandAck, &ack.into_vec())?;
            serve_commands(stream, options, commands)
        }
        Some(PacketType::InitEventRequest) => serve_event_request(stream, &first.payload, options.event_channel, events),
        _ => Ok(()),
    }
}

/// Acks (or refuses) an event connection and holds it open until the client closes it.
fn serve_event_request(mut stream: TcpStream, payload: &[u8], accept: bool, events: &EventLog) -> std::io::Result<()> {
    let connection_number = PayloadReader::new(payload).read_u32().unwrap_or(0);
    let accepted = accept && connection_number == FAKE_CONNECTION_NUMBER;
    events.lock_ignore_poison().push(EventRequest {
        connection_number,
        accepted,
        at: Instant::now(),
    });
    if !accepted {
        return send(&mut stream, PacketType::InitFail, &1u32.to_le_bytes());
    }
    send(&mut stream, PacketType::InitEventAck, &[])?;
    let mut sink = [0u8; 64];
    while stream.read(&mut sink)? > 0 {}
    Ok(())
}

fn serve_commands(
    mut stream: TcpStream,
    options: &FakeCameraOptions,
    commands: &Mutex<Vec<RecordedCommand>>,
) -> std::io::Result<()> {
    loop {
        let packet = read_packet(&mut stream)?;
        if packet.kind() != Some(PacketType::OperationRequest) {
            continue;
        }
        let mut reader = PayloadReader::new(&packet.payload);
        let (Ok(_data_phase), Ok(op_code), Ok(tid)) = (reader.read_u32(), reader.read_u16(), reader.read_u32()) else {
            continue;
        };
        let mut params = Vec::new();
        while let Ok(param) = reader.read_u32() {
            params.push(param);
        }
        commands.lock_ignore_poison().push(RecordedCommand {
            op_code,
            transaction_id: tid,
            params: params.clone(),
        });

        if options.stall_on == Some(op_code) {
            continue;
        }
        if options.hang_up_on == Some(op_code) {
            let mut start = PayloadWriter::new();
            start.put_u32(tid).put_u64(1_000_000);
            send(&mut stream, PacketType::StartData, &start.into_vec())?;
            stream.shutdown(Shutdown::Both)?;
            return Ok(());
        }

        let (code, data, response_params) = answer(options, op_code, &params);
        if options.stray_packets {
            send_raw(&mut stream, 0x99, &[0xAB; 5])?;
            send(&mut stream, PacketType::Event, &[0x02, 0x40, 0, 0, 0, 0, 0, 0, 0, 0])?;
        }
        if let Some(data) = data {
            let data_tid = if options.wrong_data_tid_for == Some(op_code) {
                tid + 100
            } else {
                tid
            };
            send_data_phase(&mut stream, data_tid, &data, options.chunk_size)?;
        }
        let mut response = PayloadWriter::new();
        response.put_u16(code.0).put_u32(tid);
        for param in response_params {
            response.put_u32(param);
        }
        send(&mut stream, PacketType::OperationResponse, &response.into_vec())?;
    }
}

fn send_raw(stream: &mut TcpStream, packet_type: u32, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(&encode_packet(packet_type, payload))
}

/// Start Data, then Data packets, with the last chunk in End Data.
fn send_data_phase(stream: &mut TcpStream, tid: u32, data: &[u8], chunk_size: usize) -> std::io::Result<()> {
    let mut start = PayloadWriter::new();
    start.put_u32(tid).put_u64(data.len() as u64);
    send(stream, PacketType::StartData, &start.into_vec())?;

    let chunks: Vec<&[u8]> = data.chunks(chunk_size.max(1)).collect();
    let (last, middle) = match chunks.split_last() {
        Some((last, middle)) => (*last, middle),
        None => (&[][..], &[][..]),
    };
    for chunk in middle {
        let mut packet = PayloadWriter::new();
        packet.put_u32(tid).put_bytes(chunk);
        send(stream, PacketType::Data, &packet.into_vec())?;
    }
    let mut end = PayloadWriter::new();
    end.put_u32(tid).put_bytes(last);
    send(stream, PacketType::EndData, &end.into_vec())
}

fn u32_array(values: &[u32]) -> Vec<u8> {
    let mut w = PayloadWriter::new();
    w.put_u32_array(values);
    w.into_vec()
}

/// Response code, optional data phase, and response params for one command.
fn answer(options: &FakeCameraOptions, op_code: u16, params: &[u32]) -> (ResponseCode, Option<Vec<u8>>, Vec<u32>) {
    let first = params.first().copied().unwrap_or(0);
    let object = || options.objects.iter().find(|o| o.handle == first);
    match op_code {
        0x1001 => match &options.device_info {
            Some(info) => (ResponseCode::OK, Some(info.to_bytes()), vec![]),
            None => (ResponseCode::OPERATION_NOT_SUPPORTED, None, vec![]),
        },
        0x1002 => (options.open_session_code, None, vec![]),
        0x1003 => (ResponseCode::OK, None, vec![]),
        0x1004 => {
            let ids: Vec<u32> = options.storages.iter().map(|(id, _)| *id).collect();
            (ResponseCode::OK, Some(u32_array(&ids)), vec![])
        }
        0x1005 => match options.storages.iter().find(|(id, _)| *id == first) {
            Some((_, info)) => (ResponseCode::OK, Some(info.to_bytes()), vec![]),
            None => (ResponseCode::INVALID_STORAGE_ID, None, vec![]),
        },
        0x1006 => match options.num_objects {
            Some(count) => (ResponseCode::OK, None, vec![count]),
            None => (ResponseCode::OPERATION_NOT_SUPPORTED, None, vec![]),
        },
        0x1007 => {
            let handles: Vec<u32> = options.objects.iter().map(|o| o.handle).collect();
            (ResponseCode::OK, Some(u32_array(&handles)), vec![])
        }
        0x1008 => match object().and_then(|o| o.info.as_ref()) {
            Some(info) => (ResponseCode::OK, Some(info.to_bytes()), vec![]),
            None => (ResponseCode::INVALID_OBJECT_HANDLE, None, vec![]),
        },
        0x1009 => match object() {
            Some(o) => (ResponseCode::OK, Some(o.bytes.clone()), vec![]),
            None => (ResponseCode::INVALID_OBJECT_HANDLE, None, vec![]),
        },
        0x100A => match object() {
            Some(o) if options.thumbnails => (ResponseCode::OK, Some(sample_thumb_bytes(o.handle)), vec![]),
            Some(_) => (ResponseCode::NO_THUMBNAIL_PRESENT, None, vec![]),
            None => (ResponseCode::INVALID_OBJECT_HANDLE, None, vec![]),
        },
        _ => (ResponseCode::OPERATION_NOT_SUPPORTED, None, vec![]),
    }
}

/// Event-only endpoint on a fixed loopback port, for cameras that take the event
/// connection somewhere other than the command port.
pub(crate) struct FakeEventPort {
    events: Arc<EventLog>,
}

impl FakeEventPort {
    /// `None` if the port is taken.
    pub fn bind(port: u16) -> Option<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).ok()?;
        let events = Arc::new(EventLog::default());
        let accept_events = Arc::clone(&events);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let events = Arc::clone(&accept_events);
                thread::spawn(move || {
                    let Ok(first) = read_packet(&mut stream) else { return };
                    if first.kind() == Some(PacketType::InitEventRequest) {
                        let _ = serve_event_request(stream, &first.payload, true, &events);
                    }
                });
            }
        });
        Some(Self { events })
    }

    pub fn event_requests(&self) -> Vec<EventRequest> {
        self.events.lock_ignore_poison().clone()
    }
}

/// A loopback port with nothing listening on it.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
