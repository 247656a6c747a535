//! PTP/IP packet framing.
//!
//! Every packet starts with an 8-byte header: u32 total length (header included)
//! and u32 packet type, both little-endian. Builders here produce complete packets
//! ready to write; parsers take the payload that follows the header.

use std::io::{self, Read};

use bytes::Buf;

use super::codes::{PacketType, ResponseCode};
use super::errors::DecodeError;
use super::reader::PayloadReader;
use super::writer::PayloadWriter;

/// Size of the length + type header.
pub const HEADER_LEN: usize = 8;

/// PTP/IP protocol version 1.0 as sent in the init request.
pub const PROTOCOL_VERSION: u32 = 0x0001_0000;

/// Operation requests carry at most five parameters.
pub const MAX_OPERATION_PARAMS: usize = 5;

/// Data phase value for operations with no data or with device-to-host data.
const DATA_PHASE_NONE_OR_IN: u32 = 1;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total packet length, header included.
    pub length: u32,
    /// Raw type value; see [`PacketHeader::kind`].
    pub packet_type: u32,
}

impl PacketHeader {
    /// Parses and validates a header.
    pub fn parse(bytes: [u8; HEADER_LEN]) -> Result<Self, DecodeError> {
        let mut buf = &bytes[..];
        let length = buf.get_u32_le();
        let packet_type = buf.get_u32_le();
        if (length as usize) < HEADER_LEN {
            return Err(DecodeError::InvalidLength { declared: length });
        }
        Ok(Self { length, packet_type })
    }

    pub fn payload_len(&self) -> usize {
        self.length as usize - HEADER_LEN
    }

    pub fn kind(&self) -> Option<PacketType> {
        PacketType::from_u32(self.packet_type)
    }
}

/// A packet read off the wire, payload fully consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl RawPacket {
    pub fn kind(&self) -> Option<PacketType> {
        self.header.kind()
    }

    /// Serializes the packet back to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        encode_packet(self.header.packet_type, &self.payload)
    }
}

/// Frames `payload` with a header for `packet_type`.
pub fn encode_packet(packet_type: u32, payload: &[u8]) -> Vec<u8> {
    let mut writer = PayloadWriter::new();
    writer
        .put_u32((HEADER_LEN + payload.len()) as u32)
        .put_u32(packet_type)
        .put_bytes(payload);
    writer.into_vec()
}

fn invalid_data(err: DecodeError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Reads one header. A length shorter than the header is reported as `InvalidData`.
pub fn read_header<R: Read>(reader: &mut R) -> io::Result<PacketHeader> {
    let mut bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut bytes)?;
    PacketHeader::parse(bytes).map_err(invalid_data)
}

/// Reads exactly the payload `header` declares.
///
/// The buffer grows as bytes arrive rather than trusting the declared length up front.
pub fn read_payload<R: Read>(reader: &mut R, header: &PacketHeader) -> io::Result<Vec<u8>> {
    let expected = header.payload_len();
    let mut payload = Vec::new();
    reader.take(expected as u64).read_to_end(&mut payload)?;
    if payload.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("packet payload truncated: got {} of {} bytes", payload.len(), expected),
        ));
    }
    Ok(payload)
}

/// Discards the payload `header` declares, keeping the stream aligned.
pub fn skip_payload<R: Read>(reader: &mut R, header: &PacketHeader) -> io::Result<()> {
    let expected = header.payload_len() as u64;
    let skipped = io::copy(&mut reader.take(expected), &mut io::sink())?;
    if skipped != expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("stream ended after skipping {skipped} of {expected} bytes"),
        ));
    }
    Ok(())
}

/// Reads a full packet: header plus exactly `length - 8` payload bytes.
pub fn read_packet<R: Read>(reader: &mut R) -> io::Result<RawPacket> {
    let header = read_header(reader)?;
    let payload = read_payload(reader, &header)?;
    Ok(RawPacket { header, payload })
}

// ============================================================================
// Outbound packets
// ============================================================================

/// Builds an Init Command Request: GUID, host name, protocol version.
pub fn init_command_request(guid: &[u8; 16], host_name: &str) -> Vec<u8> {
    let mut payload = PayloadWriter::new();
    payload
        .put_bytes(guid)
        .put_null_terminated_utf16(host_name)
        .put_u32(PROTOCOL_VERSION);
    encode_packet(PacketType::InitCommandRequest.as_u32(), &payload.into_vec())
}

/// Builds an Init Event Request carrying the connection number from the command ack.
pub fn init_event_request(connection_number: u32) -> Vec<u8> {
    let mut payload = PayloadWriter::new();
    payload.put_u32(connection_number);
    encode_packet(PacketType::InitEventRequest.as_u32(), &payload.into_vec())
}

/// Builds an Operation Request.
///
/// Callers are expected to keep `params` within [`MAX_OPERATION_PARAMS`].
pub fn operation_request(op_code: u16, transaction_id: u32, params: &[u32]) -> Vec<u8> {
    let mut payload = PayloadWriter::new();
    payload
        .put_u32(DATA_PHASE_NONE_OR_IN)
        .put_u16(op_code)
        .put_u32(transaction_id);
    for param in params {
        payload.put_u32(*param);
    }
    encode_packet(PacketType::OperationRequest.as_u32(), &payload.into_vec())
}

// ============================================================================
// Inbound packets
// ============================================================================

/// Payload of an Init Command Ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitCommandAck {
    pub connection_number: u32,
    pub guid: [u8; 16],
    /// Friendly name of the responder. Empty if the device sent none.
    pub name: String,
    /// Trailing protocol version, when the device includes one.
    pub protocol_version: Option<u32>,
}

impl InitCommandAck {
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = PayloadReader::new(payload);
        let connection_number = reader.read_u32()?;
        let mut guid = [0u8; 16];
        guid.copy_from_slice(reader.read_bytes(16)?);
        let name = reader.read_null_terminated_utf16();
        let protocol_version = if reader.remaining() >= 4 {
            Some(reader.read_u32()?)
        } else {
            None
        };
        Ok(Self {
            connection_number,
            guid,
            name,
            protocol_version,
        })
    }
}

/// Reason code carried by an Init Fail packet.
pub fn parse_init_fail_reason(payload: &[u8]) -> Option<u32> {
    PayloadReader::new(payload).read_u32().ok()
}

/// Payload of a Start Data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartData {
    pub transaction_id: u32,
    pub total_length: u64,
}

impl StartData {
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = PayloadReader::new(payload);
        Ok(Self {
            transaction_id: reader.read_u32()?,
            total_length: reader.read_u64()?,
        })
    }
}

/// Splits a Data or End Data payload into its transaction id and the data bytes.
pub fn split_data_payload(payload: &[u8]) -> Result<(u32, &[u8]), DecodeError> {
    let mut reader = PayloadReader::new(payload);
    let transaction_id = reader.read_u32()?;
    Ok((transaction_id, reader.rest()))
}

/// Payload of an Operation Response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResponse {
    pub code: ResponseCode,
    pub transaction_id: u32,
    pub params: Vec<u32>,
}

impl OperationResponse {
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = PayloadReader::new(payload);
        let code = ResponseCode(reader.read_u16()?);
        let transaction_id = reader.read_u32()?;
        let mut params = Vec::new();
        while reader.remaining() >= 4 {
            params.push(reader.read_u32()?);
        }
        Ok(Self {
            code,
            transaction_id,
            params,
        })
    }
}
