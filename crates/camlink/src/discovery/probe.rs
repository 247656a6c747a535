//! Async TCP probe and the quick identify handshake.

use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::ptp::PacketType;
use crate::ptp::packet::{HEADER_LEN, InitCommandAck, PacketHeader, init_command_request};

/// Host name announced during the identify handshake.
const DISCOVERY_HOST_NAME: &str = "Discovery";

/// Init acks are tiny; anything bigger is not a camera worth parsing.
const MAX_ACK_PAYLOAD: usize = 1024;

/// One TCP connect attempt. Any failure or timeout means "closed".
pub async fn probe(addr: SocketAddr, probe_timeout: Duration) -> Option<TcpStream> {
    match timeout(probe_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Some(stream),
        Ok(Err(e)) => {
            debug!("Probe {} closed: {}", addr, e);
            None
        }
        Err(_) => None,
    }
}

/// Sends an Init Command Request on an open probe connection and returns the
/// friendly name from the ack, if any. The connection is dropped afterwards.
pub async fn identify(mut stream: TcpStream, read_timeout: Duration) -> Option<String> {
    let peer = stream.peer_addr().ok();
    match timeout(read_timeout, exchange_init(&mut stream)).await {
        Ok(Some(name)) if !name.is_empty() => Some(name),
        Ok(_) => None,
        Err(_) => {
            debug!("Identify handshake with {:?} timed out", peer);
            None
        }
    }
}

async fn exchange_init(stream: &mut TcpStream) -> Option<String> {
    stream.write_all(&init_command_request(&[0; 16], DISCOVERY_HOST_NAME)).await.ok()?;

    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await.ok()?;
    let header = PacketHeader::parse(header).ok()?;
    if header.kind() != Some(PacketType::InitCommandAck) || header.payload_len() > MAX_ACK_PAYLOAD {
        debug!("Identify got packet type {} ({} bytes)", header.packet_type, header.length);
        return None;
    }

    let mut payload = vec![0u8; header.payload_len()];
    stream.read_exact(&mut payload).await.ok()?;
    InitCommandAck::parse(&payload).ok().map(|ack| ack.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptp::PayloadWriter;
    use crate::ptp::packet::encode_packet;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(probe(addr, Duration::from_millis(500)).await.is_none());
    }

    #[tokio::test]
    async fn test_identify_reads_name() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8 + 16 + 20 + 4];
            socket.read_exact(&mut request).await.unwrap();
            assert_eq!(&request[8..24], &[0; 16]);

            let mut ack = PayloadWriter::new();
            ack.put_u32(1).put_bytes(&[9; 16]).put_null_terminated_utf16("Nikon Z 6");
            let packet = encode_packet(PacketType::InitCommandAck.as_u32(), &ack.into_vec());
            socket.write_all(&packet).await.unwrap();
        });

        let stream = probe(addr, Duration::from_secs(1)).await.unwrap();
        assert_eq!(identify(stream, Duration::from_secs(1)).await.as_deref(), Some("Nikon Z 6"));
    }

    #[tokio::test]
    async fn test_identify_rejects_other_packets() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let packet = encode_packet(PacketType::InitFail.as_u32(), &1u32.to_le_bytes());
            socket.write_all(&packet).await.unwrap();
        });

        let stream = probe(addr, Duration::from_secs(1)).await.unwrap();
        assert!(identify(stream, Duration::from_secs(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_identify_times_out_on_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = probe(addr, Duration::from_secs(1)).await.unwrap();
        assert!(identify(stream, Duration::from_millis(100)).await.is_none());
        drop(listener);
    }
}
