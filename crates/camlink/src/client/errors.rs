//! Error types for PTP/IP client operations.

use std::io;

use crate::ptp::{DecodeError, ResponseCode};

/// Error types for PTP/IP client operations.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PtpIpError {
    /// Socket open, connect, read, or write failed.
    Connection { address: String, message: String },
    /// The camera sent a malformed or unexpected packet.
    Protocol { address: String, message: String },
    /// The camera answered a command with a non-OK response code.
    Operation {
        address: String,
        operation: u16,
        code: ResponseCode,
    },
    /// A connect or read deadline elapsed.
    Timeout { address: String },
    /// No command connection is open.
    NotConnected,
    /// A command other than OpenSession was issued without an open session.
    SessionNotOpen,
}

impl PtpIpError {
    /// Returns true if the operation may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Operation { code, .. } => *code == ResponseCode::DEVICE_BUSY,
            _ => false,
        }
    }

    /// Returns a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection { address, .. } => format!(
                "Couldn't reach the camera at {address}. Check that it's on the same Wi-Fi network."
            ),
            Self::Protocol { message, .. } => {
                format!("The camera sent something unexpected: {message}. Try reconnecting.")
            }
            Self::Operation { code, .. } => {
                if *code == ResponseCode::DEVICE_BUSY {
                    "The camera is busy. Wait a moment and try again.".to_string()
                } else {
                    format!("The camera refused the request ({code}).")
                }
            }
            Self::Timeout { .. } => {
                "The camera didn't answer in time. It may be asleep or out of range.".to_string()
            }
            Self::NotConnected => "Not connected to a camera.".to_string(),
            Self::SessionNotOpen => "No session is open with the camera. Reconnect to continue.".to_string(),
        }
    }

    /// Maps a socket error, keeping timeouts distinct from other failures.
    pub(crate) fn from_io(err: &io::Error, address: &str) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout {
                address: address.to_string(),
            },
            io::ErrorKind::InvalidData => Self::Protocol {
                address: address.to_string(),
                message: err.to_string(),
            },
            _ => Self::Connection {
                address: address.to_string(),
                message: err.to_string(),
            },
        }
    }

    pub(crate) fn from_decode(err: &DecodeError, address: &str) -> Self {
        Self::Protocol {
            address: address.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn protocol(address: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            address: address.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PtpIpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { address, message } => {
                write!(f, "Connection error for {address}: {message}")
            }
            Self::Protocol { address, message } => {
                write!(f, "Protocol error for {address}: {message}")
            }
            Self::Operation {
                address,
                operation,
                code,
            } => {
                write!(f, "Operation 0x{operation:04X} on {address} failed with {code}")
            }
            Self::Timeout { address } => write!(f, "Timed out talking to {address}"),
            Self::NotConnected => write!(f, "Not connected"),
            Self::SessionNotOpen => write!(f, "Session not open"),
        }
    }
}

impl std::error::Error for PtpIpError {}
