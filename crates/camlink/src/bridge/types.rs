//! Bridge type definitions for UI communication.
//!
//! These types are serialized to JSON by whatever host embeds the bridge.

use serde::{Deserialize, Serialize};

use crate::ptp::{DeviceInfo, ObjectInfo, StorageInfo};

/// Result of [`super::CameraBridge::connect`]. Failure is reported here rather
/// than as an error so the UI always gets a displayable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    pub success: bool,
    /// Camera model, or "Unknown Camera".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectResult {
    pub fn connected(camera_name: String) -> Self {
        Self {
            success: true,
            name: Some(camera_name),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            name: None,
            error: Some(error.into()),
        }
    }
}

/// One photo in the camera's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    pub handle: u32,
    pub filename: String,
    /// In bytes. Zero when the camera didn't describe the object.
    pub size: u64,
    /// For example, "JPEG", "CR3".
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Raw PTP timestamp, like "20240315T142530".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_date: Option<String>,
}

impl ImageEntry {
    /// Entry built from the camera's ObjectInfo.
    pub fn from_object_info(handle: u32, info: &ObjectInfo) -> Self {
        Self {
            handle,
            filename: info.filename.clone(),
            size: u64::from(info.object_compressed_size),
            format: info.format_name(),
            width: info.image_pix_width,
            height: info.image_pix_height,
            capture_date: Some(info.capture_date.clone()).filter(|d| !d.is_empty()),
        }
    }

    /// Placeholder for a handle whose ObjectInfo couldn't be fetched.
    pub fn fallback(handle: u32) -> Self {
        Self {
            handle,
            filename: format!("IMG_{handle}.jpg"),
            size: 0,
            format: "JPEG".to_string(),
            width: 0,
            height: 0,
            capture_date: None,
        }
    }
}

/// Identity of the connected camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub vendor_extension: String,
}

impl From<&DeviceInfo> for CameraInfo {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            manufacturer: info.manufacturer.clone(),
            model: info.model.clone(),
            serial_number: info.serial_number.clone(),
            firmware_version: info.device_version.clone(),
            vendor_extension: info.vendor_extension_desc.clone(),
        }
    }
}

/// One storage volume, such as a memory card slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEntry {
    pub storage_id: u32,
    pub storage_type: u16,
    /// In bytes.
    pub max_capacity: u64,
    /// In bytes.
    pub free_space: u64,
    pub description: String,
}

impl StorageEntry {
    /// Zeroed values stand in for a storage the camera wouldn't describe.
    pub fn new(storage_id: u32, info: Option<&StorageInfo>) -> Self {
        match info {
            Some(info) => Self {
                storage_id,
                storage_type: info.storage_type,
                max_capacity: info.max_capacity,
                free_space: info.free_space_in_bytes,
                description: info.storage_description.clone(),
            },
            None => Self {
                storage_id,
                storage_type: 0,
                max_capacity: 0,
                free_space: 0,
                description: String::new(),
            },
        }
    }
}

/// Error types for bridge calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum BridgeError {
    /// No camera is connected.
    NotConnected,
    /// The camera didn't hand over the object or thumbnail.
    DownloadFailed { handle: u32 },
    /// The camera didn't describe itself.
    InfoUnavailable,
}

impl BridgeError {
    /// Returns a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConnected => "Not connected to a camera.".to_string(),
            Self::DownloadFailed { .. } => {
                "Couldn't download the file from the camera. Try again, or reconnect.".to_string()
            }
            Self::InfoUnavailable => "The camera didn't share its details.".to_string(),
        }
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Not connected to camera"),
            Self::DownloadFailed { handle } => write!(f, "Failed to download object {handle}"),
            Self::InfoUnavailable => write!(f, "Failed to get camera info"),
        }
    }
}

impl std::error::Error for BridgeError {}
