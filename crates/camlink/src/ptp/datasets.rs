//! Decoders for the PTP datasets returned in data phases: DeviceInfo,
//! StorageInfo, and ObjectInfo.
//!
//! Field order follows the PTP standard (ISO 15740) exactly. Decoding stops at
//! the last known field; vendor extensions appended after it are ignored.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::codes::{FORMAT_ASSOCIATION, OperationCode, format_name};
use super::errors::DecodeError;
use super::reader::PayloadReader;

/// Static identity and capability record of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub standard_version: u16,
    pub vendor_extension_id: u32,
    pub vendor_extension_version: u16,
    pub vendor_extension_desc: String,
    pub functional_mode: u16,
    pub operations_supported: Vec<u16>,
    pub events_supported: Vec<u16>,
    pub device_properties_supported: Vec<u16>,
    pub capture_formats: Vec<u16>,
    pub image_formats: Vec<u16>,
    pub manufacturer: String,
    pub model: String,
    pub device_version: String,
    pub serial_number: String,
}

impl DeviceInfo {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PayloadReader::new(data);
        Ok(Self {
            standard_version: r.read_u16()?,
            vendor_extension_id: r.read_u32()?,
            vendor_extension_version: r.read_u16()?,
            vendor_extension_desc: r.read_string()?,
            functional_mode: r.read_u16()?,
            operations_supported: r.read_u16_array()?,
            events_supported: r.read_u16_array()?,
            device_properties_supported: r.read_u16_array()?,
            capture_formats: r.read_u16_array()?,
            image_formats: r.read_u16_array()?,
            manufacturer: r.read_string()?,
            model: r.read_string()?,
            device_version: r.read_string()?,
            serial_number: r.read_string()?,
        })
    }

    /// Whether the device lists `op` among its supported operations.
    pub fn supports_operation(&self, op: OperationCode) -> bool {
        self.operations_supported.contains(&op.as_u16())
    }
}

/// One storage volume on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub storage_type: u16,
    pub filesystem_type: u16,
    pub access_capability: u16,
    pub max_capacity: u64,
    pub free_space_in_bytes: u64,
    pub free_space_in_images: u32,
    pub storage_description: String,
    pub volume_label: String,
}

impl StorageInfo {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PayloadReader::new(data);
        Ok(Self {
            storage_type: r.read_u16()?,
            filesystem_type: r.read_u16()?,
            access_capability: r.read_u16()?,
            max_capacity: r.read_u64()?,
            free_space_in_bytes: r.read_u64()?,
            free_space_in_images: r.read_u32()?,
            storage_description: r.read_string()?,
            volume_label: r.read_string()?,
        })
    }

    /// For example, "FixedROM", "RemovableRAM".
    pub fn storage_type_name(&self) -> &'static str {
        match self.storage_type {
            0x0001 => "FixedROM",
            0x0002 => "RemovableROM",
            0x0003 => "FixedRAM",
            0x0004 => "RemovableRAM",
            _ => "Undefined",
        }
    }

    /// Anything but read-write counts as read-only, with or without object deletion.
    pub fn is_read_only(&self) -> bool {
        self.access_capability != 0x0000
    }
}

/// Metadata of one object (usually an image) on a storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub storage_id: u32,
    pub object_format: u16,
    pub protection_status: u16,
    pub object_compressed_size: u32,
    pub thumb_format: u16,
    pub thumb_compressed_size: u32,
    pub thumb_pix_width: u32,
    pub thumb_pix_height: u32,
    pub image_pix_width: u32,
    pub image_pix_height: u32,
    pub image_bit_depth: u32,
    pub parent_object: u32,
    pub association_type: u16,
    pub association_desc: u32,
    pub sequence_number: u32,
    pub filename: String,
    pub capture_date: String,
    pub modification_date: String,
    pub keywords: String,
}

impl ObjectInfo {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PayloadReader::new(data);
        Ok(Self {
            storage_id: r.read_u32()?,
            object_format: r.read_u16()?,
            protection_status: r.read_u16()?,
            object_compressed_size: r.read_u32()?,
            thumb_format: r.read_u16()?,
            thumb_compressed_size: r.read_u32()?,
            thumb_pix_width: r.read_u32()?,
            thumb_pix_height: r.read_u32()?,
            image_pix_width: r.read_u32()?,
            image_pix_height: r.read_u32()?,
            image_bit_depth: r.read_u32()?,
            parent_object: r.read_u32()?,
            association_type: r.read_u16()?,
            association_desc: r.read_u32()?,
            sequence_number: r.read_u32()?,
            filename: r.read_string()?,
            capture_date: r.read_string()?,
            modification_date: r.read_string()?,
            keywords: r.read_string()?,
        })
    }

    pub fn format_name(&self) -> String {
        format_name(self.object_format)
    }

    /// Folders are associations in PTP terms.
    pub fn is_association(&self) -> bool {
        self.object_format == FORMAT_ASSOCIATION
    }

    pub fn capture_time(&self) -> Option<NaiveDateTime> {
        parse_ptp_datetime(&self.capture_date)
    }

    pub fn modification_time(&self) -> Option<NaiveDateTime> {
        parse_ptp_datetime(&self.modification_date)
    }
}

/// Parses a PTP DateTime string, `YYYYMMDDThhmmss` with optional tenths of a
/// second and an optional `Z` or `±hhmm` suffix.
///
/// The suffix is ignored: cameras almost never set their clock zone correctly,
/// so the value is treated as local wall-clock time.
pub fn parse_ptp_datetime(value: &str) -> Option<NaiveDateTime> {
    let core = value.get(..15)?;
    NaiveDateTime::parse_from_str(core, "%Y%m%dT%H%M%S").ok()
}
