//! High-level PTP operations built on [`PtpIpClient::send_command`].
//!
//! These never fail loudly: a non-OK response, a missing data phase, an undecodable
//! dataset, or a transport error all produce `None` or an empty list, with the
//! reason logged. Callers that need the cause can use `send_command` directly.

use log::{debug, warn};

use super::PtpIpClient;
use crate::ptp::{DecodeError, DeviceInfo, ObjectInfo, OperationCode, PayloadReader, StorageInfo};

/// Storage id meaning "every storage" in object queries.
pub const ALL_STORAGES: u32 = 0xFFFF_FFFF;

/// Format filter and parent filter meaning "no filter".
const NO_FILTER: u32 = 0;

impl PtpIpClient {
    /// Fetches DeviceInfo and refreshes the cached copy.
    pub fn get_device_info(&mut self) -> Option<DeviceInfo> {
        let data = self.fetch_data(OperationCode::GetDeviceInfo, &[])?;
        let info = self.decode(OperationCode::GetDeviceInfo, DeviceInfo::parse(&data))?;
        self.device_info = Some(info.clone());
        Some(info)
    }

    pub fn get_storage_ids(&mut self) -> Vec<u32> {
        self.fetch_data(OperationCode::GetStorageIds, &[])
            .and_then(|data| {
                self.decode(
                    OperationCode::GetStorageIds,
                    PayloadReader::new(&data).read_u32_array(),
                )
            })
            .unwrap_or_default()
    }

    pub fn get_storage_info(&mut self, storage_id: u32) -> Option<StorageInfo> {
        let data = self.fetch_data(OperationCode::GetStorageInfo, &[storage_id])?;
        self.decode(OperationCode::GetStorageInfo, StorageInfo::parse(&data))
    }

    /// Number of objects on a storage, taken from the first response parameter.
    pub fn get_num_objects(&mut self, storage_id: u32) -> Option<u32> {
        let response = match self.send_command(OperationCode::GetNumObjects, &[storage_id, NO_FILTER, NO_FILTER]) {
            Ok(response) => response,
            Err(e) => {
                warn!("GetNumObjects failed: {}", e);
                return None;
            }
        };
        if !response.is_ok() {
            warn!("GetNumObjects answered {}", response.code);
            return None;
        }
        let count = response.params.first().copied();
        if count.is_none() {
            warn!("GetNumObjects response carried no count");
        }
        count
    }

    /// Handles of all objects on `storage_id` (use [`ALL_STORAGES`] for every storage),
    /// across all formats and folders.
    pub fn get_object_handles(&mut self, storage_id: u32) -> Vec<u32> {
        let handles = self
            .fetch_data(OperationCode::GetObjectHandles, &[storage_id, NO_FILTER, NO_FILTER])
            .and_then(|data| {
                self.decode(
                    OperationCode::GetObjectHandles,
                    PayloadReader::new(&data).read_u32_array(),
                )
            })
            .unwrap_or_default();
        debug!("Storage 0x{:08X} has {} objects", storage_id, handles.len());
        handles
    }

    pub fn get_object_info(&mut self, handle: u32) -> Option<ObjectInfo> {
        let data = self.fetch_data(OperationCode::GetObjectInfo, &[handle])?;
        self.decode(OperationCode::GetObjectInfo, ObjectInfo::parse(&data))
    }

    /// Full object bytes, usually the image file.
    pub fn get_object(&mut self, handle: u32) -> Option<Vec<u8>> {
        self.fetch_data(OperationCode::GetObject, &[handle])
    }

    pub fn get_thumb(&mut self, handle: u32) -> Option<Vec<u8>> {
        self.fetch_data(OperationCode::GetThumb, &[handle])
    }

    /// Runs a command and returns its data phase if the response was OK.
    fn fetch_data(&mut self, op: OperationCode, params: &[u32]) -> Option<Vec<u8>> {
        match self.send_command(op, params) {
            Ok(response) if response.is_ok() => {
                if response.data.is_none() {
                    warn!("{:?} succeeded but sent no data", op);
                }
                response.data
            }
            Ok(response) => {
                warn!("{:?} {:?} answered {}", op, params, response.code);
                None
            }
            Err(e) => {
                warn!("{:?} {:?} failed: {}", op, params, e);
                None
            }
        }
    }

    fn decode<T>(&self, op: OperationCode, result: Result<T, DecodeError>) -> Option<T> {
        result
            .map_err(|e| warn!("Couldn't decode {:?} reply from {}: {}", op, self.address, e))
            .ok()
    }
}
