//! UI-facing camera API.
//!
//! [`CameraBridge`] is what an app shell calls: connect, list, download, describe.
//! It owns at most one [`PtpIpClient`] and serializes every call through a mutex,
//! so a UI can fire requests from any thread. Progress and state changes go to an
//! injected [`BridgeObserver`].
//!
//! `disconnect` doesn't wait for that mutex first. It shuts down the command socket
//! through a cloned handle kept outside the lock, which breaks off whatever transfer
//! is running, and only then takes the client.

mod events;
mod types;


pub use events::{BridgeObserver, ConnectionStatus, LogEvent, LogLevel, NoopObserver, StatusEvent};
pub use types::{BridgeError, CameraInfo, ConnectResult, ImageEntry, StorageEntry};

use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{ALL_STORAGES, PtpIpClient};
use crate::config::{ClientConfig, DiscoveryConfig};
use crate::discovery::{self, Camera};
use crate::ignore_poison::IgnorePoison;

/// Single-camera facade for app shells.
pub struct CameraBridge {
    client_config: ClientConfig,
    discovery_config: DiscoveryConfig,
    client: Mutex<Option<PtpIpClient>>,
    /// Clone of the connected client's command socket. Never held across I/O.
    cancel: Mutex<Option<TcpStream>>,
    observer: Arc<dyn BridgeObserver>,
}

impl CameraBridge {
    /// Bridge with configuration taken from the environment.
    pub fn new(observer: Arc<dyn BridgeObserver>) -> Self {
        Self::with_config(ClientConfig::from_env(), DiscoveryConfig::from_env(), observer)
    }

    pub fn with_config(
        client_config: ClientConfig,
        discovery_config: DiscoveryConfig,
        observer: Arc<dyn BridgeObserver>,
    ) -> Self {
        Self {
            client_config,
            discovery_config,
            client: Mutex::new(None),
            cancel: Mutex::new(None),
            observer,
        }
    }

    fn log(&self, event: LogEvent) {
        event.forward_to_log();
        self.observer.on_log(&event);
    }

    fn status(&self, status: ConnectionStatus) {
        self.observer.on_status(&StatusEvent { status });
    }

    /// Locks the client slot, or fails if nothing is connected.
    fn connected_client(&self) -> Result<MutexGuard<'_, Option<PtpIpClient>>, BridgeError> {
        let guard = self.client.lock_ignore_poison();
        if guard.as_ref().is_some_and(PtpIpClient::is_connected) {
            Ok(guard)
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    /// Connects to a camera, replacing any current connection.
    pub fn connect(&self, address: &str, port: u16) -> ConnectResult {
        let address = address.trim();
        if address.is_empty() {
            self.log(LogEvent::new(LogLevel::Error, "IP address is required"));
            return ConnectResult::failed("IP address is required");
        }
        if port == 0 {
            self.log(LogEvent::new(LogLevel::Error, format!("Invalid port: {port}")));
            return ConnectResult::failed(format!("Invalid port: {port}"));
        }

        self.log(LogEvent::new(LogLevel::Info, format!("Connecting to {address}:{port}")));
        self.status(ConnectionStatus::Connecting);

        let mut slot = self.client.lock_ignore_poison();
        self.cancel.lock_ignore_poison().take();
        if let Some(mut previous) = slot.take() {
            previous.disconnect();
        }

        let mut client = PtpIpClient::new(self.client_config.clone());
        match client.connect(address, port) {
            Ok(()) => {
                let camera_name = client.camera_name();
                if !client.has_event_channel() {
                    self.log(LogEvent::new(
                        LogLevel::Warning,
                        "Event channel not available, continuing without events",
                    ));
                }
                *self.cancel.lock_ignore_poison() = client.shutdown_handle();
                *slot = Some(client);
                drop(slot);
                self.status(ConnectionStatus::Connected);
                self.log(LogEvent::new(LogLevel::Success, "Connected to camera").with_details(camera_name.clone()));
                ConnectResult::connected(camera_name)
            }
            Err(e) => {
                drop(slot);
                self.status(ConnectionStatus::Error);
                self.log(LogEvent::new(LogLevel::Error, "Connection failed").with_details(e.to_string()));
                ConnectResult::failed(e.user_message())
            }
        }
    }

    /// Disconnects if connected. Never fails.
    ///
    /// Safe to call while another thread is mid-transfer: that call returns an error
    /// promptly instead of holding up the disconnect.
    pub fn disconnect(&self) {
        if let Some(socket) = self.cancel.lock_ignore_poison().take() {
            let _ = socket.shutdown(Shutdown::Both);
        }
        let previous = self.client.lock_ignore_poison().take();
        if let Some(mut client) = previous {
            client.disconnect();
        }
        self.status(ConnectionStatus::Disconnected);
        self.log(LogEvent::new(LogLevel::Success, "Disconnected from camera"));
    }

    pub fn is_connected(&self) -> bool {
        self.client
            .lock_ignore_poison()
            .as_ref()
            .is_some_and(PtpIpClient::is_connected)
    }

    /// Lists every object on every storage, one entry per handle in the camera's order.
    ///
    /// Objects the camera won't describe still appear, with placeholder values.
    /// Folders are included with the format "Association". The client stays locked
    /// for the whole listing.
    pub fn list_images(&self) -> Result<Vec<ImageEntry>, BridgeError> {
        let mut guard = self.connected_client()?;
        let Some(client) = guard.as_mut() else {
            return Err(BridgeError::NotConnected);
        };
        self.log(LogEvent::new(LogLevel::Info, "Fetching image list..."));

        let handles = client.get_object_handles(ALL_STORAGES);
        let total = handles.len();
        let mut images = Vec::with_capacity(total);
        for (index, handle) in handles.into_iter().enumerate() {
            self.log(LogEvent::new(
                LogLevel::Debug,
                format!("Processing image {}/{}", index + 1, total),
            ));
            let entry = match client.get_object_info(handle) {
                Some(info) => ImageEntry::from_object_info(handle, &info),
                None => ImageEntry::fallback(handle),
            };
            images.push(entry);
        }

        self.log(LogEvent::new(LogLevel::Success, format!("Found {} images", images.len())));
        Ok(images)
    }

    /// Full image bytes.
    pub fn download_image(&self, handle: u32) -> Result<Vec<u8>, BridgeError> {
        let mut guard = self.connected_client()?;
        let Some(client) = guard.as_mut() else {
            return Err(BridgeError::NotConnected);
        };
        self.log(LogEvent::new(LogLevel::Info, format!("Downloading image: {handle}")));

        match client.get_object(handle) {
            Some(bytes) => {
                self.log(LogEvent::new(
                    LogLevel::Success,
                    format!("Image downloaded: {} bytes", bytes.len()),
                ));
                Ok(bytes)
            }
            None => {
                self.log(LogEvent::new(LogLevel::Error, "Failed to download image"));
                Err(BridgeError::DownloadFailed { handle })
            }
        }
    }

    pub fn download_thumbnail(&self, handle: u32) -> Result<Vec<u8>, BridgeError> {
        let mut guard = self.connected_client()?;
        let Some(client) = guard.as_mut() else {
            return Err(BridgeError::NotConnected);
        };
        client
            .get_thumb(handle)
            .ok_or(BridgeError::DownloadFailed { handle })
    }

    /// Identity of the connected camera, from the info fetched at connect time or,
    /// if that failed, a fresh request.
    pub fn get_camera_info(&self) -> Result<CameraInfo, BridgeError> {
        let mut guard = self.connected_client()?;
        let Some(client) = guard.as_mut() else {
            return Err(BridgeError::NotConnected);
        };
        if let Some(info) = client.cached_device_info() {
            return Ok(CameraInfo::from(info));
        }
        client
            .get_device_info()
            .map(|info| CameraInfo::from(&info))
            .ok_or(BridgeError::InfoUnavailable)
    }

    /// Every storage the camera reports. Storages it won't describe come back zeroed.
    pub fn get_storage_info(&self) -> Result<Vec<StorageEntry>, BridgeError> {
        let mut guard = self.connected_client()?;
        let Some(client) = guard.as_mut() else {
            return Err(BridgeError::NotConnected);
        };
        let storages = client
            .get_storage_ids()
            .into_iter()
            .map(|id| StorageEntry::new(id, client.get_storage_info(id).as_ref()))
            .collect();
        Ok(storages)
    }

    /// Runs network discovery. `on_found` fires once per camera as it turns up.
    pub async fn discover_cameras<F>(&self, on_found: F) -> Vec<Camera>
    where
        F: Fn(&Camera) + Send + Sync + 'static,
    {
        self.log(LogEvent::new(LogLevel::Info, "Searching for cameras..."));
        let observer = Arc::clone(&self.observer);
        let cameras = discovery::discover(&self.discovery_config, move |camera: &Camera| {
            let event = LogEvent::new(LogLevel::Info, format!("Found camera at {}", camera.address))
                .with_details(camera.method.to_string());
            event.forward_to_log();
            observer.on_log(&event);
            on_found(camera);
        })
        .await;
        self.log(LogEvent::new(
            LogLevel::Success,
            format!("Found {} camera(s)", cameras.len()),
        ));
        cameras
    }
}

impl std::fmt::Debug for CameraBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraBridge")
            .field("connected", &self.is_connected())
            .finish()
    }
}
