//! Device identity and registration
//!
//! Each installation has one [`Device`], persisted as JSON under the
//! `Device` setting. Its id is issued by the sync server on registration;
//! an empty id means the device is unregistered and must not make any
//! export or import calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::error::{SyncError, SyncErrorKind};
use super::transport::{ApiRequest, SyncTransport, TransportError};
use crate::storage::StorageError;
use crate::store::SettingsStore;

/// Setting key holding the serialized device
pub const DEVICE_SETTING: &str = "Device";

/// Identity of this installation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Set once a full import has completed; gates fast import
    #[serde(default, rename = "imported")]
    pub imported_full_set: bool,
}

impl Device {
    /// The unregistered sentinel
    pub fn unregistered() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        !self.id.is_empty()
    }

    /// Load the persisted device, or the unregistered sentinel if none
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self, StorageError> {
        match store.setting(DEVICE_SETTING)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Self::unregistered()),
        }
    }

    pub fn save<S: SettingsStore + ?Sized>(&self, store: &mut S) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set_setting(DEVICE_SETTING, &json)
    }
}

/// Which registry call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOperation {
    Register,
    Unregister,
}

impl fmt::Display for RegistryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryOperation::Register => f.write_str("Registration"),
            RegistryOperation::Unregister => f.write_str("Unregistration"),
        }
    }
}

/// Errors from registering or unregistering the device
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Device name must not be empty")]
    EmptyName,

    #[error("This device is not registered")]
    NotRegistered,

    /// The server answered with a non-2xx status
    #[error("{operation} failed: {status} ({status_text})")]
    Rejected {
        operation: RegistryOperation,
        status: u16,
        status_text: String,
    },

    /// The server accepted the registration but didn't say which id it issued
    #[error("Registration failed: server did not return a device id")]
    MissingId,

    #[error("{operation} failed: {source}")]
    Transport {
        operation: RegistryOperation,
        #[source]
        source: TransportError,
    },

    #[error("Failed to store device: {0}")]
    Storage(#[from] StorageError),
}

impl RegistryError {
    /// Sync error kind used when this failure is shown to the user
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            RegistryError::Rejected {
                operation: RegistryOperation::Unregister,
                ..
            }
            | RegistryError::Transport {
                operation: RegistryOperation::Unregister,
                ..
            }
            | RegistryError::NotRegistered => SyncErrorKind::DeleteError,
            _ => SyncErrorKind::SaveError,
        }
    }

    pub fn to_sync_error(&self) -> SyncError {
        SyncError::new(self.kind(), "Device", self.to_string())
    }
}

/// Register this device under `name`
///
/// The current id (empty on first registration) is sent along so the
/// server can recognise a re-registration. On success the issued id is
/// persisted; on failure the stored device is left as it was.
pub async fn register<S, T>(store: &mut S, transport: &T, name: &str) -> Result<Device, RegistryError>
where
    S: SettingsStore + ?Sized,
    T: SyncTransport + ?Sized,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::EmptyName);
    }

    let current = Device::load(store)?;
    let request = ApiRequest::RegisterDevice {
        device_id: current.id.clone(),
        name: name.to_string(),
    };

    let response = transport
        .send(&request)
        .await
        .map_err(|source| RegistryError::Transport {
            operation: RegistryOperation::Register,
            source,
        })?;

    if !response.is_success() {
        return Err(RegistryError::Rejected {
            operation: RegistryOperation::Register,
            status: response.status,
            status_text: response.status_text,
        });
    }

    let id = response
        .location
        .as_deref()
        .and_then(id_from_location)
        .or_else(|| id_from_body(&response.body))
        .map(str::to_string)
        .unwrap_or_else(|| current.id.clone());
    if id.is_empty() {
        return Err(RegistryError::MissingId);
    }

    let device = Device {
        // A newly issued id starts with no import history on the server
        imported_full_set: current.imported_full_set && id == current.id,
        id,
        name: name.to_string(),
    };
    device.save(store)?;

    info!("Registered device '{}' as {}", device.name, device.id);
    Ok(device)
}

/// Unregister this device from the server
pub async fn unregister<S, T>(store: &mut S, transport: &T) -> Result<(), RegistryError>
where
    S: SettingsStore + ?Sized,
    T: SyncTransport + ?Sized,
{
    let current = Device::load(store)?;
    if !current.is_registered() {
        return Err(RegistryError::NotRegistered);
    }

    let response = transport
        .send(&ApiRequest::UnregisterDevice {
            device_id: current.id.clone(),
        })
        .await
        .map_err(|source| RegistryError::Transport {
            operation: RegistryOperation::Unregister,
            source,
        })?;

    if !response.is_success() {
        return Err(RegistryError::Rejected {
            operation: RegistryOperation::Unregister,
            status: response.status,
            status_text: response.status_text,
        });
    }

    store.remove_setting(DEVICE_SETTING)?;
    info!("Unregistered device {}", current.id);
    Ok(())
}

/// Device id from a `Location` header such as `/devices/abc`
fn id_from_location(location: &str) -> Option<&str> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// Device id sent as the plain response body
///
/// Only a single bare token counts; JSON or HTML bodies are ignored.
fn id_from_body(body: &str) -> Option<&str> {
    let id = body.trim();
    let bare = !id.is_empty()
        && !id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '[' | ']' | '<' | '>' | '"'));
    bare.then_some(id)
}
