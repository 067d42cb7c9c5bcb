//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Device registry core: model, store contract, topology and service."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of network device held in the registry.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    Gateway,
    Switch,
    AccessPoint,
}

impl DeviceType {
    /// Wire spelling of the type, identical to its serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Gateway => "GATEWAY",
            DeviceType::Switch => "SWITCH",
            DeviceType::AccessPoint => "ACCESS_POINT",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "GATEWAY" => Ok(DeviceType::Gateway),
            "SWITCH" => Ok(DeviceType::Switch),
            "ACCESS_POINT" => Ok(DeviceType::AccessPoint),
            other => Err(format!("unknown device type: {}", other)),
        }
    }
}

/// A registered device.
///
/// The uplink is kept as the MAC address of the parent device and only
/// resolved when a topology is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub mac_address: String,
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink: Option<String>,
}

impl Device {
    pub fn new(mac_address: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            mac_address: mac_address.into(),
            device_type,
            uplink: None,
        }
    }

    pub fn with_uplink(mut self, uplink: impl Into<String>) -> Self {
        self.uplink = Some(uplink.into());
        self
    }
}

/// Input accepted by [`RegistryService::register`](crate::RegistryService::register).
///
/// Required fields are optional here so that a missing value surfaces as
/// [`RegistryError::InvalidArgument`](crate::RegistryError::InvalidArgument)
/// instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    #[serde(default)]
    pub device_type: Option<DeviceType>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink_mac_address: Option<String>,
}

impl DeviceRegistration {
    pub fn new(device_type: DeviceType, mac_address: impl Into<String>) -> Self {
        Self {
            device_type: Some(device_type),
            mac_address: Some(mac_address.into()),
            uplink_mac_address: None,
        }
    }

    pub fn with_uplink(mut self, uplink_mac_address: impl Into<String>) -> Self {
        self.uplink_mac_address = Some(uplink_mac_address.into());
        self
    }
}
