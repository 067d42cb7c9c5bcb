//! ---
//! devreg_section: "05-networking-external-interfaces"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Networking API surface for device registration and topology."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use devreg_core::{Device, DeviceType};
use serde::{Deserialize, Serialize};

/// Device as reported by the API. The uplink is not echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub mac_address: String,
    pub device_type: DeviceType,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            mac_address: device.mac_address,
            device_type: device.device_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_uplink() {
        let device = Device::new("aa:bb", DeviceType::AccessPoint).with_uplink("gw");
        let json = serde_json::to_value(DeviceResponse::from(device)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"macAddress": "aa:bb", "deviceType": "ACCESS_POINT"})
        );
    }
}
