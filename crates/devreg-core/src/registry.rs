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
use std::sync::Arc;

use devreg_logging::{reg_debug, reg_info, LogContext};

use crate::error::{RegistryError, Result};
use crate::model::{Device, DeviceRegistration, DeviceType};
use crate::store::DeviceStore;
use crate::topology::{build_forest, build_subtree, TopologyNode, MAX_TOPOLOGY_DEPTH};

/// Validation, lookup and topology queries over a [`DeviceStore`].
#[derive(Clone)]
pub struct RegistryService {
    store: Arc<dyn DeviceStore>,
}

impl RegistryService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Register a new device.
    ///
    /// Performs at most one store write, and none when any check fails.
    pub fn register(&self, registration: DeviceRegistration) -> Result<Device> {
        let DeviceRegistration {
            device_type,
            mac_address,
            uplink_mac_address,
        } = registration;

        let mac_address = match mac_address {
            Some(mac) if !mac.trim().is_empty() => mac,
            _ => {
                return Err(RegistryError::InvalidArgument(
                    "MAC address must not be null or blank".into(),
                ))
            }
        };
        let device_type = device_type.ok_or_else(|| {
            RegistryError::InvalidArgument("Device type must not be null".into())
        })?;

        if self.store.exists(&mac_address)? {
            return Err(RegistryError::Conflict(mac_address));
        }

        if let Some(uplink) = &uplink_mac_address {
            if !self.store.exists(uplink)? {
                return Err(RegistryError::uplink_not_found(uplink.clone()));
            }
            if self.chain_depth(uplink)? >= MAX_TOPOLOGY_DEPTH {
                return Err(RegistryError::InvalidArgument(format!(
                    "uplink chain below {uplink} would exceed {MAX_TOPOLOGY_DEPTH} devices"
                )));
            }
        }

        let device = Device {
            mac_address,
            device_type,
            uplink: uplink_mac_address,
        };
        self.store.put(device.clone())?;

        let ctx = LogContext::new()
            .with_operation("register")
            .with_mac(&device.mac_address)
            .with_uplink(device.uplink.as_deref())
            .with_device_type(device.device_type.as_str());
        reg_info!(context = ctx, "device registered");
        Ok(device)
    }

    /// All devices, gateways first, then switches, then access points.
    ///
    /// The sort is stable, so devices of one type keep the store's order.
    pub fn list_sorted(&self) -> Result<Vec<Device>> {
        let mut devices = self.store.get_all()?;
        devices.sort_by_key(|device| type_order(device.device_type));
        Ok(devices)
    }

    pub fn get_by_mac(&self, mac_address: &str) -> Result<Device> {
        self.store
            .get(mac_address)?
            .ok_or_else(|| RegistryError::device_not_found(mac_address))
    }

    /// Every tree of the uplink forest; see [`build_forest`].
    pub fn full_topology(&self) -> Result<Vec<TopologyNode>> {
        let devices = self.store.get_all()?;
        let roots = build_forest(&devices);
        reg_debug!(
            context = LogContext::new().with_operation("topology"),
            "built forest of {} roots from {} devices",
            roots.len(),
            devices.len()
        );
        Ok(roots)
    }

    /// The tree below a registered device; see [`build_subtree`].
    pub fn topology_from(&self, mac_address: &str) -> Result<TopologyNode> {
        if !self.store.exists(mac_address)? {
            return Err(RegistryError::device_not_found(mac_address));
        }
        let devices = self.store.get_all()?;
        Ok(build_subtree(mac_address, &devices))
    }

    /// Devices from `mac` up to its root, stopping once the limit is reached.
    fn chain_depth(&self, mac: &str) -> Result<usize> {
        let mut depth = 0;
        let mut current = Some(mac.to_owned());
        while let Some(mac) = current {
            depth += 1;
            if depth >= MAX_TOPOLOGY_DEPTH {
                break;
            }
            current = self.store.get(&mac)?.and_then(|device| device.uplink);
        }
        Ok(depth)
    }
}

impl fmt::Debug for RegistryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryService").finish_non_exhaustive()
    }
}

fn type_order(device_type: DeviceType) -> u8 {
    match device_type {
        DeviceType::Gateway => 0,
        DeviceType::Switch => 1,
        DeviceType::AccessPoint => 2,
    }
}
