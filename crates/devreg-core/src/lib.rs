//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Device registry core: model, store contract, topology and service."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
//! Registry core. Devices are registered against a [`DeviceStore`] through
//! the [`RegistryService`], which also reconstructs the uplink topology via
//! the functions in [`topology`].

pub mod error;
pub mod model;
pub mod registry;
pub mod store;
pub mod topology;

pub use error::{RegistryError, Result};
pub use model::{Device, DeviceRegistration, DeviceType};
pub use registry::RegistryService;
pub use store::{DeviceStore, InMemoryDeviceStore, StoreError};
pub use topology::{build_forest, build_subtree, TopologyNode, MAX_TOPOLOGY_DEPTH};
