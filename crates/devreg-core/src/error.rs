//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Device registry core: model, store contract, topology and service."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use crate::store::StoreError;

/// Result alias used throughout the registry core.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Failures surfaced by [`RegistryService`](crate::RegistryService).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A required field was missing or blank.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A device with the MAC address is already registered.
    #[error("device with MAC address already exists: {0}")]
    Conflict(String),
    /// A referenced device does not exist.
    #[error("{what} not found: {mac}")]
    NotFound { what: &'static str, mac: String },
    /// The device store failed.
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

impl RegistryError {
    pub(crate) fn device_not_found(mac: impl Into<String>) -> Self {
        RegistryError::NotFound {
            what: "device",
            mac: mac.into(),
        }
    }

    pub(crate) fn uplink_not_found(mac: impl Into<String>) -> Self {
        RegistryError::NotFound {
            what: "uplink device",
            mac: mac.into(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::InvalidArgument(_) => "invalid_argument",
            RegistryError::Conflict(_) => "conflict",
            RegistryError::NotFound { .. } => "not_found",
            RegistryError::Storage(_) => "storage",
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(mac) => RegistryError::Conflict(mac),
            other => RegistryError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_maps_to_conflict() {
        let err = RegistryError::from(StoreError::DuplicateKey("m1".into()));
        assert!(matches!(err, RegistryError::Conflict(ref mac) if mac == "m1"));
        assert_eq!(err.kind(), "conflict");
    }

    #[test]
    fn not_found_message_names_the_target() {
        let err = RegistryError::uplink_not_found("aa:bb");
        assert_eq!(err.to_string(), "uplink device not found: aa:bb");
        assert_eq!(err.kind(), "not_found");
    }
}
