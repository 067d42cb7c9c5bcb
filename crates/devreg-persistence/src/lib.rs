//! ---
//! devreg_section: "03-persistence-logging"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Persistence abstractions and storage bindings."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! File-backed [`DeviceStore`](devreg_core::DeviceStore) implementation.

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing snapshot files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for CBOR serialization issues.
    #[error("cbor serialization error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    /// Reported when a snapshot fails integrity verification.
    #[error("snapshot hash mismatch")]
    HashMismatch,
    /// Reported when a snapshot was written by an unknown envelope version.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
    /// Wrapper for Prometheus metrics registration failures.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub mod file_store;
pub mod metrics;
pub mod snapshot;

pub use file_store::FileDeviceStore;
pub use metrics::PersistenceMetrics;
pub use snapshot::{load_snapshot, save_snapshot, verify_snapshot, SNAPSHOT_VERSION};
