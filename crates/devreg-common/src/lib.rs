//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Shared primitives and utilities for the registry runtime."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
//! Core shared primitives for the device registry workspace.
//! This crate exposes configuration loading and tracing setup consumed
//! by the daemon and its tooling.

pub mod config;
pub mod logging;

pub use config::{
    ApiConfig, AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, StorageBackend,
    StorageConfig,
};
pub use logging::{init_tracing, LogFormat};
