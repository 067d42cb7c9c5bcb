//! ---
//! devreg_section: "03-persistence-logging"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Structured logging adapters for registry operations."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for command line tools.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Registry operation being performed (`register`, `topology`, ...).
    pub operation: Option<&'a str>,
    /// MAC address of the device the event concerns.
    pub mac: Option<&'a str>,
    /// MAC address of the uplink device, if any.
    pub uplink: Option<&'a str>,
    /// Device type in its wire spelling.
    pub device_type: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the operation name.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Attach the device MAC address.
    pub fn with_mac(mut self, mac: &'a str) -> Self {
        self.mac = Some(mac);
        self
    }

    /// Attach the uplink MAC address when one is present.
    pub fn with_uplink(mut self, uplink: Option<&'a str>) -> Self {
        self.uplink = uplink;
        self
    }

    /// Attach the device type.
    pub fn with_device_type(mut self, device_type: &'a str) -> Self {
        self.device_type = Some(device_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_operation("register")
            .with_mac("aa:bb:cc:dd:ee:ff")
            .with_uplink(Some("aa:bb:cc:dd:ee:00"))
            .with_device_type("SWITCH");
        reg_info!(context = ctx.clone(), "device registered");
        reg_debug!("debug message");
        reg_warn!(context = ctx, "rejected: {}", "duplicate");
    }

    #[test]
    fn context_builder_keeps_fields() {
        let ctx = LogContext::new().with_mac("m1").with_uplink(None);
        assert_eq!(ctx.mac, Some("m1"));
        assert!(ctx.uplink.is_none());
        assert!(ctx.operation.is_none());
    }
}
