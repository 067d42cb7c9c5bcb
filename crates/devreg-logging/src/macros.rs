//! ---
//! devreg_section: "03-persistence-logging"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Structured logging adapters for registry operations."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---

/// Emit an event at the given level enriched with a [`LogContext`](crate::LogContext).
#[doc(hidden)]
#[macro_export]
macro_rules! __reg_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            operation = ctx.operation.unwrap_or(""),
            mac = ctx.mac.unwrap_or(""),
            uplink = ctx.uplink.unwrap_or(""),
            device_type = ctx.device_type.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with device context.
#[macro_export]
macro_rules! reg_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__reg_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__reg_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with device context.
#[macro_export]
macro_rules! reg_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__reg_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__reg_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with device context.
#[macro_export]
macro_rules! reg_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__reg_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__reg_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
