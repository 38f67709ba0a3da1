//! Security event logging
//!
//! Security-relevant events (replays, stale key packets, cache tampering,
//! identity wipes) go to a dedicated tracing target so subscribers can route
//! them separately from routine diagnostics.

/// Tracing target for security events
pub const SECURITY_TARGET: &str = "bitchat::security";

/// Log a security event at the given level on [`SECURITY_TARGET`]
#[macro_export]
macro_rules! security_event {
    (warn, $($arg:tt)+) => {
        ::tracing::warn!(target: $crate::logging::SECURITY_TARGET, $($arg)+)
    };
    (error, $($arg:tt)+) => {
        ::tracing::error!(target: $crate::logging::SECURITY_TARGET, $($arg)+)
    };
    (info, $($arg:tt)+) => {
        ::tracing::info!(target: $crate::logging::SECURITY_TARGET, $($arg)+)
    };
}
