#![allow(unused_macros)]
//! Self-diagnostics for the logs pipeline.
//!
//! The `otel_*` macros are meant for this workspace and for custom exporters
//! and processors, not for application logging. With the `internal-logs`
//! feature they emit `tracing` events whose target is the calling crate and
//! whose `name` field carries the event name. Under `cfg(test)` they print to
//! stdout, visible with `--nocapture`. Otherwise they compile to nothing.
//!
//! Event names follow `Component.Event`, for example
//! `BatchLogProcessor.LogDroppingStarted`.

#[doc(hidden)]
#[macro_export]
macro_rules! __otel_internal_log {
    ($level:ident, name: $name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        // TODO: drop the duplicated `name` field once `tracing::fmt` prints event names.
        // See https://github.com/tokio-rs/tracing/issues/2774
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::$level!(
                name: $name,
                target: env!("CARGO_PKG_NAME"),
                name = $name
                $(, $key = $value)*
            );
        }

        #[cfg(test)]
        {
            print!("otel_{}: name={}", stringify!($level), $name);
            $(
                print!(", {}={}", stringify!($key), $value);
            )*
            print!("\n");
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = ($name $(, $value)*);
        }
    };
}

/// Logs an informational event.
///
/// ```rust
/// use otellogs::otel_info;
/// otel_info!(name: "LoggerProvider.Built", processor_count = 2);
/// ```
#[macro_export]
macro_rules! otel_info {
    ($($args:tt)*) => {
        $crate::__otel_internal_log!(info, $($args)*)
    };
}

/// Logs a warning event, for conditions that lose data or degrade behaviour.
///
/// ```rust
/// use otellogs::otel_warn;
/// otel_warn!(name: "BatchLogProcessor.LogDroppingStarted", queue_size = 2048);
/// ```
#[macro_export]
macro_rules! otel_warn {
    ($($args:tt)*) => {
        $crate::__otel_internal_log!(warn, $($args)*)
    };
}

/// Logs a debug event.
///
/// ```rust
/// use otellogs::otel_debug;
/// otel_debug!(name: "SimpleLogProcessor.Emit.AfterShutdown");
/// ```
#[macro_export]
macro_rules! otel_debug {
    ($($args:tt)*) => {
        $crate::__otel_internal_log!(debug, $($args)*)
    };
}

/// Logs an error event.
///
/// ```rust
/// use otellogs::otel_error;
/// otel_error!(name: "LogExporter.Failed", reason = "connection refused");
/// ```
#[macro_export]
macro_rules! otel_error {
    ($($args:tt)*) => {
        $crate::__otel_internal_log!(error, $($args)*)
    };
}
