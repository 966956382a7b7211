//! # Log Processor Interface
//!
//! Log processors sit between [`SdkLogger::emit`] and a [`LogExporter`]. They
//! decide when a record is exported: immediately on the emitting thread
//! ([`SimpleLogProcessor`]) or later in batches on a worker thread
//! ([`BatchLogProcessor`]).
//!
//! ```ascii
//!   +-----+---------------+   +-----------------------+   +-------------------+
//!   |     |               |   |                       |   |                   |
//!   | SDK | Logger.emit() +---> (Simple)LogProcessor  +--->  LogExporter      |
//!   |     |               |   | (Batch)LogProcessor   +--->  (OTLP exporter)  |
//!   +-----+---------------+   +-----------------------+   +-------------------+
//! ```
//!
//! [`SdkLogger::emit`]: crate::logs::SdkLogger
//! [`LogExporter`]: crate::logs::LogExporter
//! [`SimpleLogProcessor`]: crate::logs::SimpleLogProcessor
//! [`BatchLogProcessor`]: crate::logs::BatchLogProcessor

use crate::error::SdkResult;
use crate::logs::LogData;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Timeout used by [`LogProcessor::force_flush`] and
/// [`LogProcessor::shutdown`].
pub const DEFAULT_PROCESSOR_TIMEOUT: Duration = Duration::from_secs(5);

/// The interface for plugging into a [`SdkLoggerProvider`].
///
/// [`SdkLoggerProvider`]: crate::logs::SdkLoggerProvider
pub trait LogProcessor: Send + Sync + Debug {
    /// Called for every emitted record.
    ///
    /// Must not block indefinitely and must not panic. Failures are reported
    /// through internal logs and the global error handler, never to the
    /// caller.
    fn emit(&self, data: &Arc<LogData>);

    /// Export everything buffered, waiting at most `timeout`.
    fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult;

    /// Flush, stop accepting records and release the exporter, waiting at most
    /// `timeout`. Calling it more than once is harmless.
    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult;

    /// [`force_flush_with_timeout`](Self::force_flush_with_timeout) with a 5
    /// second timeout.
    fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }

    /// [`shutdown_with_timeout`](Self::shutdown_with_timeout) with a 5 second
    /// timeout.
    fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(DEFAULT_PROCESSOR_TIMEOUT)
    }
}
