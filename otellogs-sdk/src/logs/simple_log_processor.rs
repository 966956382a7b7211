//! # Simple Log Processor
//!
//! Exports every record as soon as it is emitted, on the emitting thread,
//! one record per export call. Exports are serialized behind a mutex.
//! Meant for debugging and tests; use the batch processor in production.
//!
//! Outside a Tokio runtime the export future runs on a current-thread
//! runtime owned by the processor, so exporters may use Tokio timers and I/O.
//! Inside a runtime it is driven by a blocking executor on the caller's
//! thread and relies on that runtime's reactor.

use crate::error::{SdkError, SdkResult};
use crate::logs::log_processor::LogProcessor;
use crate::logs::{LogBatch, LogData, LogExporter};

use otellogs::logs::LogError;
use otellogs::{global, otel_debug, otel_error, otel_warn};

use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A [`LogProcessor`] that exports each record synchronously as it is
/// emitted.
///
/// ```rust
/// # #[cfg(feature = "testing")]
/// # fn main() {
/// use otellogs_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
///
/// let exporter = InMemoryLogExporter::default();
/// let provider = SdkLoggerProvider::builder()
///     .with_simple_exporter(exporter)
///     .build();
/// # }
/// # #[cfg(not(feature = "testing"))]
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct SimpleLogProcessor<T: LogExporter> {
    exporter: Mutex<T>,
    is_shutdown: AtomicBool,
    runtime: Option<tokio::runtime::Runtime>,
}

impl<T: LogExporter> SimpleLogProcessor<T> {
    /// Creates a new instance of `SimpleLogProcessor`.
    pub fn new(exporter: T) -> Self {
        otel_warn!(
            name: "SimpleLogProcessor.NotRecommendedForProduction",
            message = "SimpleLogProcessor exports on the emitting thread, one record at a time. Use BatchLogProcessor for production workloads."
        );
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => Some(runtime),
            Err(err) => {
                otel_error!(
                    name: "SimpleLogProcessor.RuntimeBuildFailed",
                    error = format!("{err}")
                );
                None
            }
        };
        SimpleLogProcessor {
            exporter: Mutex::new(exporter),
            is_shutdown: AtomicBool::new(false),
            runtime,
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match &self.runtime {
            // A runtime cannot be entered from inside another one.
            Some(runtime) if tokio::runtime::Handle::try_current().is_err() => {
                runtime.block_on(future)
            }
            _ => futures_executor::block_on(future),
        }
    }
}

impl<T: LogExporter> Drop for SimpleLogProcessor<T> {
    fn drop(&mut self) {
        // Dropping a runtime inside an async context panics.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl<T: LogExporter> LogProcessor for SimpleLogProcessor<T> {
    fn emit(&self, data: &Arc<LogData>) {
        if self.is_shutdown.load(Ordering::Relaxed) {
            otel_debug!(name: "SimpleLogProcessor.Emit.AfterShutdown");
            return;
        }

        let result = self
            .exporter
            .lock()
            .map_err(SdkError::from)
            .and_then(|exporter| {
                let batch = LogBatch::new(std::slice::from_ref(data));
                self.block_on(exporter.export(batch))
            });

        if let Err(err) = result {
            otel_error!(
                name: "SimpleLogProcessor.Emit.ExportError",
                error = format!("{err}")
            );
            global::handle_error(LogError::from(err.to_string()));
        }
    }

    fn force_flush_with_timeout(&self, _timeout: Duration) -> SdkResult {
        Ok(())
    }

    /// Runs the exporter's shutdown inline on the calling thread; the timeout
    /// is not enforced since nothing is buffered.
    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            otel_debug!(name: "SimpleLogProcessor.Shutdown.AlreadyShutdown");
            return Ok(());
        }
        let exporter = self.exporter.lock()?;
        self.block_on(exporter.shutdown())
    }
}
