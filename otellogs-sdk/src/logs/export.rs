//! Log exporters
use crate::error::SdkResult;
use crate::logs::LogData;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// A batch of emitted log records handed to a [`LogExporter`].
///
/// Each record carries its own resource and instrumentation scope.
#[derive(Debug, Clone, Copy)]
pub struct LogBatch<'a> {
    data: &'a [Arc<LogData>],
}

impl<'a> LogBatch<'a> {
    /// Creates a batch over `data`, preserving order.
    pub fn new(data: &'a [Arc<LogData>]) -> LogBatch<'a> {
        LogBatch { data }
    }

    /// Iterates the records in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &'a LogData> + 'a {
        self.data.iter().map(|data| data.as_ref())
    }

    /// The shared records, for exporters that keep them past the call.
    pub fn as_slice(&self) -> &'a [Arc<LogData>] {
        self.data
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there is nothing to export.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `LogExporter` defines the interface that log exporters should implement.
///
/// Exporters are driven by a processor. The simple processor blocks the
/// emitting thread on the returned future and the batch processor polls it
/// on its worker thread. Both provide a current-thread tokio runtime when the
/// caller is not already inside one.
pub trait LogExporter: Send + Sync + Debug {
    /// Exports a batch of log records.
    ///
    /// A failed batch is not retried by the caller; exporters that want
    /// retries implement them internally.
    fn export(&self, batch: LogBatch<'_>) -> impl Future<Output = SdkResult> + Send;

    /// Releases exporter resources. Called at most once by a processor.
    fn shutdown(&self) -> impl Future<Output = SdkResult> + Send {
        async { Ok(()) }
    }
}
