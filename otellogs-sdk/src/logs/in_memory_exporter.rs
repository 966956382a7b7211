use crate::error::{SdkError, SdkResult};
use crate::logs::{LogBatch, LogData, LogExporter};
use std::sync::{Arc, Mutex};

type LogResult<T> = Result<T, SdkError>;

#[derive(Debug, Default)]
struct Inner {
    logs: Vec<Arc<LogData>>,
    batch_sizes: Vec<usize>,
    shutdown_calls: usize,
}

/// An in-memory logs exporter that stores exported records.
///
/// This exporter is useful for testing and debugging purposes. Clones share
/// the same storage, so keep one clone and hand the other to a processor.
///
/// ```
/// use otellogs_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
///
/// let exporter = InMemoryLogExporter::default();
/// let provider = SdkLoggerProvider::builder()
///     .with_simple_exporter(exporter.clone())
///     .build();
/// // emit logs through provider.logger(..)
/// let emitted = exporter.get_emitted_logs().unwrap();
/// assert!(emitted.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryLogExporter {
    inner: Arc<Mutex<Inner>>,
    reset_on_shutdown: bool,
}

impl Default for InMemoryLogExporter {
    fn default() -> Self {
        InMemoryLogExporterBuilder::new().build()
    }
}

/// Builder for [`InMemoryLogExporter`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogExporterBuilder {
    reset_on_shutdown: bool,
}

impl InMemoryLogExporterBuilder {
    /// Records are kept after shutdown unless
    /// [`reset_on_shutdown`](Self::reset_on_shutdown) is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear stored records when the exporter is shut down.
    pub fn reset_on_shutdown(mut self) -> Self {
        self.reset_on_shutdown = true;
        self
    }

    /// Creates a new instance of `InMemoryLogExporter`.
    pub fn build(&self) -> InMemoryLogExporter {
        InMemoryLogExporter {
            inner: Arc::new(Mutex::new(Inner::default())),
            reset_on_shutdown: self.reset_on_shutdown,
        }
    }
}

impl InMemoryLogExporter {
    /// Returns every exported record, in export order.
    pub fn get_emitted_logs(&self) -> LogResult<Vec<Arc<LogData>>> {
        Ok(self.inner.lock()?.logs.clone())
    }

    /// Size of each batch passed to `export`, in call order.
    pub fn export_batch_sizes(&self) -> LogResult<Vec<usize>> {
        Ok(self.inner.lock()?.batch_sizes.clone())
    }

    /// How many times `shutdown` was called.
    pub fn shutdown_count(&self) -> LogResult<usize> {
        Ok(self.inner.lock()?.shutdown_calls)
    }

    /// Clears stored records and batch sizes.
    pub fn reset(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.logs.clear();
            inner.batch_sizes.clear();
        }
    }
}

impl LogExporter for InMemoryLogExporter {
    #[allow(clippy::manual_async_fn)]
    fn export(&self, batch: LogBatch<'_>) -> impl std::future::Future<Output = SdkResult> + Send {
        async move {
            let mut inner = self.inner.lock()?;
            inner.batch_sizes.push(batch.len());
            inner.logs.extend(batch.as_slice().iter().cloned());
            Ok(())
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn shutdown(&self) -> impl std::future::Future<Output = SdkResult> + Send {
        async move {
            self.inner.lock()?.shutdown_calls += 1;
            if self.reset_on_shutdown {
                self.reset();
            }
            Ok(())
        }
    }
}
