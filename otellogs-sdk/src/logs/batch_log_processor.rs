//! # Batch Log Processor
//!
//! The `BatchLogProcessor` buffers emitted records in a bounded queue and
//! exports them in batches from a dedicated worker thread. An export happens
//! when a full batch is waiting, when the scheduled delay elapses, on
//! [`force_flush`] and on [`shutdown`].
//!
//! ```ascii
//!   +-----+---------------+   +-----------------------+   +-------------------+
//!   |     |               |   |                       |   |                   |
//!   | SDK | Logger.emit() +---> (Batch)LogProcessor   +--->  (OTLP exporter)  |
//!   +-----+---------------+   +-----------------------+   +-------------------+
//! ```
//!
//! [`force_flush`]: crate::logs::LogProcessor::force_flush
//! [`shutdown`]: crate::logs::LogProcessor::shutdown

use crate::error::{SdkError, SdkResult};
use crate::logs::log_processor::LogProcessor;
use crate::logs::{LogBatch, LogData, LogExporter};

use otellogs::logs::LogError;
use otellogs::{global, otel_debug, otel_error, otel_info, otel_warn};

use std::cmp::min;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Default delay interval between two consecutive exports.
pub(crate) const SCHEDULED_DELAY_DEFAULT: Duration = Duration::from_millis(1_000);
/// Default maximum time allowed for one export call.
pub(crate) const MAX_EXPORT_TIMEOUT_DEFAULT: Duration = Duration::from_millis(30_000);
/// Default maximum queue size.
pub(crate) const MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
/// Default maximum batch size.
pub(crate) const MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;

const CONTROL_CHANNEL_CAPACITY: usize = 64;
const WORKER_THREAD_NAME: &str = "otellogs.BatchLogProcessor";

const RUNNING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const STOPPED: u8 = 2;

/// Control messages from application threads to the worker thread.
#[derive(Debug)]
enum BatchMessage {
    /// Sent once the data queue holds at least `max_export_batch_size` records.
    ExportLog(Arc<AtomicBool>),
    /// Export everything queued and report back.
    ForceFlush(SyncSender<SdkResult>),
    /// Export everything queued, shut the exporter down and stop the worker.
    Shutdown(SyncSender<SdkResult>),
}

/// A [`LogProcessor`] that exports records in batches from a background
/// thread.
///
/// The worker thread owns the exporter and drives its futures on a private
/// current-thread tokio runtime, so exporters that need timers or network
/// I/O work regardless of the application's own runtime.
///
/// `force_flush` and `shutdown` block the caller until the worker answers or
/// the timeout expires. Do not call them from inside a current-thread tokio
/// runtime that the exporter depends on.
///
/// ```rust
/// # #[cfg(feature = "testing")]
/// # fn main() {
/// use otellogs_sdk::logs::{BatchConfigBuilder, BatchLogProcessor, InMemoryLogExporter, SdkLoggerProvider};
/// use std::time::Duration;
///
/// let exporter = InMemoryLogExporter::default();
/// let processor = BatchLogProcessor::builder(exporter)
///     .with_batch_config(
///         BatchConfigBuilder::default()
///             .with_max_queue_size(2048)
///             .with_max_export_batch_size(512)
///             .with_scheduled_delay(Duration::from_secs(5))
///             .build(),
///     )
///     .build();
///
/// let provider = SdkLoggerProvider::builder()
///     .with_log_processor(processor)
///     .build();
/// # }
/// # #[cfg(not(feature = "testing"))]
/// # fn main() {}
/// ```
pub struct BatchLogProcessor {
    logs_sender: SyncSender<Arc<LogData>>,
    message_sender: SyncSender<BatchMessage>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    state: AtomicU8,
    export_log_message_sent: Arc<AtomicBool>,
    current_batch_size: Arc<AtomicUsize>,
    max_export_batch_size: usize,
    dropped_logs_count: AtomicUsize,
    max_queue_size: usize,
}

impl Debug for BatchLogProcessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchLogProcessor")
            .field("state", &self.state.load(Ordering::Relaxed))
            .field("max_queue_size", &self.max_queue_size)
            .field("max_export_batch_size", &self.max_export_batch_size)
            .finish()
    }
}

impl LogProcessor for BatchLogProcessor {
    fn emit(&self, data: &Arc<LogData>) {
        if self.state.load(Ordering::Acquire) != RUNNING {
            otel_debug!(
                name: "BatchLogProcessor.Emit.AfterShutdown",
                message = "Record emitted after shutdown was dropped."
            );
            return;
        }

        match self.logs_sender.try_send(Arc::clone(data)) {
            Ok(()) => {
                if self.current_batch_size.fetch_add(1, Ordering::Relaxed) + 1
                    >= self.max_export_batch_size
                    && !self.export_log_message_sent.load(Ordering::Relaxed)
                    && !self.export_log_message_sent.swap(true, Ordering::Relaxed)
                {
                    let message = BatchMessage::ExportLog(Arc::clone(&self.export_log_message_sent));
                    if self.message_sender.try_send(message).is_err() {
                        self.export_log_message_sent.store(false, Ordering::Relaxed);
                    }
                }
            }
            Err(TrySendError::Full(_)) => {
                if self.dropped_logs_count.fetch_add(1, Ordering::Relaxed) == 0 {
                    otel_warn!(
                        name: "BatchLogProcessor.LogDroppingStarted",
                        message = "Queue is full, dropping records. The total dropped count is reported at shutdown."
                    );
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                otel_warn!(
                    name: "BatchLogProcessor.Emit.WorkerGone",
                    message = "The worker thread is not running. Record dropped."
                );
            }
        }
    }

    fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.state.load(Ordering::Acquire) != RUNNING {
            return Err(SdkError::AlreadyShutdown);
        }

        let (sender, receiver) = mpsc::sync_channel(1);
        match self.message_sender.try_send(BatchMessage::ForceFlush(sender)) {
            Ok(()) => receiver.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => SdkError::Timeout(timeout),
                RecvTimeoutError::Disconnected => {
                    SdkError::InternalFailure("worker thread exited during flush".into())
                }
            })?,
            Err(TrySendError::Full(_)) => {
                otel_debug!(name: "BatchLogProcessor.ForceFlush.ControlChannelFull");
                Err(SdkError::InternalFailure(
                    "control channel is full, too many flush or shutdown calls in flight".into(),
                ))
            }
            Err(TrySendError::Disconnected(_)) => Err(SdkError::InternalFailure(
                "worker thread is not running".into(),
            )),
        }
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self
            .state
            .compare_exchange(RUNNING, SHUTTING_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            otel_debug!(name: "BatchLogProcessor.Shutdown.AlreadyShutdown");
            return Ok(());
        }

        let dropped_logs = self.dropped_logs_count.load(Ordering::Relaxed);
        if dropped_logs > 0 {
            otel_warn!(
                name: "BatchLogProcessor.LogsDropped",
                dropped_logs_count = dropped_logs,
                max_queue_size = self.max_queue_size,
                message = "Records were dropped because the queue was full. Consider a larger queue or a shorter scheduled delay."
            );
        }

        let (sender, receiver) = mpsc::sync_channel(1);
        if let Err(err) = self.message_sender.try_send(BatchMessage::Shutdown(sender)) {
            self.state.store(STOPPED, Ordering::Release);
            return Err(match err {
                TrySendError::Full(_) => SdkError::InternalFailure(
                    "control channel is full, shutdown could not be delivered".into(),
                ),
                TrySendError::Disconnected(_) => {
                    SdkError::InternalFailure("worker thread is not running".into())
                }
            });
        }

        match receiver.recv_timeout(timeout) {
            Ok(result) => {
                if let Some(handle) = self.handle.lock()?.take() {
                    if handle.join().is_err() {
                        otel_error!(name: "BatchLogProcessor.Shutdown.WorkerPanicked");
                    }
                }
                self.state.store(STOPPED, Ordering::Release);
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                otel_error!(
                    name: "BatchLogProcessor.Shutdown.Timeout",
                    timeout_ms = timeout.as_millis() as u64
                );
                Err(SdkError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.state.store(STOPPED, Ordering::Release);
                Err(SdkError::InternalFailure(
                    "worker thread exited during shutdown".into(),
                ))
            }
        }
    }
}

impl BatchLogProcessor {
    pub(crate) fn new<E>(exporter: E, config: BatchConfig) -> Self
    where
        E: LogExporter + 'static,
    {
        let (logs_sender, logs_receiver) = mpsc::sync_channel::<Arc<LogData>>(config.max_queue_size);
        let (message_sender, message_receiver) =
            mpsc::sync_channel::<BatchMessage>(CONTROL_CHANNEL_CAPACITY);
        let max_queue_size = config.max_queue_size;
        let max_export_batch_size = config.max_export_batch_size;
        let current_batch_size = Arc::new(AtomicUsize::new(0));
        let worker = Worker {
            exporter,
            logs_receiver,
            message_receiver,
            current_batch_size: Arc::clone(&current_batch_size),
            config,
        };

        let handle = match thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                otel_error!(
                    name: "BatchLogProcessor.ThreadSpawnFailed",
                    error = format!("{err}")
                );
                None
            }
        };

        BatchLogProcessor {
            logs_sender,
            message_sender,
            handle: Mutex::new(handle),
            state: AtomicU8::new(RUNNING),
            export_log_message_sent: Arc::new(AtomicBool::new(false)),
            current_batch_size,
            max_export_batch_size,
            dropped_logs_count: AtomicUsize::new(0),
            max_queue_size,
        }
    }

    /// Create a new batch processor builder
    pub fn builder<E>(exporter: E) -> BatchLogProcessorBuilder<E>
    where
        E: LogExporter,
    {
        BatchLogProcessorBuilder {
            exporter,
            config: Default::default(),
        }
    }
}

struct Worker<E> {
    exporter: E,
    logs_receiver: Receiver<Arc<LogData>>,
    message_receiver: Receiver<BatchMessage>,
    current_batch_size: Arc<AtomicUsize>,
    config: BatchConfig,
}

impl<E: LogExporter> Worker<E> {
    fn run(self) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                otel_error!(
                    name: "BatchLogProcessor.RuntimeBuildFailed",
                    error = format!("{err}")
                );
                return;
            }
        };

        otel_debug!(
            name: "BatchLogProcessor.ThreadStarted",
            interval_in_millisecs = self.config.scheduled_delay.as_millis() as u64,
            max_export_batch_size = self.config.max_export_batch_size,
            max_queue_size = self.config.max_queue_size,
        );

        let mut last_export_time = Instant::now();
        let mut logs = Vec::with_capacity(self.config.max_export_batch_size);

        loop {
            let remaining_time = self
                .config
                .scheduled_delay
                .checked_sub(last_export_time.elapsed())
                .unwrap_or(Duration::ZERO);

            match self.message_receiver.recv_timeout(remaining_time) {
                Ok(BatchMessage::ExportLog(export_log_message_sent)) => {
                    export_log_message_sent.store(false, Ordering::Relaxed);
                    otel_debug!(name: "BatchLogProcessor.ExportingDueToBatchSize");
                    let _ = self.get_logs_and_export(&runtime, &mut logs, &mut last_export_time);
                }
                Ok(BatchMessage::ForceFlush(sender)) => {
                    otel_debug!(name: "BatchLogProcessor.ExportingDueToForceFlush");
                    let result = self.get_logs_and_export(&runtime, &mut logs, &mut last_export_time);
                    let _ = sender.send(result);
                }
                Ok(BatchMessage::Shutdown(sender)) => {
                    otel_debug!(name: "BatchLogProcessor.ExportingDueToShutdown");
                    let flushed = self.get_logs_and_export(&runtime, &mut logs, &mut last_export_time);
                    let stopped = self.shutdown_exporter(&runtime);
                    let _ = sender.send(flushed.and(stopped));
                    otel_debug!(name: "BatchLogProcessor.ThreadExiting", reason = "ShutdownRequested");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    otel_debug!(name: "BatchLogProcessor.ExportingDueToTimer");
                    let _ = self.get_logs_and_export(&runtime, &mut logs, &mut last_export_time);
                    last_export_time = Instant::now();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    otel_debug!(name: "BatchLogProcessor.ThreadExiting", reason = "MessageSenderDisconnected");
                    break;
                }
            }
        }
        otel_info!(name: "BatchLogProcessor.ThreadStopped");
    }

    /// Drains the records counted at call time, in batches of at most
    /// `max_export_batch_size`. Returns the result of the last export.
    fn get_logs_and_export(
        &self,
        runtime: &tokio::runtime::Runtime,
        logs: &mut Vec<Arc<LogData>>,
        last_export_time: &mut Instant,
    ) -> SdkResult {
        let target = self.current_batch_size.load(Ordering::Relaxed);
        let mut result = Ok(());
        let mut total_exported_logs: usize = 0;

        while total_exported_logs < target {
            while let Ok(log) = self.logs_receiver.try_recv() {
                logs.push(log);
                if logs.len() == self.config.max_export_batch_size {
                    break;
                }
            }

            let count_of_logs = logs.len();
            if count_of_logs == 0 {
                break;
            }
            total_exported_logs += count_of_logs;
            result = self.export_batch(runtime, logs, last_export_time);
            self.current_batch_size
                .fetch_sub(count_of_logs, Ordering::Relaxed);
        }
        result
    }

    fn export_batch(
        &self,
        runtime: &tokio::runtime::Runtime,
        batch: &mut Vec<Arc<LogData>>,
        last_export_time: &mut Instant,
    ) -> SdkResult {
        *last_export_time = Instant::now();
        let timeout = self.config.max_export_timeout;
        // The timer must be created inside the runtime.
        let outcome = runtime.block_on(async {
            tokio::time::timeout(timeout, self.exporter.export(LogBatch::new(batch))).await
        });
        batch.clear();

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                otel_error!(
                    name: "BatchLogProcessor.ExportError",
                    error = format!("{err}")
                );
                global::handle_error(LogError::from(err.to_string()));
                Err(err)
            }
            Err(_elapsed) => {
                otel_error!(
                    name: "BatchLogProcessor.ExportTimedOut",
                    timeout_ms = timeout.as_millis() as u64
                );
                global::handle_error(LogError::ExportTimedOut(timeout));
                Err(SdkError::Timeout(timeout))
            }
        }
    }

    fn shutdown_exporter(&self, runtime: &tokio::runtime::Runtime) -> SdkResult {
        let timeout = self.config.max_export_timeout;
        runtime
            .block_on(async { tokio::time::timeout(timeout, self.exporter.shutdown()).await })
            .unwrap_or(Err(SdkError::Timeout(timeout)))
    }
}

/// A builder for creating [`BatchLogProcessor`] instances.
#[derive(Debug)]
pub struct BatchLogProcessorBuilder<E> {
    exporter: E,
    config: BatchConfig,
}

impl<E> BatchLogProcessorBuilder<E>
where
    E: LogExporter + 'static,
{
    /// Set the BatchConfig for [`BatchLogProcessorBuilder`]
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchLogProcessorBuilder { config, ..self }
    }

    /// Build a batch processor
    pub fn build(self) -> BatchLogProcessor {
        BatchLogProcessor::new(self.exporter, self.config)
    }
}

/// Batch log processor configuration.
/// Use [`BatchConfigBuilder`] to configure your own instance of [`BatchConfig`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// The maximum queue size to buffer logs for delayed processing. If the
    /// queue gets full it drops the logs. The default value is 2048.
    pub(crate) max_queue_size: usize,

    /// The delay between two consecutive exports. The default value is
    /// 1 second.
    pub(crate) scheduled_delay: Duration,

    /// The maximum number of logs to process in a single batch. If more than
    /// one batch is waiting the batches are exported back to back. The
    /// default value is 512.
    pub(crate) max_export_batch_size: usize,

    /// The maximum duration of one export call. The default value is
    /// 30 seconds.
    pub(crate) max_export_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

/// A builder for creating [`BatchConfig`] instances.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: SCHEDULED_DELAY_DEFAULT,
            max_export_batch_size: MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: MAX_EXPORT_TIMEOUT_DEFAULT,
        }
    }
}

impl BatchConfigBuilder {
    /// Set max_queue_size for [`BatchConfigBuilder`].
    /// Records emitted while the queue is full are dropped.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set scheduled_delay for [`BatchConfigBuilder`].
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = scheduled_delay;
        self
    }

    /// Set max_export_timeout for [`BatchConfigBuilder`].
    pub fn with_max_export_timeout(mut self, max_export_timeout: Duration) -> Self {
        self.max_export_timeout = max_export_timeout;
        self
    }

    /// Set max_export_batch_size for [`BatchConfigBuilder`].
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Builds a `BatchConfig`. The batch size is capped at the queue size.
    pub fn build(self) -> BatchConfig {
        let max_queue_size = self.max_queue_size.max(1);
        BatchConfig {
            max_queue_size,
            scheduled_delay: self.scheduled_delay,
            max_export_timeout: self.max_export_timeout,
            max_export_batch_size: min(self.max_export_batch_size, max_queue_size).max(1),
        }
    }
}
