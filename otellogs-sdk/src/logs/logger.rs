use super::{LogData, SdkLogRecord, SdkLoggerProvider};
use otellogs::InstrumentationScope;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
/// The object for emitting [`LogRecord`]s.
///
/// Every record emitted through one logger carries the logger's
/// instrumentation scope and the provider's resource.
///
/// [`LogRecord`]: otellogs::logs::LogRecord
pub struct SdkLogger {
    scope: Arc<InstrumentationScope>,
    provider: SdkLoggerProvider,
}

impl SdkLogger {
    pub(crate) fn new(scope: InstrumentationScope, provider: SdkLoggerProvider) -> Self {
        SdkLogger {
            scope: Arc::new(scope),
            provider,
        }
    }

    /// The scope stamped on every record emitted by this logger.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }
}

impl otellogs::logs::Logger for SdkLogger {
    type LogRecord = SdkLogRecord;

    fn create_log_record(&self) -> Self::LogRecord {
        let mut record = SdkLogRecord::new();
        record.observed_timestamp = Some(SystemTime::now());
        record
    }

    /// Freezes `record` and hands the snapshot to every processor, in
    /// registration order.
    fn emit(&self, mut record: Self::LogRecord) {
        let processors = self.provider.processors();
        if processors.is_empty() {
            return;
        }
        if record.observed_timestamp.is_none() {
            record.observed_timestamp = Some(SystemTime::now());
        }

        let data = Arc::new(LogData::new(
            record,
            self.provider.shared_resource(),
            Arc::clone(&self.scope),
        ));
        for state in processors.iter() {
            state.emit(&data);
        }
    }
}
