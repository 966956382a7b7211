//! # Logs Bridge API
//!
//! This API is not intended to be called by application developers directly.
//! It is provided for logging library authors to build log appenders that
//! bridge existing logging systems into this pipeline.
mod error;
mod logger;
mod noop;
mod record;
mod serde;

pub use error::{LogError, LogResult};
pub use logger::{Logger, LoggerProvider};
pub use noop::{NoopLogRecord, NoopLogger, NoopLoggerProvider};
pub use record::{AnyValue, LogRecord, Severity};
pub use self::serde::{format_time, rfc3339_nanos, serialize};
