//! Process-wide logs state.
//!
//! Two pieces of global state exist, both with inert defaults:
//!
//! - the logger provider, a no-op until [`set_logger_provider`] installs one;
//! - the error handler, which prints to stderr until [`set_error_handler`]
//!   installs one.
//!
//! Components in this workspace take their collaborators by injection; the
//! globals are the fallback when nothing was injected.
//!
//! ```
//! use otellogs::global;
//! use otellogs::logs::{LogRecord, Logger, NoopLoggerProvider};
//!
//! // in main or other app start
//! let _ = global::set_logger_provider(NoopLoggerProvider::new());
//!
//! // anywhere else
//! let logger = global::logger("my-component");
//! let mut record = logger.create_log_record();
//! record.set_body("started".into());
//! logger.emit(record);
//! ```

mod error_handler;
mod internal_logging;
mod logs;

pub use error_handler::{handle_error, set_error_handler, Error};
pub use logs::{
    logger, logger_provider, set_logger_provider, shutdown_logger_provider, BoxedLogger,
    GlobalLogRecord, GlobalLoggerProvider,
};
