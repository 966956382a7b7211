//! Errors returned by processors, exporters and the logger provider.
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by flush and shutdown operations, and by exporters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SdkError {
    /// Shutdown has already been invoked.
    ///
    /// While shutdown is idempotent and calling it multiple times has no
    /// impact, this error suggests that another part of the application is
    /// invoking `shutdown` earlier than intended. Users should review their
    /// code to identify unintended or duplicate shutdown calls and ensure it is
    /// only triggered once at the correct place.
    #[error("Shutdown already invoked")]
    AlreadyShutdown,

    /// Operation timed out before completing.
    ///
    /// This does not necessarily indicate a failure. The operation may still
    /// be complete or succeed eventually, but the result cannot be confirmed
    /// within the allotted time.
    #[error("Operation timed out after {} milliseconds", .0.as_millis())]
    Timeout(Duration),

    /// Operation failed due to an internal error, such as a failed export or
    /// a poisoned lock. Several failures may be joined with `; `.
    #[error("Operation failed: {0}")]
    InternalFailure(String),
}

impl<T> From<PoisonError<T>> for SdkError {
    fn from(err: PoisonError<T>) -> Self {
        SdkError::InternalFailure(format!("lock poisoned: {err}"))
    }
}

/// A specialized `Result` type for SDK operations.
pub type SdkResult = Result<(), SdkError>;
