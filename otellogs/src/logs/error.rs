use std::time::Duration;

use thiserror::Error;

/// Describe the result of operations in the logs pipeline that are reported
/// out of band rather than returned.
pub type LogResult<T> = Result<T, LogError>;

/// Errors surfaced through the error handler by log exporters and clients.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LogError {
    /// The collector accepted the request but rejected some records.
    #[error(
        "OTLP partial success: {} ({rejected} logs rejected)",
        message_or_placeholder(.message)
    )]
    PartialSuccess {
        /// Message returned by the collector.
        message: String,
        /// Number of rejected log records.
        rejected: i64,
    },

    /// Export took longer than allowed.
    #[error("exporter timed out after {} seconds", .0.as_secs())]
    ExportTimedOut(Duration),

    /// Other errors propagated from a log exporter or processor.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

fn message_or_placeholder(message: &str) -> &str {
    if message.is_empty() {
        "empty message"
    } else {
        message
    }
}

impl From<String> for LogError {
    fn from(err_msg: String) -> Self {
        LogError::Other(Box::new(Custom(err_msg)))
    }
}

impl From<&'static str> for LogError {
    fn from(err_msg: &'static str) -> Self {
        LogError::Other(Box::new(Custom(err_msg.into())))
    }
}

/// Wrap type for string
#[derive(Error, Debug)]
#[error("{0}")]
struct Custom(String);

#[cfg(test)]
mod tests {
    use super::LogError;

    #[test]
    fn partial_success_message() {
        let err = LogError::PartialSuccess {
            message: "partial".into(),
            rejected: 2,
        };
        assert_eq!(
            err.to_string(),
            "OTLP partial success: partial (2 logs rejected)"
        );
    }

    #[test]
    fn partial_success_without_message() {
        let err = LogError::PartialSuccess {
            message: String::new(),
            rejected: 5,
        };
        assert_eq!(
            err.to_string(),
            "OTLP partial success: empty message (5 logs rejected)"
        );
    }
}
