use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::logs::LogError;

/// Errors routed through the process-wide error handler.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to export or process logs.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Anything else, as a message.
    #[error("{0}")]
    Other(String),
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::Other(err.to_string())
    }
}

struct ErrorHandler(Box<dyn Fn(Error) + Send + Sync>);

static GLOBAL_ERROR_HANDLER: Lazy<RwLock<Option<ErrorHandler>>> = Lazy::new(|| RwLock::new(None));

/// Handle error using the globally configured error handler.
///
/// Writes to stderr if unset.
pub fn handle_error<T: Into<Error>>(err: T) {
    let err = err.into();
    match GLOBAL_ERROR_HANDLER.read() {
        Ok(guard) => match guard.as_ref() {
            Some(handler) => (handler.0)(err),
            None => eprintln!("otellogs error occurred. {err}"),
        },
        Err(_) => eprintln!("otellogs error occurred. {err}"),
    }
}

/// Set global error handler.
///
/// The handler replaces any earlier one and is called synchronously from
/// whichever thread reports the error, so it must not block for long.
pub fn set_error_handler<F>(f: F) -> Result<(), Error>
where
    F: Fn(Error) + Send + Sync + 'static,
{
    GLOBAL_ERROR_HANDLER
        .write()
        .map(|mut handler| *handler = Some(ErrorHandler(Box::new(f))))
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn installed_handler_receives_errors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        set_error_handler(move |err| sink.lock().unwrap().push(err.to_string())).unwrap();

        handle_error(LogError::PartialSuccess {
            message: "bad".into(),
            rejected: 1,
        });

        let seen = seen.lock().unwrap();
        assert!(seen
            .iter()
            .any(|msg| msg == "OTLP partial success: bad (1 logs rejected)"));
    }
}
