use std::io;

use crate::fd::Fd;

/// Result type alias for fdrill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fdrill operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A descriptor primitive reported failure, or a drill step
    /// deliberately signalled an application-level fault.
    #[error("{}", format_operation_failed(.operation, .fd))]
    OperationFailed {
        operation: String,
        fd: Option<Fd>,
        #[source]
        source: Option<io::Error>,
    },

    /// A lower-level backend condition distinct from the descriptor
    /// contract itself. The drill boundary re-signals this as
    /// `OperationFailed`, so only one failure taxonomy crosses the top
    /// level.
    #[error("backend condition: {message}")]
    External { message: String },
}

fn format_operation_failed(operation: &str, fd: &Option<Fd>) -> String {
    match fd {
        Some(fd) => format!("operation '{operation}' failed on fd {fd}"),
        None => format!("operation '{operation}' failed"),
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create an operation failure carrying the OS-level source
    #[must_use]
    pub fn operation_failed(operation: impl Into<String>, source: io::Error) -> Self {
        Error::OperationFailed {
            operation: operation.into(),
            fd: None,
            source: Some(source),
        }
    }

    /// Create a failure for releasing one specific descriptor
    #[must_use]
    pub fn close_failed(fd: Fd, source: io::Error) -> Self {
        Error::OperationFailed {
            operation: "close".to_string(),
            fd: Some(fd),
            source: Some(source),
        }
    }

    /// Create a deliberately injected application-level fault
    #[must_use]
    pub fn fault(operation: impl Into<String>) -> Self {
        Error::OperationFailed {
            operation: operation.into(),
            fd: None,
            source: None,
        }
    }

    /// Create a backend condition
    #[must_use]
    pub fn external(message: impl Into<String>) -> Self {
        Error::External {
            message: message.into(),
        }
    }

    /// Whether this is the terminal `OperationFailed` signal
    #[must_use]
    pub fn is_operation_failed(&self) -> bool {
        matches!(self, Error::OperationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_failed_display_includes_fd_when_present() {
        let err = Error::close_failed(Fd::from_raw(7), io::Error::from_raw_os_error(9));
        assert_eq!(err.to_string(), "operation 'close' failed on fd 7");
    }

    #[test]
    fn operation_failed_display_without_fd() {
        let err = Error::fault("induced-fault");
        assert_eq!(err.to_string(), "operation 'induced-fault' failed");
    }

    #[test]
    fn close_failed_chains_the_os_source() {
        let err = Error::close_failed(Fd::from_raw(3), io::Error::from_raw_os_error(9));
        let source = std::error::Error::source(&err).expect("source should be chained");
        assert!(!source.to_string().is_empty());
    }

    #[test]
    fn external_is_not_operation_failed() {
        assert!(!Error::external("backend wedged").is_operation_failed());
        assert!(Error::fault("step").is_operation_failed());
    }
}
