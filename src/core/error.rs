use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the Z21 client
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("CV operation refused by command station (short circuit: {short_circuit})")]
    Nack {
        /// True for the short-circuit NACK variant (`nack-sc`)
        short_circuit: bool,
    },

    #[error("Timed out after {0:?} waiting for reply")]
    Timeout(Duration),

    #[error("Function number {0} out of range (0-28)")]
    InvalidFunction(u8),

    #[error("Invalid function state {0:?}: must be \"on\", \"off\" or \"toggle\"")]
    InvalidFunctionState(String),

    #[error("CV number {0} out of range (1-1024)")]
    InvalidCv(u16),

    #[error("Event channel closed")]
    ChannelClosed,
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Returns true for either NACK variant
    pub fn is_nack(&self) -> bool {
        matches!(self, Error::Nack { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::protocol("test error");
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(err.to_string(), "Protocol error: test error");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_nack_display() {
        let err = Error::Nack {
            short_circuit: false,
        };
        assert!(err.is_nack());
        assert!(err.to_string().contains("short circuit: false"));

        let err = Error::Nack {
            short_circuit: true,
        };
        assert!(err.to_string().contains("short circuit: true"));
    }
}
