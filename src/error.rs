//! Error types for the client core.
//!
//! Queue and waitable operations never fail observably except by timeout;
//! everything that can go wrong elsewhere is collected in [`ClientError`].

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Boxed error type returned by event handlers.
///
/// Handlers may fail with any error type; the dispatcher wraps the failure
/// in [`ClientError::Handler`] and surrenders the event to the worker.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level errors of the client core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// A required tag was absent from an event's data.
    #[error("no such tag: {tag}")]
    NoTag {
        /// Type name of the requested tag.
        tag: &'static str,
    },

    /// No module is loaded for the requested API identity, or the loaded
    /// implementation is of a different concrete type.
    #[error("no such module: {api}")]
    NoModule {
        /// Name of the requested module API.
        api: &'static str,
    },

    /// A handler failed while an event was being dispatched.
    ///
    /// The event's cursor still points at the identity whose handler
    /// failed; identities already dispatched stay past.
    #[error("handler failed while dispatching {event}: {source}")]
    Handler {
        /// Name of the event identity being dispatched.
        event: &'static str,
        /// The handler's error.
        #[source]
        source: BoxError,
    },

    /// A connection target string could not be parsed.
    #[error("invalid connection target: {target}")]
    InvalidTarget {
        /// The offending target string.
        target: String,
    },

    /// I/O error in the transport driver.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::NoTag { tag: "Parameters" };
        assert_eq!(format!("{}", err), "no such tag: Parameters");

        let err = ClientError::NoModule { api: "Protocol" };
        assert_eq!(format!("{}", err), "no such module: Protocol");

        let err = ClientError::InvalidTarget {
            target: "irc://host:99999999".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "invalid connection target: irc://host:99999999"
        );
    }

    #[test]
    fn test_handler_error_chaining() {
        let source: BoxError = "boom".into();
        let err = ClientError::Handler {
            event: "RawLineEvent",
            source,
        };
        let chained = std::error::Error::source(&err);
        assert!(chained.is_some());
        assert_eq!(chained.unwrap().to_string(), "boom");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: ClientError = io_err.into();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
