//! Error types for scan collaborators
//!
//! Probe failures never surface as `Err` from the pipeline; they are captured
//! into the result row. These errors are what collaborators hand back to the
//! pipeline before it classifies them.

/// Core Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by scan collaborators
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Listing the services of a context failed
    #[error("failed to list services in {context}: {message}")]
    ServiceList {
        /// Context whose services could not be listed
        context: String,
        /// Underlying failure
        message: String,
    },

    /// Starting or driving a tunnel failed
    #[error("{message}")]
    Tunnel { message: String },

    /// TLS connection or handshake failed
    #[error("{message}")]
    Tls { message: String },

    /// The peer certificate could not be parsed
    #[error("certificate parsing error: {message}")]
    Certificate { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn service_list(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ServiceList {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn tunnel(message: impl Into<String>) -> Self {
        Error::Tunnel {
            message: message.into(),
        }
    }

    pub fn tls(message: impl Into<String>) -> Self {
        Error::Tls {
            message: message.into(),
        }
    }

    pub fn certificate(message: impl Into<String>) -> Self {
        Error::Certificate {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunnel_and_tls_errors_display_bare_message() {
        assert_eq!(
            Error::tunnel("Error: unable to forward").to_string(),
            "Error: unable to forward"
        );
        assert_eq!(Error::tls("connection reset").to_string(), "connection reset");
    }

    #[test]
    fn service_list_error_names_context() {
        let err = Error::service_list("prod", "forbidden");
        assert_eq!(err.to_string(), "failed to list services in prod: forbidden");
    }
}
