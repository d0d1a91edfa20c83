//! Resolver errors

use thiserror::Error;

/// Result type for resolution
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Failure reported by a transport
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never completed
    #[error("Network error: {0}")]
    Network(String),

    /// The response body was not JSON
    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Status { .. } => "TRANSPORT_STATUS",
            TransportError::Network(_) => "TRANSPORT_NETWORK",
            TransportError::Decode(_) => "TRANSPORT_DECODE",
        }
    }
}

/// Errors returned by the values resolver
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// The transport call failed
    #[error("Failed to resolve values from {uri}: {source}")]
    Transport {
        uri: String,
        #[source]
        source: TransportError,
    },

    /// A remote endpoint has no uri
    #[error("Remote endpoint has no uri")]
    MissingUri,

    /// The response did not have the mapped shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ResolutionError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolutionError::Transport { .. } => "RESOLUTION_TRANSPORT",
            ResolutionError::MissingUri => "RESOLUTION_MISSING_URI",
            ResolutionError::InvalidResponse(_) => "RESOLUTION_INVALID_RESPONSE",
        }
    }

    /// Whether the failure came from the transport
    pub fn is_transport(&self) -> bool {
        matches!(self, ResolutionError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_transport_error_is_source() {
        let err = ResolutionError::Transport {
            uri: "/api/countries".into(),
            source: TransportError::Status {
                status: 503,
                body: "unavailable".into(),
            },
        };
        assert_eq!(err.code(), "RESOLUTION_TRANSPORT");
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "Failed to resolve values from /api/countries: HTTP 503: unavailable"
        );
        assert_eq!(err.source().unwrap().to_string(), "HTTP 503: unavailable");
    }

    #[test]
    fn test_codes() {
        assert_eq!(ResolutionError::MissingUri.code(), "RESOLUTION_MISSING_URI");
        assert_eq!(TransportError::Network("reset".into()).code(), "TRANSPORT_NETWORK");
    }
}
