use thiserror::Error;

/// Classifies DNS resolution failures for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// The name does not exist (NXDOMAIN) or the server refused to answer
    NotFound,
    /// The lookup timed out
    Timeout,
    /// Socket-level failure while talking to the DNS server
    Io,
    /// Malformed or unexpected DNS response
    Protocol,
    /// Anything else reported by the resolver
    Other,
}

/// IP filtering error types
#[derive(Error, Debug)]
pub enum AclError {
    #[error("Cannot resolve host '{host}': {message}")]
    Resolve {
        host: String,
        kind: ResolveErrorKind,
        message: String,
    },

    #[error("Resolver initialization failed: {0}")]
    ResolverInit(String),

    #[error("{reason}")]
    ConnectionInterrupted { reason: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AclError {
    /// Build a resolution failure for `host`.
    pub fn resolve(host: impl Into<String>, kind: ResolveErrorKind, message: impl Into<String>) -> Self {
        AclError::Resolve {
            host: host.into(),
            kind,
            message: message.into(),
        }
    }

    /// Kind of a resolution failure, `None` for every other variant.
    pub fn resolve_kind(&self) -> Option<ResolveErrorKind> {
        match self {
            AclError::Resolve { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AclError>;
