//! Error kinds for verbforge operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on the kind to decide what to do; the orchestrator uses it
/// together with the failing stage to report a readable status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration (missing API key, bad base URL, ...)
    ConfigInvalid,

    /// Invalid argument passed to an operation
    InvalidArgument,

    // =========================================================================
    // Model/LLM errors
    // =========================================================================
    /// The model call failed
    InferenceFailed,

    /// The model answered with no text
    EmptyResponse,

    /// Provider rejected the request because of quota or rate
    RateLimited,

    /// Provider is unreachable or answered with a server error
    ProviderUnavailable,

    /// Credentials were missing or refused
    AuthenticationFailed,

    /// Network error
    NetworkFailed,

    // =========================================================================
    // Output interpretation errors
    // =========================================================================
    /// Failed to parse model output
    ParseFailed,

    /// Parsed requirement spec failed validation
    SpecInvalid,

    /// An expected generated artifact is missing
    ArtifactNotFound,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Serialization/deserialization failed
    SerializationFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Model
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::EmptyResponse => "EmptyResponse",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",

            // Output
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::SpecInvalid => "SpecInvalid",
            ErrorKind::ArtifactNotFound => "ArtifactNotFound",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailed | ErrorKind::RateLimited | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
