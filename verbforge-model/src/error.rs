//! Model-layer error helpers
//!
//! Re-exports verbforge-error and maps provider failures onto it.

pub use verbforge_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

/// Convert a transport-level provider failure into a pipeline error.
///
/// The provider name and model are attached as context so a status line can
/// say which backend refused the call.
pub fn from_provider(err: ProviderError, provider: &str, model: &str) -> Error {
    let kind = match &err {
        ProviderError::Network(_) => ErrorKind::NetworkFailed,
        ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
        ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
        ProviderError::Api { status, .. } if *status >= 500 => ErrorKind::ProviderUnavailable,
        ProviderError::Api { .. } => ErrorKind::InferenceFailed,
        ProviderError::Parse(_) => ErrorKind::InferenceFailed,
        ProviderError::InvalidRequest(_) => ErrorKind::InvalidArgument,
        ProviderError::ModelNotFound(_) => ErrorKind::ConfigInvalid,
        ProviderError::Other(_) => ErrorKind::InferenceFailed,
    };

    let mut error = Error::new(kind, err.to_string())
        .with_operation("provider::complete")
        .with_context("provider", provider)
        .with_context("model", model);

    if let ProviderError::RateLimited { retry_after: Some(secs) } = &err {
        error = error.with_context("retry_after_secs", secs.to_string());
    }

    error.set_source(err)
}

/// Create a ConfigInvalid error for a missing environment variable
pub fn missing_env(var: &'static str) -> Error {
    Error::config_invalid(format!("environment variable {} is not set", var))
        .with_context("env", var)
}
