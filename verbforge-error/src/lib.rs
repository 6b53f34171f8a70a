//! # verbforge-error
//!
//! Unified error handling for the verbforge pipeline.
//!
//! ## Design
//!
//! - **ErrorKind**: what went wrong (e.g. `RateLimited`, `SpecInvalid`)
//! - **ErrorStatus**: how to handle it (Permanent, Temporary, Persistent)
//! - **Context**: which operation failed and the key/value pairs around it
//! - **Source**: the wrapped underlying error, never leaked as a raw type
//!
//! ## Usage
//!
//! ```rust
//! use verbforge_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ArtifactNotFound, "no primary module generated")
//!         .with_operation("test_agent::generate_tests")
//!         .with_context("role", "conjugator"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, verbforge_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is handled once; callers further up only append context

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the verbforge Error
pub type Result<T> = std::result::Result<T, Error>;
