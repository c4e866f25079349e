//! # hashira-kit
//!
//! Small filesystem and encoding helpers used by the hashira crates.
//!
//! [`fs::PathResolver`] resolves relative paths against an explicit project
//! root instead of a process-wide variable, so callers that relocate the root
//! (for example to the executable's directory when running as a service) pass
//! the resolver around.

pub mod encoding;
pub mod fs;

pub use encoding::EncodingError;
pub use fs::{format_size, PathKind, PathResolver};
