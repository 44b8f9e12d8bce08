//! # pulumi-core
//!
//! Shared foundation for the Pulumi plugin subsystem providing:
//! - Error types distinguishing the failure modes callers care about
//! - Tolerant semantic version parsing (leading `v`, missing components)
//! - A blocking HTTP download helper with retries
//! - Streaming tar.gz extraction
//! - User config root discovery

pub mod archive;
pub mod error;
pub mod http;
pub mod utils;
pub mod version;

pub use error::{Error, Result};
pub use utils::{is_truthy, pulumi_home};

/// Current CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
