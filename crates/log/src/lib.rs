//! # Rekey Log
//!
//! Subscriber setup for anything that runs a rotation: binaries, services
//! embedding the saga, and tests. Library crates only emit through
//! `tracing` macros; this crate decides where the events go.
//!
//! ```no_run
//! use rekey_log::{Config, init};
//!
//! // RUST_LOG / REKEY_LOG / REKEY_LOG_FORMAT
//! init(&Config::from_env()).expect("logger");
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;

pub use builder::LoggerBuilder;
pub use config::{Config, Format, Writer};
pub use error::{LogError, LogResult};

/// Install a global subscriber built from `config`.
///
/// # Errors
///
/// [`LogError::Filter`] for an unparsable level directive and
/// [`LogError::AlreadyInitialized`] if a global subscriber is already set.
pub fn init(config: &Config) -> LogResult<()> {
    LoggerBuilder::from_config(config.clone()).build()
}

/// Install the test preset, ignoring an already installed subscriber.
///
/// Safe to call from every test in a binary.
pub fn init_test() {
    let _ = init(&Config::test());
}
