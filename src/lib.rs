//! NAADSM Event Decoder
//!
//! Decodes coarse per-day disease-state traces of epidemic simulations into
//! discrete transition event logs.
//!
//! This library provides functionality for:
//! - Compiling a catalog of single-step transitions into a graph of multi-step paths
//! - Decoding per-unit state snapshots into (transition, subject, source, day) events
//! - Inferring a consistent initial state from the first day of several runs
//! - Reading NAADSM text traces run by run

pub mod cli;
pub mod config;
pub mod error;
pub mod state_machine;
pub mod trace;
pub mod trajectory;

pub use config::Config;
pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with the given log level
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
