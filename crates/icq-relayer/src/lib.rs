pub mod commands;
pub mod config;
pub mod error;
pub mod metrics;
pub mod proofer;
pub mod relay;

pub use error::RelayError;
