pub mod cli;
pub mod command;

pub use cli::{Cli, Commands};
pub use command::{init, start, version};
