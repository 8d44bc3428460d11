pub mod cli;
#[allow(clippy::module_inception)]
pub mod config;
pub mod types;

pub use config::Config;
pub use types::{AcceptErrorPolicy, Deadlines, LogLevel};
