use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

use super::{
    cli::CliConfig,
    types::{AcceptErrorPolicy, Deadlines, LogLevel},
};

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static ROOT_CONFIG: OnceLock<Arc<RwLock<Config>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

/// Process-wide settings. Fixed after startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: String,
    pub proxy_addr: String,
    pub stats_addr: String,
    pub concurrency: usize,
    pub log_level: LogLevel,
    pub deadlines: Deadlines,
    pub on_accept_error: AcceptErrorPolicy,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    pub fn init() {
        CliConfig::init();

        let cli = CliConfig::snapshot();
        let next = Config {
            listen_addr: cli.listen_addr,
            proxy_addr: cli.proxy_addr,
            stats_addr: cli.stats_addr,
            concurrency: cli.concurrency,
            log_level: cli.log_level,
            deadlines: cli.deadlines,
            on_accept_error: cli.on_accept_error,
        };

        if let Some(handle) = ROOT_CONFIG.get() {
            *handle.write() = next;
        } else {
            let _ = ROOT_CONFIG.set(Arc::new(RwLock::new(next)));
        }
    }

    pub fn snapshot() -> Config {
        Self::handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- Config: Private -------------------------------------------------------

impl Config {
    fn handle() -> Arc<RwLock<Config>> {
        ROOT_CONFIG
            .get()
            .expect("Config not initialized; call Config::init() first")
            .clone()
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
