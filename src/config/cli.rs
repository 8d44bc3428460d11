use clap::Parser;
use parking_lot::RwLock;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use super::types::{AcceptErrorPolicy, Deadlines, LogLevel};

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static CLI_CONFIG: OnceLock<Arc<RwLock<CliConfig>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct CliConfig {
    pub listen_addr: String,
    pub proxy_addr: String,
    pub stats_addr: String,
    pub concurrency: usize,
    pub log_level: LogLevel,
    pub deadlines: Deadlines,
    pub on_accept_error: AcceptErrorPolicy,
}

impl CliConfig {
    pub fn init() {
        CLI_CONFIG.get_or_init(|| Arc::new(RwLock::new(Self::from_args(Args::parse()))));
    }

    pub fn snapshot() -> CliConfig {
        handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- CliConfig: Private ----------------------------------------------------

impl CliConfig {
    fn from_args(args: Args) -> Self {
        Self {
            listen_addr: args.listen,
            proxy_addr: args.proxy,
            stats_addr: args.stats,
            concurrency: args.concurrency,
            log_level: args.log_level,
            deadlines: Deadlines {
                queue: args.queue_timeout,
                dial: args.dial_timeout,
                transfer: args.transfer_timeout,
            },
            on_accept_error: args.on_accept_error,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "slotgate", version, about = "Concurrency-limiting TCP relay")]
struct Args {
    // Listen for client connections at this address. Resolved once at startup;
    // a bare `:port` means every IPv4 interface.
    #[arg(short = 'l', long = "listen", env = "SLOTGATE_LISTEN", default_value = "127.0.0.1:8301")]
    listen: String,

    // Relay admitted clients to this address. Host names are resolved on every dial.
    #[arg(short = 'p', long = "proxy", env = "SLOTGATE_PROXY", default_value = "127.0.0.1:8300")]
    proxy: String,

    // Serve the active/waiting line to anyone connecting here. Same form as --listen.
    #[arg(short = 's', long = "stats", env = "SLOTGATE_STATS", default_value = "127.0.0.1:8299")]
    stats: String,

    // Number of sessions allowed to hold a backend connection at once.
    #[arg(
        short = 'c',
        long = "concurrency",
        env = "SLOTGATE_CONCURRENCY",
        default_value_t = 1,
        value_parser = parse_capacity
    )]
    concurrency: usize,

    #[arg(long = "log", env = "SLOTGATE_LOG", default_value = "info")]
    log_level: LogLevel,

    // Deadlines are off unless set (e.g. 500ms, 5s, 2m).
    #[arg(long = "queue-timeout", env = "SLOTGATE_QUEUE_TIMEOUT", value_parser = parse_duration)]
    queue_timeout: Option<Duration>,

    #[arg(long = "dial-timeout", env = "SLOTGATE_DIAL_TIMEOUT", value_parser = parse_duration)]
    dial_timeout: Option<Duration>,

    #[arg(long = "transfer-timeout", env = "SLOTGATE_TRANSFER_TIMEOUT", value_parser = parse_duration)]
    transfer_timeout: Option<Duration>,

    #[arg(long = "on-accept-error", env = "SLOTGATE_ON_ACCEPT_ERROR", default_value = "exit")]
    on_accept_error: AcceptErrorPolicy,
}

// -----------------------------------------------------------------------------
// ----- Private Utils ---------------------------------------------------------

fn handle() -> Arc<RwLock<CliConfig>> {
    CLI_CONFIG
        .get()
        .expect("cli config not initialized; call CliConfig::init() first")
        .clone()
}

fn parse_capacity(raw: &str) -> Result<usize, String> {
    let n: usize = raw
        .parse()
        .map_err(|e| format!("invalid concurrency {raw:?}: {e}"))?;

    if n == 0 {
        return Err("concurrency must be at least 1".to_string());
    }

    Ok(n)
}

fn parse_duration(raw: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(raw)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
