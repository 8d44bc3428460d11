use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use slotgate::{
    AdmissionGate, Config, RelayError, RelayServer, SessionSettings, StatsResponder,
    server::resolve_listen_addr,
};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "slotgate";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() {
    setup();

    if let Err(e) = run_forever().await {
        error!("{APP_NAME} stopping: {e}");
        std::process::exit(1);
    }
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

fn setup() {
    // This has to be the first thing we do, because it initializes the config
    Config::init();

    init_tracing();
}

fn init_tracing() {
    let config = Config::snapshot();
    let filter = EnvFilter::new(config.log_level.as_str());
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run_forever() -> Result<(), RelayError> {
    let config = Config::snapshot();
    let gate = AdmissionGate::new(config.concurrency);

    let listen_addr = resolve_listen_addr(&config.listen_addr).await?;
    let stats_addr = resolve_listen_addr(&config.stats_addr).await?;

    // Both listeners are bound before either accept loop starts.
    let relay = RelayServer::bind(
        listen_addr,
        gate.clone(),
        SessionSettings {
            proxy_addr: config.proxy_addr.clone(),
            deadlines: config.deadlines,
        },
        config.on_accept_error,
    )?;
    let stats = StatsResponder::bind(stats_addr, gate.clone(), config.on_accept_error)?;

    let mut stats_task = tokio::spawn(stats.run());
    let mut relay_task = tokio::spawn(relay.run());

    let res = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("{APP_NAME} shutting down");
            Ok(())
        }

        joined = &mut stats_task => flatten(joined),
        joined = &mut relay_task => flatten(joined),
    };

    gate.close();
    stats_task.abort();
    relay_task.abort();

    res
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn flatten(joined: Result<Result<(), RelayError>, tokio::task::JoinError>) -> Result<(), RelayError> {
    match joined {
        Ok(res) => res,
        Err(e) => {
            error!("accept loop panicked: {e}");
            std::process::exit(1);
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
