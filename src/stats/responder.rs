use std::{io, net::SocketAddr, sync::Arc};

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info};

use crate::config::AcceptErrorPolicy;
use crate::errors::RelayError;
use crate::gate::AdmissionGate;
use crate::server::{bind_listener, handle_accept_error};

use super::format_stats_line;

// -----------------------------------------------------------------------------
// ----- StatsResponder --------------------------------------------------------

/// Answers every connection with one `active: N, waiting: M` line, then hangs up.
/// Nothing is read from the peer.
#[derive(Debug)]
pub struct StatsResponder {
    listener: TcpListener,
    gate: Arc<AdmissionGate>,
    on_accept_error: AcceptErrorPolicy,
}

// -----------------------------------------------------------------------------
// ----- StatsResponder: Static ------------------------------------------------

impl StatsResponder {
    pub fn bind(
        addr: SocketAddr,
        gate: Arc<AdmissionGate>,
        on_accept_error: AcceptErrorPolicy,
    ) -> Result<Self, RelayError> {
        let listener = bind_listener(addr)?;

        Ok(Self {
            listener,
            gate,
            on_accept_error,
        })
    }
}

// -----------------------------------------------------------------------------
// ----- StatsResponder: Public ------------------------------------------------

impl StatsResponder {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Only returns when an accept error is fatal under the configured policy.
    pub async fn run(self) -> Result<(), RelayError> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("stats listening on {addr}");
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let gate = self.gate.clone();
                    tokio::spawn(async move {
                        if let Err(e) = respond(stream, &gate).await {
                            debug!("stats client {peer} error: {e}");
                        }
                    });
                }

                Err(e) => handle_accept_error("stats", e, self.on_accept_error).await?,
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

async fn respond(mut stream: TcpStream, gate: &AdmissionGate) -> io::Result<()> {
    let line = format_stats_line(gate.snapshot());
    stream.write_all(line.as_bytes()).await?;
    stream.shutdown().await
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
