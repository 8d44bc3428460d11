use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::net::TcpListener;
use tracing::info;

use crate::config::AcceptErrorPolicy;
use crate::errors::RelayError;
use crate::gate::AdmissionGate;
use crate::session::{Session, SessionSettings};

use super::{bind_listener, handle_accept_error};

// -----------------------------------------------------------------------------
// ----- RelayServer -----------------------------------------------------------

/// Accepts clients and runs one gated `Session` per connection.
///
/// Accepting is never gated: clients queue on the gate, not in the backlog.
#[derive(Debug)]
pub struct RelayServer {
    listener: TcpListener,
    gate: Arc<AdmissionGate>,
    settings: Arc<SessionSettings>,
    on_accept_error: AcceptErrorPolicy,
    next_seq: AtomicU64,
}

// -----------------------------------------------------------------------------
// ----- RelayServer: Static ---------------------------------------------------

impl RelayServer {
    pub fn bind(
        addr: SocketAddr,
        gate: Arc<AdmissionGate>,
        settings: SessionSettings,
        on_accept_error: AcceptErrorPolicy,
    ) -> Result<Self, RelayError> {
        let listener = bind_listener(addr)?;

        Ok(Self {
            listener,
            gate,
            settings: Arc::new(settings),
            on_accept_error,
            next_seq: AtomicU64::new(1),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- RelayServer: Public ---------------------------------------------------

impl RelayServer {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// Only returns when an accept error is fatal under the configured policy.
    pub async fn run(self) -> Result<(), RelayError> {
        if let Ok(addr) = self.listener.local_addr() {
            info!(
                "relay listening on {addr}, forwarding to {} with {} slot(s)",
                self.settings.proxy_addr,
                self.gate.capacity()
            );
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let _ = stream.set_nodelay(true);

                    let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                    let session =
                        Session::new(seq, stream, peer, self.gate.clone(), self.settings.clone());

                    tokio::spawn(async move {
                        session.run().await;
                    });
                }

                Err(e) => handle_accept_error("relay", e, self.on_accept_error).await?,
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
