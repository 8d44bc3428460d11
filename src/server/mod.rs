pub mod listener;

pub use listener::RelayServer;

use std::{io, net::SocketAddr, time::Duration};

use tokio::net::{TcpListener, TcpSocket, lookup_host};
use tracing::error;

use crate::config::AcceptErrorPolicy;
use crate::errors::RelayError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const LISTEN_BACKLOG: u32 = 1024;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

// -----------------------------------------------------------------------------
// ----- Listener Helpers ------------------------------------------------------

/// Resolves a listen address once, preferring IPv4 results. A bare `:port`
/// listens on every IPv4 interface.
pub async fn resolve_listen_addr(raw: &str) -> Result<SocketAddr, RelayError> {
    let host_port = match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.to_string(),
    };

    let resolve_err = |source| RelayError::Resolve {
        addr: raw.to_string(),
        source,
    };

    let addrs: Vec<SocketAddr> = lookup_host(host_port.as_str())
        .await
        .map_err(resolve_err)?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| resolve_err(io::Error::new(io::ErrorKind::NotFound, "no addresses found")))
}

pub(crate) fn bind_listener(addr: SocketAddr) -> Result<TcpListener, RelayError> {
    let bind = || -> io::Result<TcpListener> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };

        socket.bind(addr)?;
        socket.listen(LISTEN_BACKLOG)
    };

    bind().map_err(|source| RelayError::Bind { addr, source })
}

/// Applies `policy` to a failed `accept()`. `Err` means the accept loop must stop.
pub(crate) async fn handle_accept_error(
    listener: &'static str,
    err: io::Error,
    policy: AcceptErrorPolicy,
) -> Result<(), RelayError> {
    match policy {
        AcceptErrorPolicy::Exit => Err(RelayError::Accept {
            listener,
            source: err,
        }),

        AcceptErrorPolicy::Continue => {
            error!("{listener} accept error: {err}");
            tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            Ok(())
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
