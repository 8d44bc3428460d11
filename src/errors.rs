use std::{io, net::SocketAddr, time::Duration};

use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- RelayError ------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to resolve {addr}: {source}")]
    Resolve { addr: String, source: io::Error },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("{listener} listener accept error: {source}")]
    Accept {
        listener: &'static str,
        source: io::Error,
    },

    #[error("dial {addr} failed: {source}")]
    Dial { addr: String, source: io::Error },

    #[error("dial {addr} timed out after {}", human(.after))]
    DialTimeout { addr: String, after: Duration },

    #[error("timed out waiting for a slot after {}", human(.after))]
    QueueTimeout { after: Duration },

    #[error("admission gate closed")]
    GateClosed,
}

impl RelayError {
    /// Dial failures are reported as `DialError` outcomes, everything else as `Other`.
    pub fn is_dial(&self) -> bool {
        matches!(self, RelayError::Dial { .. } | RelayError::DialTimeout { .. })
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn human(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
