//! Bidirectional byte pump.
//!
//! Both directions run concurrently and the pump ends as soon as either one
//! stops (EOF, reset or any I/O error). The unfinished direction is cancelled
//! rather than drained, so a slow or silent peer cannot keep a slot busy once
//! the other side is gone. Its socket halves are closed when the session drops
//! the streams.

use std::{io, time::Duration};

use bytes::BytesMut;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    select,
    time::sleep,
};
use tracing::debug;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const COPY_CAPACITY_HINT: usize = 16 * 1024;

// -----------------------------------------------------------------------------
// ----- Finish ----------------------------------------------------------------

/// Which event ended the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    ClientToBackend,
    BackendToClient,
    Deadline,
}

// -----------------------------------------------------------------------------
// ----- PumpSummary -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSummary {
    pub finish: Finish,
    /// Bytes relayed client -> backend.
    pub sent: u64,
    /// Bytes relayed backend -> client.
    pub received: u64,
}

// -----------------------------------------------------------------------------
// ----- Pump ------------------------------------------------------------------

pub async fn pump(
    client: &mut TcpStream,
    backend: &mut TcpStream,
    limit: Option<Duration>,
) -> PumpSummary {
    let (mut client_rd, mut client_wr) = client.split();
    let (mut backend_rd, mut backend_wr) = backend.split();

    let mut sent = 0u64;
    let mut received = 0u64;

    let finish = select! {
        res = copy_half(&mut client_rd, &mut backend_wr, &mut sent) => {
            log_end(Finish::ClientToBackend, res);
            Finish::ClientToBackend
        }

        res = copy_half(&mut backend_rd, &mut client_wr, &mut received) => {
            log_end(Finish::BackendToClient, res);
            Finish::BackendToClient
        }

        _ = deadline(limit) => {
            debug!("transfer deadline reached");
            Finish::Deadline
        }
    };

    PumpSummary {
        finish,
        sent,
        received,
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

/// Copies until EOF or error. On EOF the write side is shut down so the peer sees FIN.
async fn copy_half<R, W>(reader: &mut R, writer: &mut W, copied: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(COPY_CAPACITY_HINT);

    loop {
        buf.reserve(COPY_CAPACITY_HINT);

        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            return writer.shutdown().await;
        }

        writer.write_all_buf(&mut buf).await?;
        *copied += n as u64;
    }
}

async fn deadline(limit: Option<Duration>) {
    match limit {
        Some(after) => sleep(after).await,
        None => std::future::pending().await,
    }
}

fn log_end(direction: Finish, res: io::Result<()>) {
    match res {
        Ok(()) => debug!("{direction:?} reached eof"),
        Err(e) => debug!("{direction:?} stopped: {e}"),
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
