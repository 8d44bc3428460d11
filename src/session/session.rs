use std::{
    fmt,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{net::TcpStream, time::timeout};
use tracing::trace;

use crate::config::Deadlines;
use crate::errors::RelayError;
use crate::gate::{AdmissionGate, Slot};
use crate::stats::{Outcome, SessionReport, SessionTimings};

use super::pump::{PumpSummary, pump};

// -----------------------------------------------------------------------------
// ----- SessionSettings -------------------------------------------------------

/// What every session of one relay shares.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub proxy_addr: String,
    pub deadlines: Deadlines,
}

// -----------------------------------------------------------------------------
// ----- SessionState ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Waiting,
    Admitted,
    Dialing,
    Dialed,
    Relaying,
    Done(Outcome),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Done(Outcome::Success) => f.write_str("done(success)"),
            SessionState::Done(_) => f.write_str("done(failed)"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Session ---------------------------------------------------------------

/// One accepted client connection, from gate admission to teardown.
#[derive(Debug)]
pub struct Session {
    seq: u64,
    peer: String,
    client: TcpStream,
    gate: Arc<AdmissionGate>,
    settings: Arc<SessionSettings>,
    state: SessionState,
    timings: SessionTimings,
}

// -----------------------------------------------------------------------------
// ----- Session: Static -------------------------------------------------------

impl Session {
    pub fn new(
        seq: u64,
        client: TcpStream,
        peer: SocketAddr,
        gate: Arc<AdmissionGate>,
        settings: Arc<SessionSettings>,
    ) -> Self {
        Self {
            seq,
            peer: peer.to_string(),
            client,
            gate,
            settings,
            state: SessionState::Created,
            timings: SessionTimings::start_now(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Session: Public -------------------------------------------------------

impl Session {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs the whole lifecycle and emits exactly one outcome record.
    ///
    /// Whatever happens, the slot (if taken) is released once and both sockets
    /// are closed before the record is logged.
    pub async fn run(mut self) -> SessionReport {
        let result = self.relay().await;

        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) => Outcome::from(e),
        };
        self.transition(SessionState::Done(outcome));

        let Session {
            seq,
            peer,
            client,
            timings,
            ..
        } = self;
        drop(client);

        let report = SessionReport::new(seq, peer, &timings, &result);
        report.emit();
        report
    }
}

// -----------------------------------------------------------------------------
// ----- Session: Private ------------------------------------------------------

impl Session {
    async fn relay(&mut self) -> Result<PumpSummary, RelayError> {
        let slot = self.wait_for_slot().await?;
        let result = self.dial_and_pump().await;
        self.gate.release(slot);
        result
    }

    async fn wait_for_slot(&mut self) -> Result<Slot, RelayError> {
        let seen = self.gate.snapshot();
        if seen.active >= self.gate.capacity() {
            self.transition(SessionState::Waiting);
        }

        let slot = match self.settings.deadlines.queue {
            Some(after) => timeout(after, self.gate.acquire())
                .await
                .map_err(|_| RelayError::QueueTimeout { after })??,
            None => self.gate.acquire().await?,
        };

        self.timings.admitted = Some(Instant::now());
        self.transition(SessionState::Admitted);
        Ok(slot)
    }

    // The backend stream lives only in here, so it is closed before the slot goes back.
    async fn dial_and_pump(&mut self) -> Result<PumpSummary, RelayError> {
        self.transition(SessionState::Dialing);

        let mut backend = dial(&self.settings.proxy_addr, self.settings.deadlines.dial).await?;
        self.timings.connected = Some(Instant::now());
        self.transition(SessionState::Dialed);

        self.transition(SessionState::Relaying);
        let summary = pump(&mut self.client, &mut backend, self.settings.deadlines.transfer).await;
        self.timings.finished = Some(Instant::now());

        drop(backend);
        Ok(summary)
    }

    fn transition(&mut self, next: SessionState) {
        trace!(seq = self.seq, client = %self.peer, "{} -> {}", self.state, next);
        self.state = next;
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

async fn dial(addr: &str, limit: Option<Duration>) -> Result<TcpStream, RelayError> {
    let connect = TcpStream::connect(addr);

    let res = match limit {
        Some(after) => timeout(after, connect)
            .await
            .map_err(|_| RelayError::DialTimeout {
                addr: addr.to_string(),
                after,
            })?,
        None => connect.await,
    };

    let stream = res.map_err(|source| RelayError::Dial {
        addr: addr.to_string(),
        source,
    })?;
    let _ = stream.set_nodelay(true);

    Ok(stream)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
