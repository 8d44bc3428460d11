use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::errors::RelayError;
use crate::session::PumpSummary;

// -----------------------------------------------------------------------------
// ----- Outcome ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    DialError(String),
    Other(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<&RelayError> for Outcome {
    fn from(err: &RelayError) -> Self {
        if err.is_dial() {
            Outcome::DialError(err.to_string())
        } else {
            Outcome::Other(err.to_string())
        }
    }
}

// -----------------------------------------------------------------------------
// ----- SessionTimings --------------------------------------------------------

/// Milestones of one session. Unset entries were never reached.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub start: Instant,
    pub admitted: Option<Instant>,
    pub connected: Option<Instant>,
    pub finished: Option<Instant>,
}

impl SessionTimings {
    pub fn start_now() -> Self {
        Self {
            start: Instant::now(),
            admitted: None,
            connected: None,
            finished: None,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- SessionReport ---------------------------------------------------------

/// The one record every session emits when it is torn down.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub seq: u64,
    pub client: String,
    pub outcome: Outcome,
    pub took: Duration,
    pub wait: Duration,
    pub dial: Duration,
    pub copy: Duration,
    pub sent: u64,
    pub received: u64,
}

impl SessionReport {
    pub fn new(
        seq: u64,
        client: String,
        timings: &SessionTimings,
        result: &Result<PumpSummary, RelayError>,
    ) -> Self {
        let (outcome, sent, received) = match result {
            Ok(summary) => (Outcome::Success, summary.sent, summary.received),
            Err(err) => (Outcome::from(err), 0, 0),
        };

        Self {
            seq,
            client,
            outcome,
            took: timings.start.elapsed(),
            wait: between(Some(timings.start), timings.admitted),
            dial: between(timings.admitted, timings.connected),
            copy: between(timings.connected, timings.finished),
            sent,
            received,
        }
    }

    pub fn emit(&self) {
        if self.outcome.is_success() {
            info!("{}", self);
        } else {
            warn!("{}", self);
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq={} client={} ", self.seq, self.client)?;

        match &self.outcome {
            Outcome::Success => write!(
                f,
                "status=success took={:.6} wait={:.6} dial={:.6} copy={:.6} sent={} received={}",
                self.took.as_secs_f64(),
                self.wait.as_secs_f64(),
                self.dial.as_secs_f64(),
                self.copy.as_secs_f64(),
                self.sent,
                self.received,
            ),
            Outcome::DialError(message) | Outcome::Other(message) => write!(
                f,
                "status=error took={:.6} message={message:?}",
                self.took.as_secs_f64(),
            ),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn between(from: Option<Instant>, to: Option<Instant>) -> Duration {
    match (from, to) {
        (Some(from), Some(to)) => to.saturating_duration_since(from),
        _ => Duration::ZERO,
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
