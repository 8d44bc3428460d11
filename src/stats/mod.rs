pub mod record;
pub mod responder;

pub use record::{Outcome, SessionReport, SessionTimings};
pub use responder::StatsResponder;

use crate::gate::GateSnapshot;

pub fn format_stats_line(snapshot: GateSnapshot) -> String {
    format!(
        "active: {}, waiting: {}\n",
        snapshot.active, snapshot.waiting
    )
}
