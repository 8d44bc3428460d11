pub mod pump;
#[allow(clippy::module_inception)]
pub mod session;

pub use pump::{Finish, PumpSummary};
pub use session::{Session, SessionSettings, SessionState};
