pub mod config;
pub mod errors;
pub mod gate;
pub mod server;
pub mod session;
pub mod stats;


pub use config::Config;
pub use errors::RelayError;
pub use gate::{AdmissionGate, GateSnapshot, Slot};
pub use server::RelayServer;
pub use session::{Session, SessionSettings};
pub use stats::{SessionReport, StatsResponder};
