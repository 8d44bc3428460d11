pub mod admission;

pub use admission::{AdmissionGate, GateSnapshot, Slot};
