use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::trace;

use crate::errors::RelayError;

// -----------------------------------------------------------------------------
// ----- GateSnapshot ----------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateSnapshot {
    pub active: usize,
    pub waiting: usize,
}

// -----------------------------------------------------------------------------
// ----- AdmissionGate ---------------------------------------------------------

/// Bounds how many sessions may hold a backend connection at once.
///
/// The semaphore does the parking; `counters` is the only place `active` and
/// `waiting` are mutated and is never held across an await. Admission order is
/// not part of the contract: when a slot frees, one blocked caller gets it.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    counters: Mutex<GateSnapshot>,
    slots: Arc<Semaphore>,
}

// -----------------------------------------------------------------------------
// ----- AdmissionGate: Static -------------------------------------------------

impl AdmissionGate {
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);

        Arc::new(Self {
            capacity,
            counters: Mutex::new(GateSnapshot::default()),
            slots: Arc::new(Semaphore::new(capacity)),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- AdmissionGate: Public -------------------------------------------------

impl AdmissionGate {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits until a slot is free and takes it. Only callers that actually
    /// block are counted in `waiting`. Dropping the future while it waits
    /// leaves the counters as they were.
    pub async fn acquire(self: &Arc<Self>) -> Result<Slot, RelayError> {
        match self.slots.clone().try_acquire_owned() {
            Ok(permit) => return Ok(self.admit(permit, false)),
            Err(TryAcquireError::Closed) => return Err(RelayError::GateClosed),
            Err(TryAcquireError::NoPermits) => {}
        }

        let mut waiter = Waiter::enter(self);

        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RelayError::GateClosed)?;

        waiter.admitted = true;
        Ok(self.admit(permit, true))
    }

    /// Gives the slot back and wakes one blocked `acquire`, if any.
    pub fn release(&self, slot: Slot) {
        debug_assert!(std::ptr::eq(self, Arc::as_ptr(&slot.gate)));
        drop(slot);
    }

    pub fn snapshot(&self) -> GateSnapshot {
        *self.counters.lock()
    }

    /// Fails every blocked and future `acquire`. Held slots stay valid.
    pub fn close(&self) {
        self.slots.close();
    }
}

// -----------------------------------------------------------------------------
// ----- AdmissionGate: Private ------------------------------------------------

impl AdmissionGate {
    fn admit(self: &Arc<Self>, permit: OwnedSemaphorePermit, was_waiting: bool) -> Slot {
        let mut counters = self.counters.lock();
        if was_waiting {
            counters.waiting -= 1;
        }
        counters.active += 1;
        debug_assert!(counters.active <= self.capacity);

        trace!(
            active = counters.active,
            waiting = counters.waiting,
            "slot acquired"
        );

        Slot {
            gate: self.clone(),
            permit: Some(permit),
        }
    }

    // Decrement first, then hand the permit back; the semaphore wakes one waiter.
    fn give_back(&self, permit: OwnedSemaphorePermit) {
        {
            let mut counters = self.counters.lock();
            counters.active -= 1;

            trace!(
                active = counters.active,
                waiting = counters.waiting,
                "slot released"
            );
        }

        drop(permit);
    }
}

// -----------------------------------------------------------------------------
// ----- Slot ------------------------------------------------------------------

/// One unit of gate capacity. Released exactly once: explicitly through
/// `AdmissionGate::release`, or when dropped.
#[derive(Debug)]
pub struct Slot {
    gate: Arc<AdmissionGate>,
    permit: Option<OwnedSemaphorePermit>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };

        self.gate.give_back(permit);
    }
}

// -----------------------------------------------------------------------------
// ----- Waiter ----------------------------------------------------------------

struct Waiter<'a> {
    gate: &'a AdmissionGate,
    admitted: bool,
}

impl<'a> Waiter<'a> {
    fn enter(gate: &'a AdmissionGate) -> Self {
        gate.counters.lock().waiting += 1;

        Self {
            gate,
            admitted: false,
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if !self.admitted {
            self.gate.counters.lock().waiting -= 1;
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
