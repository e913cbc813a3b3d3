//! Blocking wait primitives used by the evaluator.
//!
//! These are internal collaborators of the effect runtime: a one-shot
//! settlement cell for asynchronous effects, a countdown group for joining
//! parallel branches, and a first-writer-wins error slot.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================
// SettleCell
// ============================================================

struct SettleSlot<E, A> {
    settled: bool,
    value: Option<Result<A, E>>,
}

/// A one-shot settlement cell.
///
/// The first call to [`settle`](SettleCell::settle) stores the outcome and
/// wakes any waiter; later calls are ignored. [`wait`](SettleCell::wait)
/// blocks until the cell is settled and takes the stored outcome.
pub(crate) struct SettleCell<E, A> {
    state: Mutex<SettleSlot<E, A>>,
    ready: Condvar,
}

impl<E, A> SettleCell<E, A> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SettleSlot {
                settled: false,
                value: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Stores the outcome if the cell is still empty. Returns `true` if this
    /// call won the settlement.
    pub(crate) fn settle(&self, outcome: Result<A, E>) -> bool {
        let mut slot = self.state.lock();
        if slot.settled {
            return false;
        }
        slot.settled = true;
        slot.value = Some(outcome);
        self.ready.notify_all();
        true
    }

    /// Blocks until the cell is settled, then takes the outcome.
    ///
    /// # Panics
    ///
    /// Panics if called twice; the outcome is consumed by the first waiter.
    pub(crate) fn wait(&self) -> Result<A, E> {
        let mut slot = self.state.lock();
        while !slot.settled {
            self.ready.wait(&mut slot);
        }
        slot.value
            .take()
            .expect("settlement cell waited on more than once")
    }
}

// ============================================================
// WaitGroup
// ============================================================

struct WaitGroupCore {
    pending: Mutex<usize>,
    idle: Condvar,
}

/// A countdown group for joining a known number of concurrent jobs.
///
/// Mirrors the enter/leave/wait shape of a dispatch group: each branch
/// [`enter`](WaitGroup::enter)s before being scheduled and
/// [`leave`](WaitGroup::leave)s when done; [`wait`](WaitGroup::wait) blocks
/// until the count returns to zero.
pub(crate) struct WaitGroup {
    core: std::sync::Arc<WaitGroupCore>,
}

impl Clone for WaitGroup {
    fn clone(&self) -> Self {
        Self {
            core: std::sync::Arc::clone(&self.core),
        }
    }
}

impl WaitGroup {
    pub(crate) fn new() -> Self {
        Self {
            core: std::sync::Arc::new(WaitGroupCore {
                pending: Mutex::new(0),
                idle: Condvar::new(),
            }),
        }
    }

    pub(crate) fn enter(&self) {
        *self.core.pending.lock() += 1;
    }

    /// # Panics
    ///
    /// Panics on a `leave` without a matching `enter`.
    pub(crate) fn leave(&self) {
        let mut pending = self.core.pending.lock();
        *pending = pending
            .checked_sub(1)
            .expect("wait group left more times than entered");
        if *pending == 0 {
            self.core.idle.notify_all();
        }
    }

    pub(crate) fn wait(&self) {
        let mut pending = self.core.pending.lock();
        while *pending > 0 {
            self.core.idle.wait(&mut pending);
        }
    }
}

// ============================================================
// ErrorSlot
// ============================================================

/// A first-writer-wins error slot for parallel joins.
///
/// The claim is an atomic compare-and-set, so concurrent branches race
/// without locking; only the winner stores its error.
pub(crate) struct ErrorSlot<E> {
    claimed: AtomicBool,
    cell: Mutex<Option<E>>,
}

impl<E> ErrorSlot<E> {
    pub(crate) fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
            cell: Mutex::new(None),
        }
    }

    /// Attempts to record an error. Returns `true` if this caller won the
    /// claim; losers' errors are discarded.
    pub(crate) fn record(&self, error: E) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            *self.cell.lock() = Some(error);
            true
        } else {
            false
        }
    }

    /// Returns `true` if any branch has claimed the slot.
    pub(crate) fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Takes the recorded error, if any.
    pub(crate) fn take(&self) -> Option<E> {
        self.cell.lock().take()
    }
}
