//! A commit-once latch arbitrating between racing completions

use lock_api::{Mutex, MutexGuard, RawMutex};

use crate::NoopLock;

/// A commit-once transfer latch.
///
/// A latch guards a disputed outcome that several racing asynchronous
/// paths want to claim - "the read completed" versus "the timeout
/// fired". Each path calls [`begin_transaction`] (or
/// [`begin_transaction2`] when two latches are involved); whichever
/// finds the latch still open receives a live [`Transaction`] and may
/// act, while every later path receives a dead transaction and must
/// stand down without touching the resource.
///
/// The committed flag transitions from open to committed at most once
/// and is only reachable through transactions, which hold the latch's
/// lock for their whole lifetime.
///
/// The latch is generic over the [`RawMutex`] backing it. This is the
/// one primitive in the crate that may be contended from genuinely
/// concurrent threads, when instantiated with a real lock.
pub struct GenericTransferLatch<MutexType: RawMutex> {
    inner: Mutex<MutexType, bool>,
}

impl<MutexType: RawMutex> GenericTransferLatch<MutexType> {
    /// Creates an uncommitted latch.
    pub fn new() -> GenericTransferLatch<MutexType> {
        GenericTransferLatch {
            inner: Mutex::new(false),
        }
    }

    /// Returns whether the latch has been committed.
    ///
    /// Diagnostic only: by the time the caller observes the answer it
    /// may already be stale. Claiming the latch goes through
    /// [`begin_transaction`]. Takes the latch's lock, so this must not
    /// be called while a live transaction holds the same latch.
    pub fn is_committed(&self) -> bool {
        *self.inner.lock()
    }
}

impl<MutexType: RawMutex> Default for GenericTransferLatch<MutexType> {
    fn default() -> Self {
        GenericTransferLatch::new()
    }
}

impl<MutexType: RawMutex> core::fmt::Debug for GenericTransferLatch<MutexType> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("TransferLatch").finish()
    }
}

/// A scoped commit decision on one [`GenericTransferLatch`].
///
/// A live transaction holds the latch's lock; it must be decided with
/// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback)
/// before it goes away, and rolls back if simply dropped. A dead
/// transaction holds nothing and signals that the race was already won
/// elsewhere.
pub struct Transaction<'a, MutexType: RawMutex> {
    guard: Option<MutexGuard<'a, MutexType, bool>>,
}

impl<'a, MutexType: RawMutex> Transaction<'a, MutexType> {
    /// Returns whether this transaction may commit the latch.
    pub fn may_commit(&self) -> bool {
        self.guard.is_some()
    }

    /// Marks the latch committed and releases its lock.
    ///
    /// # Panics
    ///
    /// Panics if the transaction is dead.
    pub fn commit(mut self) {
        let mut guard = self
            .guard
            .take()
            .expect("commit called on a dead transaction");
        *guard = true;
    }

    /// Releases the lock without committing, leaving the latch open for
    /// future transactions. Dropping the transaction does the same.
    pub fn rollback(mut self) {
        self.guard = None;
    }
}

impl<'a, MutexType: RawMutex> core::fmt::Debug for Transaction<'a, MutexType> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Transaction")
            .field("may_commit", &self.may_commit())
            .finish()
    }
}

/// A scoped commit decision across two [`GenericTransferLatch`]es.
///
/// Live only if both latches were still open; commits or rolls back
/// both together. Both locks are held for the transaction's lifetime,
/// so no third party can observe one latch committed and the other
/// open.
pub struct Transaction2<'a, MutexType: RawMutex> {
    guards: Option<(
        MutexGuard<'a, MutexType, bool>,
        MutexGuard<'a, MutexType, bool>,
    )>,
}

impl<'a, MutexType: RawMutex> Transaction2<'a, MutexType> {
    /// Returns whether this transaction may commit both latches.
    pub fn may_commit(&self) -> bool {
        self.guards.is_some()
    }

    /// Marks both latches committed and releases their locks.
    ///
    /// # Panics
    ///
    /// Panics if the transaction is dead.
    pub fn commit(mut self) {
        let (mut first, mut second) = self
            .guards
            .take()
            .expect("commit called on a dead transaction");
        *first = true;
        *second = true;
    }

    /// Releases both locks without committing either latch. Dropping
    /// the transaction does the same.
    pub fn rollback(mut self) {
        self.guards = None;
    }
}

impl<'a, MutexType: RawMutex> core::fmt::Debug for Transaction2<'a, MutexType> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Transaction2")
            .field("may_commit", &self.may_commit())
            .finish()
    }
}

/// Attempts to begin a transaction on `latch`.
///
/// Takes the latch's lock; if the latch is still open the returned
/// transaction is live and keeps the lock until it is decided.
/// Otherwise the lock is released immediately and the returned
/// transaction is dead.
pub fn begin_transaction<MutexType: RawMutex>(
    latch: &GenericTransferLatch<MutexType>,
) -> Transaction<'_, MutexType> {
    let guard = latch.inner.lock();
    if !*guard {
        Transaction { guard: Some(guard) }
    } else {
        Transaction { guard: None }
    }
}

/// Attempts to begin a transaction spanning two latches.
///
/// The transaction is live only if both latches are still open. The
/// locks are taken in a fixed global order (by latch address), so two
/// callers passing the same pair in opposite argument orders cannot
/// deadlock.
///
/// # Panics
///
/// Panics if `first` and `second` are the same latch.
pub fn begin_transaction2<'a, MutexType: RawMutex>(
    first: &'a GenericTransferLatch<MutexType>,
    second: &'a GenericTransferLatch<MutexType>,
) -> Transaction2<'a, MutexType> {
    let first_addr = first as *const _ as usize;
    let second_addr = second as *const _ as usize;
    assert!(
        first_addr != second_addr,
        "begin_transaction2 called with the same latch twice"
    );
    let (low, high) = if first_addr < second_addr {
        (first, second)
    } else {
        (second, first)
    };

    let low_guard = low.inner.lock();
    let high_guard = high.inner.lock();
    if !*low_guard && !*high_guard {
        Transaction2 {
            guards: Some((low_guard, high_guard)),
        }
    } else {
        Transaction2 { guards: None }
    }
}

// Export a non thread-safe version using NoopLock

/// A [`GenericTransferLatch`] for single-threaded use, backed by
/// [`NoopLock`].
pub type LocalTransferLatch = GenericTransferLatch<NoopLock>;

#[cfg(feature = "std")]
mod if_std {
    use super::*;

    // Export a thread-safe version using parking_lot::RawMutex

    /// A [`GenericTransferLatch`] which is thread-safe, backed by
    /// [`parking_lot`].
    pub type TransferLatch = GenericTransferLatch<parking_lot::RawMutex>;
}

#[cfg(feature = "std")]
pub use self::if_std::*;
