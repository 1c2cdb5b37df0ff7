//! An asynchronous counting semaphore with FIFO fairness

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use crate::exec::ExecutorHandle;
use crate::sync::{Aborted, AcquireResult};
use crate::waiter_queue::{WaiterKey, WaiterQueue};

/// The single-shot completion capability of one acquire operation.
type Completion = Box<dyn FnOnce(AcquireResult)>;

struct SemaphoreState {
    /// Raw permit counter. Never negative; a queued waiter has not yet
    /// been debited.
    count: isize,
    /// Acquisitions that could not be satisfied synchronously, in
    /// arrival order.
    waiters: WaiterQueue<Completion>,
}

/// State shared between the semaphore, its cancellation handles and the
/// primitives derived from it.
pub(super) struct SemaphoreShared {
    executor: ExecutorHandle,
    state: RefCell<SemaphoreState>,
}

impl SemaphoreShared {
    pub(super) fn try_acquire(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.count > 0 {
            state.count -= 1;
            true
        } else {
            false
        }
    }

    pub(super) fn async_acquire(
        self: &Rc<SemaphoreShared>,
        completion: Completion,
    ) -> AcquireHandle {
        let mut state = self.state.borrow_mut();
        if state.count > 0 {
            state.count -= 1;
            drop(state);
            // Granted synchronously, but the completion still runs on a
            // later executor turn. Completing inline would let tight
            // acquire/release loops grow the stack without bound.
            self.executor.post(Box::new(move || completion(Ok(()))));
            AcquireHandle::granted()
        } else {
            let key = state.waiters.push_back(completion);
            AcquireHandle {
                shared: Rc::downgrade(self),
                key: Some(key),
            }
        }
    }

    pub(super) fn release(&self) {
        let mut state = self.state.borrow_mut();
        state.count += 1;
        if state.waiters.is_empty() {
            return;
        }

        // Hand the permit straight to the head waiter. It must not
        // become observable through try_acquire in between.
        state.count -= 1;
        let completion = state
            .waiters
            .pop_front()
            .expect("non-empty queue had no head waiter");
        drop(state);
        self.executor.post(Box::new(move || completion(Ok(()))));
    }

    pub(super) fn release_all(&self) -> usize {
        let mut released = 0;
        loop {
            // Unlink before completing, then advance to the new head.
            let completion = self.state.borrow_mut().waiters.pop_front();
            match completion {
                Some(completion) => {
                    self.executor.post(Box::new(move || completion(Ok(()))));
                    released += 1;
                }
                None => return released,
            }
        }
    }

    pub(super) fn count(&self) -> isize {
        self.state.borrow().count
    }

    pub(super) fn value(&self) -> isize {
        let state = self.state.borrow();
        state.count - state.waiters.len() as isize
    }

    pub(super) fn waiters(&self) -> usize {
        self.state.borrow().waiters.len()
    }

    pub(super) fn executor(&self) -> &ExecutorHandle {
        &self.executor
    }
}

/// An asynchronous counting semaphore.
///
/// The semaphore hands out permits in strict FIFO order: an
/// [`async_acquire`](Semaphore::async_acquire) that cannot be satisfied
/// immediately parks a waiter at the tail of a queue, and every
/// [`release`](Semaphore::release) transfers its permit to the head
/// waiter, if any. Completions are always scheduled through the
/// executor, never invoked on the caller's stack.
///
/// The semaphore assumes a single logical thread of control. To signal
/// it from another thread, marshal the call onto the owning executor
/// first.
///
/// ```
/// use strand_sync::exec::ManualExecutor;
/// use strand_sync::sync::Semaphore;
///
/// let exec = ManualExecutor::new();
/// let sem = Semaphore::new(exec.clone(), 1);
///
/// assert!(sem.try_acquire());
/// sem.async_acquire(|res| assert!(res.is_ok()));
/// sem.release();
///
/// // The queued acquire completes on the next executor turn.
/// assert_eq!(1, exec.run());
/// assert_eq!(0, sem.value());
/// ```
pub struct Semaphore {
    shared: Rc<SemaphoreShared>,
}

impl Semaphore {
    /// Creates a semaphore holding `initial_count` permits.
    ///
    /// Completions are scheduled on `executor`.
    ///
    /// # Panics
    ///
    /// Panics if `initial_count` is negative.
    pub fn new(executor: ExecutorHandle, initial_count: isize) -> Semaphore {
        assert!(
            initial_count >= 0,
            "semaphore initial count must not be negative"
        );
        Semaphore {
            shared: Rc::new(SemaphoreShared {
                executor,
                state: RefCell::new(SemaphoreState {
                    count: initial_count,
                    waiters: WaiterQueue::new(),
                }),
            }),
        }
    }

    /// Attempts to acquire a permit without suspending.
    ///
    /// Returns `true` and debits one permit if any is available, and
    /// `false` with no side effect otherwise. This never queues a waiter
    /// and is the only operation that is safe without an executor turn
    /// to complete on.
    pub fn try_acquire(&self) -> bool {
        self.shared.try_acquire()
    }

    /// Initiates an asynchronous acquire of one permit.
    ///
    /// If a permit is available it is debited immediately and
    /// `completion` is posted to the executor with `Ok(())`. Otherwise a
    /// waiter joins the tail of the queue; it completes with `Ok(())`
    /// once a release hands it a permit, or with `Err(Aborted)` if it is
    /// cancelled or the semaphore is dropped first. Waiters are granted
    /// permits in strict arrival order.
    ///
    /// The returned [`AcquireHandle`] can cancel this acquire while it
    /// is still queued.
    pub fn async_acquire<F>(&self, completion: F) -> AcquireHandle
    where
        F: FnOnce(AcquireResult) + 'static,
    {
        self.shared.async_acquire(Box::new(completion))
    }

    /// Returns one permit.
    ///
    /// If waiters are queued, the permit is transferred directly to the
    /// head waiter, whose completion is posted with `Ok(())`; the permit
    /// is never observable through [`try_acquire`](Semaphore::try_acquire)
    /// in between. Otherwise the counter is simply incremented.
    pub fn release(&self) {
        self.shared.release()
    }

    /// Completes every queued waiter with `Ok(())`, in arrival order.
    ///
    /// Each transfer conceptually pairs one release with one grant, so
    /// the counter is unchanged. Returns the number of waiters released.
    pub fn release_all(&self) -> usize {
        self.shared.release_all()
    }

    /// Returns the raw permit counter.
    pub fn count(&self) -> isize {
        self.shared.count()
    }

    /// Returns the counter minus the number of queued waiters.
    ///
    /// This is the signed value a caller would have to drive to zero
    /// through releases alone, and is negative while acquires outnumber
    /// available permits.
    pub fn value(&self) -> isize {
        self.shared.value()
    }

    /// Returns the number of queued waiters.
    pub fn waiters(&self) -> usize {
        self.shared.waiters()
    }

    /// Returns the executor completions are scheduled on.
    pub fn executor(&self) -> &ExecutorHandle {
        self.shared.executor()
    }

    /// Creates a guard that returns one permit on drop.
    ///
    /// The caller is responsible for actually holding a permit when the
    /// guard is created. If the semaphore is dropped before the guard,
    /// the guard does nothing.
    pub fn releaser(&self) -> SemaphoreReleaser {
        SemaphoreReleaser {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub(super) fn shared(&self) -> &Rc<SemaphoreShared> {
        &self.shared
    }
}

impl Drop for Semaphore {
    /// Completes every still-queued waiter with `Err(Aborted)`, in
    /// arrival order, before the state is torn down.
    ///
    /// This is the one case where completions run synchronously on the
    /// caller's stack: after the drop returns there would be no
    /// semaphore left to complete them from.
    fn drop(&mut self) {
        loop {
            // The queue borrow must end before the completion runs; a
            // completion may still reach the state through a handle.
            let completion = self.shared.state.borrow_mut().waiters.pop_front();
            match completion {
                Some(completion) => completion(Err(Aborted)),
                None => break,
            }
        }
    }
}

impl core::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Semaphore")
            .field("count", &self.count())
            .field("waiters", &self.waiters())
            .finish()
    }
}

/// The cancellation subscription of one pending `async_acquire`.
///
/// Dropping the handle does not cancel the acquire; only
/// [`cancel`](AcquireHandle::cancel) does. A handle whose waiter already
/// completed - by grant, by cancellation or by semaphore teardown - is
/// inert.
#[derive(Debug)]
pub struct AcquireHandle {
    shared: Weak<SemaphoreShared>,
    key: Option<WaiterKey>,
}

impl AcquireHandle {
    /// Handle for an acquire that was granted synchronously and has no
    /// queued waiter to cancel.
    fn granted() -> AcquireHandle {
        AcquireHandle {
            shared: Weak::new(),
            key: None,
        }
    }

    /// Requests cancellation of the pending acquire.
    ///
    /// If the waiter is still queued it is unlinked and its completion
    /// is posted with `Err(Aborted)`; the permit counter is untouched,
    /// since the waiter was never debited a permit. Returns whether this
    /// call cancelled the waiter. A release that already took the same
    /// waiter wins the race and makes this a no-op.
    pub fn cancel(&self) -> bool {
        let key = match self.key {
            Some(key) => key,
            None => return false,
        };
        let shared = match self.shared.upgrade() {
            Some(shared) => shared,
            None => return false,
        };
        let removed = shared.state.borrow_mut().waiters.remove(key);
        match removed {
            Some(completion) => {
                shared.executor.post(Box::new(move || completion(Err(Aborted))));
                true
            }
            None => false,
        }
    }

    /// Returns whether the waiter is still queued.
    pub fn is_pending(&self) -> bool {
        match (self.key, self.shared.upgrade()) {
            (Some(key), Some(shared)) => {
                shared.state.borrow().waiters.contains(key)
            }
            _ => false,
        }
    }
}

/// A scope guard which returns one permit to a [`Semaphore`] on drop.
#[derive(Debug)]
pub struct SemaphoreReleaser {
    shared: Weak<SemaphoreShared>,
}

impl SemaphoreReleaser {
    pub(super) fn from_shared(shared: Weak<SemaphoreShared>) -> SemaphoreReleaser {
        SemaphoreReleaser { shared }
    }

    /// Defuses the guard. The permit it held is not returned.
    pub fn disarm(mut self) {
        self.shared = Weak::new();
    }
}

impl Drop for SemaphoreReleaser {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.release();
        }
    }
}
