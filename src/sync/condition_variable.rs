//! An asynchronous condition variable derived from the semaphore

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};

use crate::exec::ExecutorHandle;
use crate::sync::semaphore::{AcquireHandle, Semaphore, SemaphoreShared};
use crate::sync::{Aborted, AcquireResult};

/// An asynchronous condition variable.
///
/// Notification maps directly onto permit transfer in an internal
/// [`Semaphore`] created with zero permits:
/// [`notify_one`](ConditionVariable::notify_one) releases one permit,
/// [`notify_all`](ConditionVariable::notify_all) releases every queued
/// waiter, and waiting is an acquire. Waiters wake in strict FIFO
/// order, and a notification with no waiter queued is remembered by the
/// permit counter and satisfies the next wait immediately.
pub struct ConditionVariable {
    semaphore: Semaphore,
}

impl ConditionVariable {
    /// Creates a condition variable scheduling completions on `executor`.
    pub fn new(executor: ExecutorHandle) -> ConditionVariable {
        ConditionVariable {
            semaphore: Semaphore::new(executor, 0),
        }
    }

    /// Wakes the least recent waiter, if any.
    pub fn notify_one(&self) {
        self.semaphore.release()
    }

    /// Wakes every queued waiter, in arrival order.
    ///
    /// Returns the number of waiters notified.
    pub fn notify_all(&self) -> usize {
        self.semaphore.release_all()
    }

    /// Initiates an asynchronous wait for a notification.
    ///
    /// `completion` is posted with `Ok(())` once a notification arrives,
    /// or with `Err(Aborted)` if the wait is cancelled through the
    /// returned handle or the condition variable is dropped first.
    pub fn async_wait<F>(&self, completion: F) -> AcquireHandle
    where
        F: FnOnce(AcquireResult) + 'static,
    {
        self.semaphore.async_acquire(completion)
    }

    /// Initiates an asynchronous wait until `predicate` returns true.
    ///
    /// The predicate is evaluated immediately; if it already holds, the
    /// completion is posted right away, without consuming a
    /// notification. Otherwise the caller waits for a notification and
    /// re-evaluates on each wake, on the wake's own executor turn, until
    /// the predicate holds. If the condition variable is dropped while
    /// waiting, `completion` receives `Err(Aborted)`.
    pub fn async_wait_until<P, F>(&self, mut predicate: P, completion: F)
    where
        P: FnMut() -> bool + 'static,
        F: FnOnce(AcquireResult) + 'static,
    {
        if predicate() {
            // First evaluation: completing inline here would run user
            // code on the caller's stack.
            self.semaphore
                .executor()
                .post(Box::new(move || completion(Ok(()))));
            return;
        }
        wait_step(
            Rc::downgrade(self.semaphore.shared()),
            predicate,
            Box::new(completion),
        );
    }

    /// Returns the executor completions are scheduled on.
    pub fn executor(&self) -> &ExecutorHandle {
        self.semaphore.executor()
    }

    /// Returns the number of queued waiters.
    pub fn waiters(&self) -> usize {
        self.semaphore.waiters()
    }
}

impl core::fmt::Debug for ConditionVariable {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("ConditionVariable")
            .field("waiters", &self.waiters())
            .finish()
    }
}

/// One wait-then-recheck round of a predicate-guarded wait.
///
/// Runs either from `async_wait_until` itself (first round) or from a
/// wake's posted completion (every later round), so the re-evaluation
/// after a wake needs no extra executor hop.
fn wait_step<P>(
    shared: Weak<SemaphoreShared>,
    mut predicate: P,
    completion: Box<dyn FnOnce(AcquireResult)>,
) where
    P: FnMut() -> bool + 'static,
{
    let semaphore = match shared.upgrade() {
        Some(semaphore) => semaphore,
        // Host dropped between wake and re-arm.
        None => return completion(Err(Aborted)),
    };
    let rearm = shared;
    semaphore.async_acquire(Box::new(move |res| match res {
        Err(err) => completion(Err(err)),
        Ok(()) => {
            if predicate() {
                completion(Ok(()))
            } else {
                wait_step(rearm, predicate, completion)
            }
        }
    }));
}
