//! An asynchronous mutex derived from the semaphore

use alloc::rc::Rc;

use crate::exec::ExecutorHandle;
use crate::sync::semaphore::{
    AcquireHandle, Semaphore, SemaphoreReleaser,
};
use crate::sync::{Aborted, AcquireResult};

/// An asynchronous mutual-exclusion lock.
///
/// The mutex is a binary special case of the [`Semaphore`]: a semaphore
/// with one permit, where holding the permit means holding the lock.
/// Lock hand-off therefore inherits the semaphore's guarantees: strict
/// FIFO fairness between waiting lockers, completions scheduled through
/// the executor rather than invoked inline, and cancellation of a
/// pending lock through its [`AcquireHandle`].
///
/// Like the semaphore, the mutex guards data against interleaved
/// asynchronous critical sections on one logical thread; it is not a
/// cross-thread lock.
pub struct Mutex {
    semaphore: Semaphore,
}

impl Mutex {
    /// Creates an unlocked mutex scheduling completions on `executor`.
    pub fn new(executor: ExecutorHandle) -> Mutex {
        Mutex {
            semaphore: Semaphore::new(executor, 1),
        }
    }

    /// Attempts to take the lock without suspending.
    ///
    /// Returns `true` if the lock was taken. The caller is then
    /// responsible for a matching [`unlock`](Mutex::unlock).
    pub fn try_lock(&self) -> bool {
        self.semaphore.try_acquire()
    }

    /// Like [`try_lock`](Mutex::try_lock), but hands ownership of the
    /// lock to a [`MutexGuard`] which unlocks on drop.
    pub fn try_lock_guard(&self) -> Option<MutexGuard> {
        if self.semaphore.try_acquire() {
            Some(MutexGuard {
                releaser: self.semaphore.releaser(),
            })
        } else {
            None
        }
    }

    /// Initiates an asynchronous lock.
    ///
    /// If the mutex is unlocked it is locked immediately and
    /// `completion` is posted with `Ok(())`. Otherwise the caller joins
    /// the FIFO queue behind earlier lockers and completes once
    /// [`unlock`](Mutex::unlock) hands the lock over, or with
    /// `Err(Aborted)` if cancelled or if the mutex is dropped first.
    pub fn async_lock<F>(&self, completion: F) -> AcquireHandle
    where
        F: FnOnce(AcquireResult) + 'static,
    {
        self.semaphore.async_acquire(completion)
    }

    /// Initiates an asynchronous lock whose completion receives a
    /// [`MutexGuard`] owning the lock.
    pub fn async_lock_guard<F>(&self, completion: F) -> AcquireHandle
    where
        F: FnOnce(Result<MutexGuard, Aborted>) + 'static,
    {
        let shared = Rc::downgrade(self.semaphore.shared());
        self.semaphore.async_acquire(move |res| match res {
            Ok(()) => completion(Ok(MutexGuard {
                releaser: SemaphoreReleaser::from_shared(shared),
            })),
            Err(err) => completion(Err(err)),
        })
    }

    /// Releases the lock, handing it to the next queued locker if any.
    ///
    /// Must only be called by the current lock holder.
    pub fn unlock(&self) {
        self.semaphore.release()
    }

    /// Returns whether the mutex is currently locked.
    pub fn is_locked(&self) -> bool {
        self.semaphore.count() == 0
    }

    /// Returns the executor completions are scheduled on.
    pub fn executor(&self) -> &ExecutorHandle {
        self.semaphore.executor()
    }
}

impl core::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Mutex")
            .field("is_locked", &self.is_locked())
            .finish()
    }
}

/// A scope guard owning a locked [`Mutex`].
///
/// The guard releases the lock exactly once, on whichever exit path
/// drops it. Moving the guard transfers that responsibility; dropping a
/// guard whose mutex no longer exists does nothing.
#[derive(Debug)]
pub struct MutexGuard {
    releaser: SemaphoreReleaser,
}

impl MutexGuard {
    /// Releases the lock now.
    pub fn unlock(self) {
        drop(self.releaser)
    }
}
