//! A no-op (non-thread-safe) lock for single-threaded lock strategies

use core::marker::PhantomData;
use lock_api::{GuardNoSend, RawMutex};

/// A lock which performs no synchronization.
///
/// Backing a [`GenericTransferLatch`](crate::sync::GenericTransferLatch)
/// with this lock removes all locking overhead for latches that are only
/// ever touched from a single thread. The type is `!Sync`, so such a
/// latch cannot accidentally be shared across threads.
#[derive(Debug)]
pub struct NoopLock {
    /// Assigned in order to make the type !Send and !Sync
    _phantom: PhantomData<*mut ()>,
}

unsafe impl RawMutex for NoopLock {
    const INIT: NoopLock = NoopLock {
        _phantom: PhantomData,
    };

    type GuardMarker = GuardNoSend;

    fn lock(&self) {}

    fn try_lock(&self) -> bool {
        true
    }

    unsafe fn unlock(&self) {}
}
