//! Synchronization primitives for completion-callback code.
//!
//! This module provides the asynchronous counting semaphore, the
//! commit-once transfer latch, and the mutex and condition variable
//! derived from the semaphore.

mod error;

pub use self::error::{Aborted, AcquireResult, CompletionDenied};

mod semaphore;

pub use self::semaphore::{AcquireHandle, Semaphore, SemaphoreReleaser};

mod mutex;

pub use self::mutex::{Mutex, MutexGuard};

mod condition_variable;

pub use self::condition_variable::ConditionVariable;

mod transfer_latch;

pub use self::transfer_latch::{
    begin_transaction, begin_transaction2, GenericTransferLatch,
    LocalTransferLatch, Transaction, Transaction2,
};

#[cfg(feature = "std")]
pub use self::transfer_latch::TransferLatch;
