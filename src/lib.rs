//! Cooperative synchronization primitives for completion-callback code
//! driven by a single-threaded event-loop executor.
//!
//! The crate provides an asynchronous counting [`Semaphore`] with strict
//! FIFO fairness and per-waiter cancellation, a commit-once
//! [`TransferLatch`] with scoped [`Transaction`]s for arbitrating between
//! racing asynchronous completions, and a [`Mutex`] and
//! [`ConditionVariable`] derived from the semaphore.
//!
//! The primitives do not perform I/O and do not block threads. An
//! operation that cannot complete synchronously parks a waiter and
//! schedules its completion closure through the [`Executor`] contract
//! once the operation finishes. Completions are never invoked on the
//! caller's stack; they always run on a later executor turn, in posting
//! order.
//!
//! The semaphore, mutex and condition variable assume a single logical
//! thread of control. The transfer latch is parameterized over a
//! [`lock_api::RawMutex`] so it can arbitrate between genuinely
//! concurrent threads when backed by a real lock, or run lock-free in
//! single-threaded code when backed by [`NoopLock`].
//!
//! [`Semaphore`]: sync::Semaphore
//! [`TransferLatch`]: sync::LocalTransferLatch
//! [`Transaction`]: sync::Transaction
//! [`Mutex`]: sync::Mutex
//! [`ConditionVariable`]: sync::ConditionVariable
//! [`Executor`]: exec::Executor

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod noop_lock;
pub use self::noop_lock::NoopLock;

mod waiter_queue;

pub mod exec;

pub mod sync;
