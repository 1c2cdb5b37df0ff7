/// The error delivered through a completion whose wait was abandoned.
///
/// A waiter receives this when its `async_acquire` is cancelled through
/// its [`AcquireHandle`](super::AcquireHandle), or when the host
/// primitive is dropped while the waiter is still queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

impl core::fmt::Display for Aborted {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("operation aborted")
    }
}

/// The error a caller reports when it lost a transfer-latch race.
///
/// The core never produces this value itself. A path that observes a
/// dead [`Transaction`](super::Transaction) must not act on the disputed
/// resource; if it has its own completion channel to report through,
/// this is the value to report with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionDenied;

impl core::fmt::Display for CompletionDenied {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("completion denied")
    }
}

/// The result payload delivered to every acquire/wait completion.
pub type AcquireResult = Result<(), Aborted>;
