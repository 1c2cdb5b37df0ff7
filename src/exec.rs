//! The executor contract consumed by the synchronization primitives
//!
//! The primitives in this crate never invoke a completion on the caller's
//! stack. Whenever an operation finishes - an `async_acquire` that is
//! granted, a waiter that is cancelled - the completion closure is handed
//! to an [`Executor`] via [`post`](Executor::post) and runs on a later
//! executor turn. This keeps the call stack bounded under tight
//! acquire/release loops and gives callers a consistent re-entrancy
//! guarantee: no completion ever observes the primitive mid-operation.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::RefCell;

/// A deferred zero-argument continuation.
pub type Continuation = Box<dyn FnOnce()>;

/// The scheduling capability required by the primitives in this crate.
///
/// Implementations must run posted continuations one at a time, in
/// posting order, after the current executor turn completes. They must
/// not run a continuation from inside `post` itself.
pub trait Executor {
    /// Queues `f` to run on a later executor turn.
    fn post(&self, f: Continuation);
}

/// A shared handle to the executor a primitive schedules completions on.
///
/// The primitives assume a single logical thread of control, so the
/// handle is reference-counted rather than atomically reference-counted.
pub type ExecutorHandle = Rc<dyn Executor>;

/// A deterministic executor driven manually by the caller.
///
/// `ManualExecutor` maintains a FIFO run queue. Nothing runs until the
/// owner explicitly turns the queue with [`run_one`](ManualExecutor::run_one)
/// or drains it with [`run`](ManualExecutor::run), which makes
/// completion ordering fully observable. This is the executor used by
/// this crate's own test suite.
///
/// Continuations posted while the queue is being drained are appended
/// behind all previously posted entries and run within the same `run`
/// call, preserving strict posting order.
pub struct ManualExecutor {
    queue: RefCell<VecDeque<Continuation>>,
    running: core::cell::Cell<bool>,
}

impl ManualExecutor {
    /// Creates an executor with an empty run queue.
    pub fn new() -> Rc<ManualExecutor> {
        Rc::new(ManualExecutor {
            queue: RefCell::new(VecDeque::new()),
            running: core::cell::Cell::new(false),
        })
    }

    /// Runs the least recently posted continuation, if any.
    ///
    /// Returns `true` if a continuation ran.
    pub fn run_one(&self) -> bool {
        let f = self.queue.borrow_mut().pop_front();
        match f {
            Some(f) => {
                self.enter();
                f();
                self.running.set(false);
                true
            }
            None => false,
        }
    }

    /// Runs continuations until the queue is empty, including any that
    /// are posted while draining. Returns the number of continuations
    /// that ran.
    pub fn run(&self) -> usize {
        let mut turns = 0;
        loop {
            let f = self.queue.borrow_mut().pop_front();
            match f {
                Some(f) => {
                    self.enter();
                    f();
                    self.running.set(false);
                    turns += 1;
                }
                None => return turns,
            }
        }
    }

    /// Returns the number of continuations currently queued.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn enter(&self) {
        // There is one logical thread of control. Draining the queue
        // from inside a continuation would reorder completions.
        if self.running.replace(true) {
            panic!("ManualExecutor turned re-entrantly from a continuation");
        }
    }
}

impl Executor for ManualExecutor {
    fn post(&self, f: Continuation) {
        self.queue.borrow_mut().push_back(f);
    }
}

impl core::fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn post_does_not_run_inline() {
        let exec = ManualExecutor::new();
        let ran = Rc::new(RefCell::new(false));
        let r = ran.clone();
        exec.post(Box::new(move || *r.borrow_mut() = true));
        assert!(!*ran.borrow());
        assert_eq!(1, exec.pending());
        assert!(exec.run_one());
        assert!(*ran.borrow());
        assert!(!exec.run_one());
    }

    #[test]
    fn run_preserves_posting_order() {
        let exec = ManualExecutor::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let o = order.clone();
            exec.post(Box::new(move || o.borrow_mut().push(i)));
        }
        assert_eq!(3, exec.run());
        assert_eq!(&[0, 1, 2], order.borrow().as_slice());
    }

    #[test]
    fn continuations_posted_while_draining_run_last() {
        let exec = ManualExecutor::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        let e = exec.clone();
        exec.post(Box::new(move || {
            o.borrow_mut().push(1);
            let o2 = o.clone();
            e.post(Box::new(move || o2.borrow_mut().push(3)));
        }));
        let o = order.clone();
        exec.post(Box::new(move || o.borrow_mut().push(2)));
        assert_eq!(3, exec.run());
        assert_eq!(&[1, 2, 3], order.borrow().as_slice());
    }
}
