use std::cell::RefCell;
use std::rc::Rc;

use strand_sync::exec::ManualExecutor;
use strand_sync::sync::{Aborted, AcquireResult, Semaphore};

type Log = Rc<RefCell<Vec<(u32, AcquireResult)>>>;

fn record(log: &Log, id: u32) -> impl FnOnce(AcquireResult) + 'static {
    let log = log.clone();
    move |res| log.borrow_mut().push((id, res))
}

#[test]
fn try_acquire_value_accounting() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec, 2);
    assert_eq!(2, sem.value());
    assert_eq!(2, sem.count());

    assert!(sem.try_acquire());
    assert_eq!(1, sem.value());
    assert!(sem.try_acquire());
    assert_eq!(0, sem.value());

    // Exhausted: no side effect.
    assert!(!sem.try_acquire());
    assert_eq!(0, sem.value());

    sem.release();
    assert_eq!(1, sem.value());
    sem.release();
    sem.release();
    assert_eq!(3, sem.value());
}

#[test]
fn immediate_grant_is_posted_not_inline() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 1);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    sem.async_acquire(record(&log, 1));
    // The permit was debited synchronously...
    assert_eq!(0, sem.count());
    // ...but the completion must not have run on our stack.
    assert!(log.borrow().is_empty());
    assert_eq!(1, exec.pending());

    assert_eq!(1, exec.run());
    assert_eq!(&[(1, Ok(()))], log.borrow().as_slice());
}

#[test]
fn waiters_complete_in_fifo_order() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    sem.async_acquire(record(&log, 1));
    sem.async_acquire(record(&log, 2));
    assert_eq!(2, sem.waiters());
    assert_eq!(-2, sem.value());

    sem.release();
    sem.release();
    assert!(log.borrow().is_empty());

    assert_eq!(2, exec.run());
    assert_eq!(&[(1, Ok(())), (2, Ok(()))], log.borrow().as_slice());
    assert_eq!(0, sem.value());
    assert_eq!(0, sem.waiters());
}

#[test]
fn release_hands_off_directly_to_head_waiter() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    sem.async_acquire(record(&log, 1));
    sem.release();
    // The released permit went to the waiter, not the counter.
    assert_eq!(0, sem.count());
    assert!(!sem.try_acquire());
    exec.run();
    assert_eq!(&[(1, Ok(()))], log.borrow().as_slice());
}

#[test]
fn release_all_releases_every_waiter_once() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    for id in 1..=3 {
        sem.async_acquire(record(&log, id));
    }
    assert_eq!(3, sem.release_all());
    assert_eq!(0, sem.waiters());
    assert_eq!(0, sem.count());

    assert_eq!(3, exec.run());
    assert_eq!(
        &[(1, Ok(())), (2, Ok(())), (3, Ok(()))],
        log.borrow().as_slice()
    );
    assert_eq!(0, sem.value());

    // Nothing left to release.
    assert_eq!(0, sem.release_all());
}

#[test]
fn drop_aborts_queued_waiters_in_order() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    for id in 1..=3 {
        sem.async_acquire(record(&log, id));
    }
    drop(sem);

    // All three completions ran before drop returned, without any
    // executor turn.
    assert_eq!(0, exec.pending());
    assert_eq!(
        &[(1, Err(Aborted)), (2, Err(Aborted)), (3, Err(Aborted))],
        log.borrow().as_slice()
    );
}

#[test]
fn cancel_removes_exactly_one_waiter() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let _a = sem.async_acquire(record(&log, 1));
    let b = sem.async_acquire(record(&log, 2));
    let _c = sem.async_acquire(record(&log, 3));

    assert!(b.is_pending());
    assert!(b.cancel());
    assert!(!b.is_pending());
    assert_eq!(2, sem.waiters());
    // The capacity unit it never consumed stays in the pool.
    assert_eq!(0, sem.count());

    exec.run();
    assert_eq!(&[(2, Err(Aborted))], log.borrow().as_slice());

    // FIFO order of the survivors is intact.
    sem.release();
    sem.release();
    exec.run();
    assert_eq!(
        &[(2, Err(Aborted)), (1, Ok(())), (3, Ok(()))],
        log.borrow().as_slice()
    );
}

#[test]
fn cancel_is_idempotent() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let handle = sem.async_acquire(record(&log, 1));
    assert!(handle.cancel());
    assert!(!handle.cancel());
    exec.run();
    assert_eq!(&[(1, Err(Aborted))], log.borrow().as_slice());
}

#[test]
fn release_wins_race_against_cancel() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let handle = sem.async_acquire(record(&log, 1));
    sem.release();
    // The release already took the waiter; the cancellation loses and
    // is a no-op.
    assert!(!handle.cancel());
    exec.run();
    assert_eq!(&[(1, Ok(()))], log.borrow().as_slice());
    assert_eq!(0, sem.value());
}

#[test]
fn handle_of_immediate_grant_is_inert() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 1);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let handle = sem.async_acquire(record(&log, 1));
    assert!(!handle.is_pending());
    assert!(!handle.cancel());
    exec.run();
    assert_eq!(&[(1, Ok(()))], log.borrow().as_slice());
}

#[test]
fn handle_outliving_semaphore_is_inert() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 0);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let handle = sem.async_acquire(record(&log, 1));
    drop(sem);
    assert_eq!(&[(1, Err(Aborted))], log.borrow().as_slice());
    assert!(!handle.is_pending());
    assert!(!handle.cancel());
}

#[test]
fn releaser_returns_permit_on_drop() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 1);

    assert!(sem.try_acquire());
    {
        let _releaser = sem.releaser();
        assert_eq!(0, sem.count());
    }
    assert_eq!(1, sem.count());
}

#[test]
fn disarmed_releaser_keeps_permit() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 1);

    assert!(sem.try_acquire());
    let releaser = sem.releaser();
    releaser.disarm();
    assert_eq!(0, sem.count());
}

#[test]
fn interleaved_acquire_release_keeps_value_algebra() {
    let exec = ManualExecutor::new();
    let sem = Semaphore::new(exec.clone(), 3);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let mut granted = 0isize;
    let mut releases = 0isize;

    for round in 0..4 {
        if sem.try_acquire() {
            granted += 1;
        }
        sem.async_acquire(record(&log, round));
        granted += 1;
        sem.release();
        releases += 1;
        assert_eq!(3 + releases - granted, sem.value());
    }
    exec.run();
    assert!(log.borrow().iter().all(|(_, res)| res.is_ok()));
}
