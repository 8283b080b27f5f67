//! SIGINT mask/wait tests
//!
//! Signals here are always thread-directed (raise / pthread_kill) at a thread
//! that has SIGINT blocked, so the test process itself is never interrupted.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use nix::sys::pthread::{pthread_kill, pthread_self};
use nix::sys::signal::{raise, SigSet, Signal};

use termshim::{
    mask_interrupt_signal, unmask_interrupt_signal, wait_for_interrupt_signal,
    wait_for_interrupt_timeout, Config, InterruptMask, InterruptWaiter, WaitOutcome,
};

#[test]
fn test_masked_sigint_is_queued_not_fatal() {
    mask_interrupt_signal().unwrap();
    raise(Signal::SIGINT).unwrap();

    // Still alive, and the signal is waiting for us
    let pending = wait_for_interrupt_timeout(Duration::ZERO).unwrap();
    assert_eq!(pending, WaitOutcome::Interrupted);
}

#[test]
fn test_blocking_wait_returns_when_sigint_arrives() {
    let (tx, rx) = mpsc::channel();

    let waiter = thread::spawn(move || {
        mask_interrupt_signal().unwrap();
        tx.send(pthread_self()).unwrap();
        wait_for_interrupt_signal()
    });

    let target = rx.recv().unwrap();
    thread::sleep(Duration::from_millis(20));
    pthread_kill(target, Signal::SIGINT).unwrap();

    waiter.join().unwrap().unwrap();
}

#[test]
fn test_waiter_interrupted_from_other_thread() {
    let (tx, rx) = mpsc::channel();

    let waiter = thread::spawn(move || {
        let _mask = InterruptMask::block().unwrap();
        let config = Config {
            wait_poll_interval_ms: 10,
            ..Config::default()
        };
        tx.send(pthread_self()).unwrap();
        InterruptWaiter::new(&config).wait(Some(Duration::from_secs(5)))
    });

    let target = rx.recv().unwrap();
    thread::sleep(Duration::from_millis(20));
    pthread_kill(target, Signal::SIGINT).unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), WaitOutcome::Interrupted);
}

#[test]
fn test_interrupt_mask_scope() {
    let outcome = thread::spawn(|| {
        unmask_interrupt_signal().unwrap();
        let before = SigSet::thread_get_mask().unwrap();
        assert!(!before.contains(Signal::SIGINT));

        let outcome = {
            let _mask = InterruptMask::block().unwrap();
            raise(Signal::SIGINT).unwrap();
            wait_for_interrupt_timeout(Duration::from_millis(500)).unwrap()
        };

        let after = SigSet::thread_get_mask().unwrap();
        assert!(!after.contains(Signal::SIGINT));
        outcome
    })
    .join()
    .unwrap();

    assert_eq!(outcome, WaitOutcome::Interrupted);
}
