//! Synchronous SIGINT handling
//!
//! Block SIGINT with [`mask_interrupt_signal`] (or [`InterruptMask`]) and
//! then collect it with one of the waits instead of having it terminate the
//! process. Masks are per thread once a process has more than one thread:
//! mask in the thread that waits, or before spawning any threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};

use crate::config::Config;
use crate::error::{Error, Result};

/// How a bounded or cancellable wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// SIGINT arrived and was consumed
    Interrupted,
    /// The timeout elapsed first
    TimedOut,
    /// The waiter's `CancelHandle` was triggered
    Cancelled,
}

fn interrupt_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set
}

/// Add SIGINT to the blocked signal set
///
/// It stays blocked until [`unmask_interrupt_signal`] is called.
pub fn mask_interrupt_signal() -> Result<()> {
    tracing::debug!("Masking SIGINT");
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&interrupt_set()), None).map_err(Error::SignalMask)
}

/// Remove SIGINT from the blocked signal set
///
/// A SIGINT that is still pending is delivered as soon as this returns.
pub fn unmask_interrupt_signal() -> Result<()> {
    tracing::debug!("Unmasking SIGINT");
    sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&interrupt_set()), None).map_err(Error::SignalMask)
}

/// Block until SIGINT is pending, then consume it
///
/// SIGINT must already be masked. There is no timeout; see
/// [`InterruptWaiter`] for a wait that can be bounded or cancelled.
pub fn wait_for_interrupt_signal() -> Result<()> {
    tracing::debug!("Waiting for SIGINT");
    consume(&interrupt_set())
}

/// Wait at most `timeout` for SIGINT
pub fn wait_for_interrupt_timeout(timeout: Duration) -> Result<WaitOutcome> {
    InterruptWaiter::new(&Config::default()).wait(Some(timeout))
}

fn consume(set: &SigSet) -> Result<()> {
    loop {
        match set.wait() {
            Ok(Signal::SIGINT) => {
                tracing::debug!("Caught SIGINT");
                return Ok(());
            },
            Ok(other) => return Err(Error::UnexpectedSignal(other)),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::SignalWait(e)),
        }
    }
}

/// Wait up to `timeout` for SIGINT. Returns whether it was consumed.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn wait_slice(set: &SigSet, timeout: Duration) -> Result<bool> {
    use nix::libc;

    let timeout = libc::timespec {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as _,
    };

    loop {
        // SAFETY: both pointers are valid for the call, siginfo is not requested
        let signo = unsafe { libc::sigtimedwait(set.as_ref(), std::ptr::null_mut(), &timeout) };

        if signo == libc::SIGINT {
            tracing::debug!("Caught SIGINT");
            return Ok(true);
        }
        if signo >= 0 {
            let signal = Signal::try_from(signo).map_err(Error::SignalWait)?;
            return Err(Error::UnexpectedSignal(signal));
        }

        match Errno::last() {
            Errno::EAGAIN => return Ok(false),
            Errno::EINTR => continue,
            e => return Err(Error::SignalWait(e)),
        }
    }
}

/// Wait up to `timeout` for SIGINT. Returns whether it was consumed.
///
/// No sigtimedwait here: poll the pending set and only call sigwait once
/// SIGINT is known to be pending.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn wait_slice(set: &SigSet, timeout: Duration) -> Result<bool> {
    const PENDING_POLL: Duration = Duration::from_millis(5);

    let deadline = Instant::now() + timeout;
    loop {
        if interrupt_pending()? {
            consume(set)?;
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        std::thread::sleep((deadline - now).min(PENDING_POLL));
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn interrupt_pending() -> Result<bool> {
    use nix::libc;
    use std::mem::MaybeUninit;

    let mut pending = MaybeUninit::<libc::sigset_t>::uninit();

    // SAFETY: sigpending fills the set on success, which is checked before use
    unsafe {
        if libc::sigpending(pending.as_mut_ptr()) < 0 {
            return Err(Error::SignalWait(Errno::last()));
        }
        Ok(libc::sigismember(pending.as_ptr(), libc::SIGINT) == 1)
    }
}

/// Cancels an [`InterruptWaiter`] from another thread
///
/// Cancellation is sticky: every later wait on the same waiter returns
/// `Cancelled` as well.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        tracing::debug!("Cancelling SIGINT wait");
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Floor for the slice length; a zero slice would spin on sigtimedwait
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A SIGINT wait that can time out or be cancelled
///
/// The wait runs in slices of `Config::wait_poll_interval`, checking for
/// cancellation between slices, so a cancel takes effect within one slice.
#[derive(Debug)]
pub struct InterruptWaiter {
    cancel: CancelHandle,
    poll_interval: Duration,
}

impl InterruptWaiter {
    pub fn new(config: &Config) -> Self {
        Self {
            cancel: CancelHandle::default(),
            poll_interval: config.wait_poll_interval().max(MIN_POLL_INTERVAL),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for SIGINT, for at most `timeout` if given
    ///
    /// SIGINT must already be masked in the calling thread. A zero timeout
    /// checks once for a pending SIGINT without blocking. A timeout too large
    /// to represent as a deadline waits without bound.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<WaitOutcome> {
        tracing::debug!(?timeout, "Waiting for SIGINT");

        let set = interrupt_set();
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            if self.cancel.is_cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }

            let slice = match deadline {
                Some(deadline) => self
                    .poll_interval
                    .min(deadline.saturating_duration_since(Instant::now())),
                None => self.poll_interval,
            };
            tracing::trace!(?slice, "SIGINT wait slice");

            if wait_slice(&set, slice)? {
                return Ok(WaitOutcome::Interrupted);
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(WaitOutcome::TimedOut);
            }
        }
    }
}

/// Blocks SIGINT while alive, then puts back the previous signal mask
#[derive(Debug)]
pub struct InterruptMask {
    previous: SigSet,
}

impl InterruptMask {
    pub fn block() -> Result<Self> {
        tracing::debug!("Masking SIGINT (scoped)");

        let mut previous = SigSet::empty();
        sigprocmask(
            SigmaskHow::SIG_BLOCK,
            Some(&interrupt_set()),
            Some(&mut previous),
        )
        .map_err(Error::SignalMask)?;

        Ok(Self { previous })
    }
}

impl Drop for InterruptMask {
    fn drop(&mut self) {
        if let Err(e) = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
            tracing::warn!("Failed to restore signal mask: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::raise;
    use std::thread;

    fn sigint_blocked() -> bool {
        SigSet::thread_get_mask().unwrap().contains(Signal::SIGINT)
    }

    #[test]
    fn test_mask_then_unmask() {
        mask_interrupt_signal().unwrap();
        assert!(sigint_blocked());

        unmask_interrupt_signal().unwrap();
        assert!(!sigint_blocked());
    }

    #[test]
    fn test_raised_sigint_is_collected() {
        mask_interrupt_signal().unwrap();
        raise(Signal::SIGINT).unwrap();

        wait_for_interrupt_signal().unwrap();
    }

    #[test]
    fn test_timed_wait_times_out() {
        mask_interrupt_signal().unwrap();

        let start = Instant::now();
        let outcome = wait_for_interrupt_timeout(Duration::from_millis(80)).unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_zero_timeout_sees_pending_sigint() {
        mask_interrupt_signal().unwrap();
        raise(Signal::SIGINT).unwrap();

        let outcome = wait_for_interrupt_timeout(Duration::ZERO).unwrap();
        assert_eq!(outcome, WaitOutcome::Interrupted);
    }

    #[test]
    fn test_huge_timeout_waits_unbounded() {
        mask_interrupt_signal().unwrap();
        raise(Signal::SIGINT).unwrap();

        let outcome = wait_for_interrupt_timeout(Duration::MAX).unwrap();
        assert_eq!(outcome, WaitOutcome::Interrupted);
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = Config {
            wait_poll_interval_ms: 0,
            ..Config::default()
        };
        let waiter = InterruptWaiter::new(&config);
        assert_eq!(waiter.poll_interval, MIN_POLL_INTERVAL);

        mask_interrupt_signal().unwrap();
        let outcome = waiter.wait(Some(Duration::from_millis(20))).unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[test]
    fn test_cancel_from_other_thread() {
        mask_interrupt_signal().unwrap();

        let config = Config {
            wait_poll_interval_ms: 10,
            ..Config::default()
        };
        let waiter = InterruptWaiter::new(&config);
        let handle = waiter.cancel_handle();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            handle.cancel();
        });

        assert_eq!(waiter.wait(None).unwrap(), WaitOutcome::Cancelled);
        assert_eq!(
            waiter.wait(Some(Duration::from_secs(1))).unwrap(),
            WaitOutcome::Cancelled
        );
        canceller.join().unwrap();
    }

    #[test]
    fn test_interrupt_mask_restores_previous_mask() {
        unmask_interrupt_signal().unwrap();

        {
            let _mask = InterruptMask::block().unwrap();
            assert!(sigint_blocked());
        }

        assert!(!sigint_blocked());
    }
}
