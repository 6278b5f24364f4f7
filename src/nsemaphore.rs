//! Counting semaphores used to coordinate the duplex socket's ring buffers
//! (spec §4.2, §4.3).
//!
//! Two flavors exist because the two rings wait for different things.
//! `Strict` blocks until the count reaches an exact threshold — used where
//! a reader/writer genuinely cannot proceed with less (e.g. "wait until
//! there's room for this many bytes"). `Loose` blocks until the threshold
//! is reached *or* a `flush` call says "stop waiting, take what's there" —
//! used where a caller would rather get a short read/write now than block
//! for more bytes that may never come.
//!
//! A futex-based implementation (`nsemaphore/futex.h`) was the alternative
//! considered; `std` has no safe raw futex syscall, so both semaphores here
//! are built on `Mutex` + `Condvar` instead. `terminated` lives inside the
//! same mutex-guarded state as the count, not a sibling lock — `terminate`
//! must flip the flag and `notify_all` while holding the very lock a waiter
//! re-checks its predicate under, or a `terminate` landing between a
//! waiter's predicate check and its call to `Condvar::wait` is a lost
//! wakeup that blocks forever.

use std::sync::{Condvar, Mutex};

struct StrictState {
    size: usize,
    terminated: bool,
}

/// Blocks `wait(n)` until the internal count is at least `n`, or the
/// semaphore is terminated.
pub struct Strict {
    state: Mutex<StrictState>,
    cv: Condvar,
}

impl Strict {
    pub fn new(initial: usize) -> Self {
        Strict {
            state: Mutex::new(StrictState {
                size: initial,
                terminated: false,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn load(&self) -> usize {
        self.state.lock().unwrap().size
    }

    /// Add `n` to the count and wake any waiter whose threshold is now met.
    pub fn post(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.size += n;
        self.cv.notify_all();
    }

    /// Block until the count is at least `n`, or [`terminate`](Self::terminate)
    /// has been called. A caller must re-check [`load`](Self::load) against
    /// `n` after this returns — it may have woken on termination alone.
    pub fn wait(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        while state.size < n && !state.terminated {
            state = self.cv.wait(state).unwrap();
        }
    }

    /// Subtract `n` from the count. The caller must already have observed
    /// (via [`wait`](Self::wait)) that at least `n` is available.
    pub fn consume(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.size -= n;
    }

    /// Idempotent: wake every blocked waiter permanently, regardless of
    /// whether its threshold was reached.
    pub fn terminate(&self) {
        let mut state = self.state.lock().unwrap();
        state.terminated = true;
        self.cv.notify_all();
    }
}

struct LooseState {
    size: usize,
    flush_size: usize,
    terminated: bool,
}

/// Like [`Strict`], but a pending [`flush`](Self::flush) call can release a
/// waiter early with fewer than `n` units available.
pub struct Loose {
    state: Mutex<LooseState>,
    cv: Condvar,
}

impl Loose {
    pub fn new(initial: usize) -> Self {
        Loose {
            state: Mutex::new(LooseState {
                size: initial,
                flush_size: 0,
                terminated: false,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn load(&self) -> usize {
        self.state.lock().unwrap().size
    }

    pub fn post(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.size += n;
        self.cv.notify_all();
    }

    /// Mark everything currently available as flushable, releasing any
    /// waiter even if its threshold was never reached.
    pub fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        state.flush_size = state.size;
        self.cv.notify_all();
    }

    /// Block until the count is at least `n`, a flush makes anything
    /// available at all, or [`terminate`](Self::terminate) is called.
    ///
    /// Returns the number of units actually available to consume, which may
    /// be less than `n` when released by a flush or by termination.
    pub fn wait(&self, n: usize) -> usize {
        let mut state = self.state.lock().unwrap();
        while state.size < n && state.flush_size == 0 && !state.terminated {
            state = self.cv.wait(state).unwrap();
        }
        state.size
    }

    /// Subtract `n` from the count, shrinking any outstanding flush
    /// allowance by the same amount.
    pub fn consume(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.size -= n;
        state.flush_size = state.flush_size.saturating_sub(n);
    }

    pub fn terminate(&self) {
        let mut state = self.state.lock().unwrap();
        state.terminated = true;
        self.cv.notify_all();
    }
}
