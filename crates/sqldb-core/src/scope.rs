//! Cancellation scopes.
//!
//! Every database operation runs inside a [`Scope`]: a cancellable context
//! with an optional deadline. Scopes form a tree; cancelling a scope cancels
//! every scope derived from it, and a child never outlives its parent's
//! deadline. Waiting on a scope wakes immediately on cancellation.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// State of a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeStatus {
    /// Neither cancelled nor past the deadline.
    Active,
    /// Cancelled explicitly, or through a parent.
    Cancelled,
    /// The deadline has passed.
    DeadlineExceeded,
}

#[derive(Debug, Default)]
struct State {
    cancelled: bool,
    children: Vec<Weak<Inner>>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    wake: Condvar,
    deadline: Option<Instant>,
}

impl Inner {
    fn new(deadline: Option<Instant>, cancelled: bool) -> Self {
        Self {
            state: Mutex::new(State {
                cancelled,
                children: Vec::new(),
            }),
            wake: Condvar::new(),
            deadline,
        }
    }

    fn cancel(&self) {
        let children = {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.children)
        };
        self.wake.notify_all();
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// A cancellable, optionally deadline-bound context. Cloning shares the
/// same underlying scope.
#[derive(Debug, Clone)]
pub struct Scope {
    inner: Arc<Inner>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    /// A new root scope without deadline.
    pub fn root() -> Self {
        Self {
            inner: Arc::new(Inner::new(None, false)),
        }
    }

    /// Derive a child scope. The child's deadline is the earlier of
    /// `deadline` and this scope's own deadline.
    pub fn child(&self, deadline: Option<Instant>) -> Scope {
        let deadline = match (self.inner.deadline, deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let mut state = self.inner.state.lock();
        let inner = Arc::new(Inner::new(deadline, state.cancelled));
        if !state.cancelled {
            state.children.retain(|w| w.strong_count() > 0);
            state.children.push(Arc::downgrade(&inner));
        }
        Scope { inner }
    }

    /// Derive a child scope that expires `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Scope {
        self.child(Instant::now().checked_add(timeout))
    }

    /// Cancel this scope and every scope derived from it. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the scope has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().cancelled
    }

    /// Current status. Cancellation wins over deadline expiry.
    pub fn status(&self) -> ScopeStatus {
        if self.is_cancelled() {
            ScopeStatus::Cancelled
        } else if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            ScopeStatus::DeadlineExceeded
        } else {
            ScopeStatus::Active
        }
    }

    /// Whether the scope is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.status() != ScopeStatus::Active
    }

    /// Block for `dur`, or until the deadline or a cancellation, whichever
    /// comes first. Returns the status after waking.
    pub fn wait(&self, dur: Duration) -> ScopeStatus {
        let mut until = Instant::now().checked_add(dur);
        if let Some(deadline) = self.inner.deadline {
            until = Some(until.map_or(deadline, |u| u.min(deadline)));
        }

        let mut state = self.inner.state.lock();
        while !state.cancelled {
            match until {
                Some(until) => {
                    if Instant::now() >= until {
                        break;
                    }
                    let _ = self.inner.wake.wait_until(&mut state, until);
                }
                None => self.inner.wake.wait(&mut state),
            }
        }
        drop(state);
        self.status()
    }
}
