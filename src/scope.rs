//! Hierarchical cancellation scopes
//!
//! A [`CancelScope`] is a node in a cancellation tree: cancelling an ancestor
//! cancels every descendant, and an ancestor's deadline is observed by every
//! descendant. Scopes combine a [`CancellationToken`] child chain (explicit
//! cancellation) with an *effective deadline*, the minimum of the scope's own
//! deadline and all ancestor deadlines computed at derivation time, so no
//! background watcher task is needed and dropping a scope releases it without
//! affecting siblings.
//!
//! Every long-running wait in this crate (backoff sleeps, worker loops,
//! outbound requests) is expressed as a race against [`CancelScope::done`],
//! never as an unconditional blocking wait.

use crate::error::TaskError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Component name used for cancellation errors
const COMPONENT: &str = "scope";

/// A node in the cancellation hierarchy
///
/// A scope is *done* once it (or any ancestor) is explicitly cancelled, or
/// once its effective deadline elapses. Cloning a scope yields another handle
/// to the same node; [`CancelScope::child`] derives a new node.
#[derive(Clone, Debug)]
pub struct CancelScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelScope {
    /// Create a top-level scope with no deadline
    pub fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Create a top-level scope that is done after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derive a child scope, optionally bounded by its own timeout
    ///
    /// The child is done when this scope is done, when the optional timeout
    /// elapses, or when the child is explicitly cancelled. The child's
    /// deadline can never outlive this scope's deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let own = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, own) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (Some(parent), None) => Some(parent),
            (None, child) => child,
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Cancel this scope and, transitively, all scopes derived from it
    ///
    /// Idempotent; cancelling an already-done scope has no further effect,
    /// and a scope is never "un-cancelled". Sibling and ancestor scopes are
    /// unaffected.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether this scope is done (cancelled, deadline elapsed, or ancestor done)
    pub fn is_done(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d) || self.token.is_cancelled()
    }

    /// The terminal error for a done scope, or `None` while it is still live
    ///
    /// Distinguishes a deadline expiry (`deadline_exceeded`) from an explicit
    /// cancellation (`cancelled`). An elapsed deadline takes precedence so the
    /// reported reason stays stable once the scope is done.
    pub fn done_reason(&self) -> Option<TaskError> {
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(TaskError::deadline_exceeded(COMPONENT));
        }
        if self.token.is_cancelled() {
            return Some(TaskError::cancelled(COMPONENT));
        }
        None
    }

    /// Wait until this scope is done
    ///
    /// Resolves immediately if the scope is already done. Races explicit
    /// cancellation against the effective deadline; never blocks past the
    /// point the scope becomes done.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// The effective deadline of this scope, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
