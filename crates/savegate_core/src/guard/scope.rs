//! Context-local, reentrant read-only scope.
//!
//! # Responsibility
//! - Mark a logical unit of work (one request, one task) as query-only.
//! - Support nesting: leaving an inner scope keeps an outer one active.
//!
//! # Invariants
//! - State lives in the `ReadOnlyScope` value, not in a process global.
//!   Clones share state; independently constructed scopes never observe
//!   each other.
//! - Every `enter` is balanced by exactly one exit (explicit or on drop).
//! - Depth never underflows.

use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Read-only scope state for one logical unit of work.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyScope {
    depth: Arc<AtomicUsize>,
}

impl ReadOnlyScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens one nesting level. The level closes when the guard is dropped or
    /// [`ReadOnlyScopeGuard::exit`] is called.
    #[must_use = "the read-only scope closes as soon as the guard is dropped"]
    pub fn enter(&self) -> ReadOnlyScopeGuard {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("event=read_only_scope module=guard status=enter depth={depth}");
        ReadOnlyScopeGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    /// Whether at least one scope level is open for this unit of work.
    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Number of currently open nesting levels.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// Open level of a [`ReadOnlyScope`].
#[derive(Debug)]
pub struct ReadOnlyScopeGuard {
    depth: Arc<AtomicUsize>,
}

impl ReadOnlyScopeGuard {
    /// Closes this level explicitly.
    pub fn exit(self) {
        drop(self);
    }
}

impl Drop for ReadOnlyScopeGuard {
    fn drop(&mut self) {
        let previous = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
                depth.checked_sub(1)
            })
            .unwrap_or(0);
        debug!(
            "event=read_only_scope module=guard status=exit depth={}",
            previous.saturating_sub(1)
        );
    }
}
