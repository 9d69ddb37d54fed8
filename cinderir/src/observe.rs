//! Post-mutation change notification.
//!
//! Downstream passes keep caches derived from the graph (dominator trees,
//! liveness, ...) that must be invalidated whenever the structure changes.
//! An [`Observer`] is registered per module or per function — never globally —
//! and is invoked synchronously, in the same call, immediately after each
//! structural mutation completes. Notification is fire-and-forget: it has no
//! return value and cannot veto the mutation.
use crate::block::BlockId;

/// What part of the graph a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// The module's set of functions changed.
    Module,
    /// A function's name, signature, return type or block set changed.
    Function,
    /// The instruction sequence of the given block changed.
    Block(BlockId),
}

/// Change-notification sink.
///
/// Implementations must be `Send + Sync` so that deep-copied functions can be
/// handed to other threads together with their registration.
pub trait Observer: Send + Sync {
    fn notify(&self, change: Change);
}

impl<F> Observer for F
where
    F: Fn(Change) + Send + Sync,
{
    fn notify(&self, change: Change) {
        self(change)
    }
}
