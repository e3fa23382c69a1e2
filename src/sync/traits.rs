/*!
 * Critical Section Traits
 *
 * The enter/leave half of the controller contract. Each method implements
 * this once; the harness is monomorphized over the concrete type so the hot
 * loop never branches on the method.
 */

use crate::core::types::WorkerId;

/// Mutual exclusion between worker threads
///
/// Implementations must be:
/// - **Exclusive**: at most one worker between `enter` and `leave` (the naive
///   flag is the deliberate exception and is what the benchmark exposes)
/// - **Holder-released**: `leave` is called by the same worker that entered;
///   ownership never moves between threads
///
/// Fairness is not part of the contract.
pub trait Exclusion: Send + Sync {
    /// Block or spin until the calling worker holds the section
    fn enter(&self, id: WorkerId);

    /// Release the section held by the calling worker
    fn leave(&self, id: WorkerId);

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Run `f` inside the section
    #[inline]
    fn with<R>(&self, id: WorkerId, f: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        self.enter(id);
        let result = f();
        self.leave(id);
        result
    }
}
