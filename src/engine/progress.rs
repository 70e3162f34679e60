//! Progress delivery for frame-level runs
//!
//! Runs report one item per processed frame (an index while moshing, a
//! picture type while analyzing). The sink decides where the item goes; a
//! sink returning `false` tells the run that nobody is listening anymore.

use tokio::sync::mpsc;

/// Receiver of per-frame progress items
pub trait ProgressSink<T> {
    /// Deliver one item, blocking if the consumer is behind
    ///
    /// Returns `false` once the consumer has gone away.
    fn report(&mut self, item: T) -> bool;
}

/// Bounded channel sender, used from blocking worker threads
///
/// `blocking_send` waits for free capacity, so a slow consumer throttles the
/// producing loop. Must not be called from within an async context.
impl<T> ProgressSink<T> for mpsc::Sender<T> {
    fn report(&mut self, item: T) -> bool {
        self.blocking_send(item).is_ok()
    }
}

/// Collects every item, mostly useful in tests and small tools
impl<T> ProgressSink<T> for Vec<T> {
    fn report(&mut self, item: T) -> bool {
        self.push(item);
        true
    }
}

/// Adapter turning a closure into a progress sink
pub struct FnProgress<F>(pub F);

impl<T, F: FnMut(T)> ProgressSink<T> for FnProgress<F> {
    fn report(&mut self, item: T) -> bool {
        (self.0)(item);
        true
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgress;

impl<T> ProgressSink<T> for NoOpProgress {
    fn report(&mut self, _item: T) -> bool {
        true
    }
}
