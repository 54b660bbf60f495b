use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the inner guard if a previous holder panicked.
///
/// A panicking handler is already captured and turned into a `RelayError`
/// before it can poison anything meaningful here; recovering keeps one bad
/// job from wedging the whole context.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
