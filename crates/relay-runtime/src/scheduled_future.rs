use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use relay_types::RelayError;
use tracing::trace;

use crate::future::{Future, Job};

/// A [`Future`] whose job is not even scheduled to run for a number of
/// seconds.
///
/// A plain [`Future`] cannot model this because an application may want to
/// cancel at one of two distinct moments: while the timer is still pending,
/// or while the job is already running. Both windows collapse onto the same
/// underlying `Future::cancel` here: cancelling while the timer thread is
/// still asleep prevents it from ever scheduling the job (the timer checks
/// `is_active` right before invoking the scheduling closure); cancelling
/// after it has been handed to a context but before `process()` runs leaves
/// `process()` to observe the cancelled state and no-op.
pub struct ScheduledFuture<T> {
    future: Future<T>,
    fired: Arc<AtomicBool>,
}

impl<T> Clone for ScheduledFuture<T> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            fired: Arc::clone(&self.fired),
        }
    }
}

impl<T: Send + 'static> ScheduledFuture<T> {
    /// Spawn a one-shot timer thread. After `delay`, if the future is still
    /// active, `schedule` is invoked with a clone of `self` — by convention
    /// `schedule` places that clone onto a [`crate::Context`]'s queue, whose
    /// worker will eventually call [`ScheduledFuture::process`] on it.
    pub fn new(
        delay: Duration,
        schedule: impl FnOnce(ScheduledFuture<T>) + Send + 'static,
        job: impl FnOnce() -> Result<T, RelayError> + Send + 'static,
    ) -> Self {
        let sf = Self {
            future: Future::new(job),
            fired: Arc::new(AtomicBool::new(false)),
        };

        let timer_handle = sf.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            timer_handle.fired.store(true, Ordering::SeqCst);
            if timer_handle.future.is_active() {
                schedule(timer_handle);
            } else {
                trace!("scheduled future cancelled before its timer fired");
            }
        });

        sf
    }

    pub fn process(&self) {
        self.future.process();
    }

    pub fn retrieve(&self) -> Result<Option<T>, RelayError>
    where
        T: Clone,
    {
        self.future.retrieve()
    }

    /// Cancel the underlying future. Valid whether the timer has fired yet
    /// or not; a no-op once `process()` has already completed.
    pub fn cancel(&self) -> bool {
        self.future.cancel()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl<T: Send + 'static> Job for ScheduledFuture<T> {
    fn process(&self) {
        ScheduledFuture::process(self)
    }
}
