use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};

use relay_types::RelayError;
use tracing::{debug, trace};

use crate::util::lock;

type BoxedJob<T> = Box<dyn FnOnce() -> Result<T, RelayError> + Send>;

enum State<T> {
    Active(BoxedJob<T>),
    /// The job has been taken out and is executing, unlocked, on whichever
    /// thread called `process()`. Distinct from `Cancelled` so a concurrent
    /// `retrieve()`/`is_active()` landing in this window does not mistake an
    /// in-flight job for a cancelled one.
    Running,
    Completed(T),
    Cancelled,
    Exception(RelayError),
}

impl<T> State<T> {
    fn is_active(&self) -> bool {
        matches!(self, State::Active(_))
    }

    fn is_terminal(&self) -> bool {
        matches!(self, State::Completed(_) | State::Cancelled | State::Exception(_))
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

/// A single-assignment result cell with blocking wait, cancellation, and
/// captured-failure re-raising.
///
/// Cheap to clone: all clones share the same underlying state, condition
/// variable, and job slot, the same way a `Future` handle and the job
/// `Context::run` eventually drains refer to one shared result.
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Future<T> {
    /// Build a future around a one-shot job. The job does not run until
    /// [`Future::process`] is called.
    pub fn new(job: impl FnOnce() -> Result<T, RelayError> + Send + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Active(Box::new(job))),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Run the captured job if still active. A no-op if the future was
    /// already cancelled (or otherwise no longer active) before this call.
    pub fn process(&self) {
        let job = {
            let mut state = lock(&self.shared.state);
            if !state.is_active() {
                trace!("process called on a non-active future, skipping");
                return;
            }
            // Only Active can be true here since the lock was held
            // continuously since the check above.
            match std::mem::replace(&mut *state, State::Running) {
                State::Active(job) => job,
                _ => unreachable!(),
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(job));
        let next = match outcome {
            Ok(Ok(value)) => State::Completed(value),
            Ok(Err(error)) => {
                debug!(%error, "future job returned an error");
                State::Exception(error)
            }
            Err(panic) => {
                let message = panic_message(&panic);
                debug!(message, "future job panicked");
                State::Exception(RelayError::handler_failed(message))
            }
        };

        let mut state = lock(&self.shared.state);
        *state = next;
        self.shared.condvar.notify_all();
    }

    /// Block until terminal, then return the result.
    ///
    /// `Completed` yields a clone of the stored value (the static-typed
    /// equivalent of deep-copying on retrieval); `Cancelled` yields `None`;
    /// `Exception` re-raises the captured failure.
    pub fn retrieve(&self) -> Result<Option<T>, RelayError>
    where
        T: Clone,
    {
        let state = lock(&self.shared.state);
        let mut state = self
            .shared
            .condvar
            .wait_while(state, |s| !s.is_terminal())
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match &mut *state {
            State::Completed(value) => Ok(Some(value.clone())),
            State::Cancelled => Ok(None),
            State::Exception(error) => Err(error.clone()),
            State::Active(_) | State::Running => unreachable!("wait_while only returns once terminal"),
        }
    }

    /// Cancel the future if it is still active. Returns whether the
    /// transition happened; a terminal future cannot be cancelled.
    pub fn cancel(&self) -> bool {
        let mut state = lock(&self.shared.state);
        if state.is_active() {
            *state = State::Cancelled;
            self.shared.condvar.notify_all();
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared.state).is_active()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}

/// A type-erased job a [`crate::Context`] can run without knowing its result
/// type. Implemented by both [`Future`] and [`crate::ScheduledFuture`].
pub trait Job: Send {
    fn process(&self);
}

impl<T: Send + 'static> Job for Future<T> {
    fn process(&self) {
        Future::process(self)
    }
}
