use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_runtime::ScheduledFuture;
use relay_types::{Args, Event, NodeId, RelayError, StateEvent, Value};
use tracing::debug;

use crate::dispatcher::{dispatch_guarded, Dispatcher, EventHandler};
use crate::util::lock;

/// A finite-state-machine helper built on top of a [`Dispatcher`].
///
/// State transitions are driven by the owning object calling
/// [`State::change_state`], passing its own `&mut dyn EventHandler` borrow
/// in. `change_state` dispatches synthetic `Leave`/`Enter` [`StateEvent`]s
/// straight to that borrow (via [`dispatch_guarded`]) rather than routing
/// them back through [`Dispatcher::send`] — the caller's borrow may already
/// be the same handler currently running (e.g. a Timeout handler changing
/// its own state), and `send`'s same-context path locks the owner's mutex,
/// which would deadlock against a lock the caller is already holding.
/// `StateChange` notifications and `Timeout` scheduling still go through the
/// dispatcher, since those are delivered to listeners or deferred onto a
/// timer thread rather than invoked inline.
pub struct State {
    dispatcher: Arc<Dispatcher>,
    owner: NodeId,
    initial: String,
    current: Mutex<Option<String>>,
    timeouts: HashMap<String, Duration>,
    timer: Mutex<Option<ScheduledFuture<Value>>>,
}

impl State {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        owner: NodeId,
        initial_state: impl Into<String>,
        timeouts: HashMap<String, Duration>,
    ) -> Result<Self, RelayError> {
        let initial = initial_state.into();
        if initial.is_empty() {
            return Err(RelayError::InvalidArgument(
                "initial state must not be empty".into(),
            ));
        }

        Ok(Self {
            dispatcher,
            owner,
            current: Mutex::new(Some(initial.clone())),
            initial,
            timeouts,
            timer: Mutex::new(None),
        })
    }

    /// Current state name. Consulted by the owner's
    /// [`crate::EventHandler::identify_state`] implementation.
    pub fn identify_state(&self, _event: &Event) -> Option<String> {
        lock(&self.current).clone()
    }

    pub fn current(&self) -> Option<String> {
        lock(&self.current).clone()
    }

    /// Transition to `new_state`. A no-op (no events dispatched, no timer
    /// restarted) if `new_state` equals the current state.
    ///
    /// `owner` must be the same object this `State` was built for — pass the
    /// handler's own `&mut self` when calling from inside a handler (the
    /// FSM's normal usage), or a freshly locked guard when calling from
    /// outside one.
    pub fn change_state(
        &self,
        owner: &mut dyn EventHandler,
        new_state: impl Into<String>,
        notify: bool,
    ) -> Result<(), RelayError> {
        let new_state = new_state.into();

        let old_state = {
            let current = lock(&self.current);
            current.clone().ok_or_else(|| {
                RelayError::InvalidArgument("state machine has no current state".into())
            })?
        };

        if old_state == new_state {
            return Ok(());
        }

        self.stop_state_timer();

        debug!(owner = %self.owner, from = %old_state, to = %new_state, "change_state");

        let leave = StateEvent::new(StateEvent::LEAVE, new_state.clone(), Some(old_state.clone()));
        dispatch_guarded(owner, leave.into_event(), &Args::new())?;

        *lock(&self.current) = Some(new_state.clone());

        let enter = StateEvent::new(StateEvent::ENTER, new_state.clone(), Some(old_state.clone()));
        dispatch_guarded(owner, enter.into_event(), &Args::new())?;

        if notify {
            let changed = StateEvent::new(
                StateEvent::STATE_CHANGE,
                new_state.clone(),
                Some(old_state.clone()),
            );
            self.dispatcher
                .notify(changed.into_event(), self.owner, Args::new())?;
        }

        if let Some(&duration) = self.timeouts.get(&new_state) {
            self.start_state_timer(new_state, old_state, duration)?;
        }

        Ok(())
    }

    /// Reset to the initial state and cancel any running timer. Does not
    /// dispatch Leave/Enter events.
    pub fn reset_state(&self) {
        self.stop_state_timer();
        *lock(&self.current) = Some(self.initial.clone());
    }

    fn start_state_timer(
        &self,
        new_state: String,
        old_state: String,
        duration: Duration,
    ) -> Result<(), RelayError> {
        let timeout = StateEvent::new(StateEvent::TIMEOUT, new_state, Some(old_state));
        let scheduled =
            self.dispatcher
                .schedule(duration, timeout.into_event(), self.owner, self.owner, Args::new())?;
        *lock(&self.timer) = Some(scheduled);
        Ok(())
    }

    /// Idempotent: cancelling an already-stopped (or never-started) timer is
    /// a no-op.
    fn stop_state_timer(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.cancel();
        }
    }
}
