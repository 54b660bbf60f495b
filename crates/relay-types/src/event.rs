use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A state transition carried by a [`StateEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub new_state: String,
    pub old_state: Option<String>,
}

/// A value carrying a symbolic identifier.
///
/// Equality is by identifier only; a `Transition` payload (present on events
/// built through [`Event::with_transition`] or [`StateEvent`]) is not part of
/// equality, matching the "composite state-event equality is unspecified and
/// not required" stance this type is drawn from.
#[derive(Clone, Debug)]
pub struct Event {
    id: Arc<str>,
    transition: Option<Transition>,
}

impl Event {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        let id = id.into();
        debug_assert!(!id.is_empty(), "event id must be non-empty");
        Self {
            id,
            transition: None,
        }
    }

    pub fn with_transition(
        id: impl Into<Arc<str>>,
        new_state: impl Into<String>,
        old_state: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            transition: Some(Transition {
                new_state: new_state.into(),
                old_state,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// An [`Event`] that also carries a state transition.
///
/// Models the distilled spec's "subtype of Event" relationship through
/// composition plus `Deref`, rather than inheritance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateEvent {
    event: Event,
}

impl StateEvent {
    pub const ENTER: &'static str = "Enter";
    pub const LEAVE: &'static str = "Leave";
    pub const TIMEOUT: &'static str = "Timeout";
    pub const STATE_CHANGE: &'static str = "StateChange";

    pub fn new(
        id: impl Into<Arc<str>>,
        new_state: impl Into<String>,
        old_state: Option<String>,
    ) -> Self {
        Self {
            event: Event::with_transition(id, new_state, old_state),
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn into_event(self) -> Event {
        self.event
    }

    pub fn new_state(&self) -> &str {
        &self
            .event
            .transition()
            .expect("StateEvent always carries a transition")
            .new_state
    }

    pub fn old_state(&self) -> Option<&str> {
        self.event
            .transition()
            .expect("StateEvent always carries a transition")
            .old_state
            .as_deref()
    }
}

impl Deref for StateEvent {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.event
    }
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (new: {}, old: {})",
            self.event.id(),
            self.new_state(),
            self.old_state().unwrap_or("-")
        )
    }
}
