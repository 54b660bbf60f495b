use std::collections::HashMap;

use relay_types::{Args, Event, RelayError, Value};

/// A handler function for an application type `O`.
///
/// A plain `fn` pointer rather than a boxed closure: `Delegate::resolve`
/// needs to hand the caller a handler it can invoke with `&mut O` after
/// releasing any borrow of the delegate itself, and `fn` pointers are `Copy`,
/// so there is nothing to fight the borrow checker over.
pub type HandlerFn<O> = fn(&mut O, &Event, &Args) -> Result<Value, RelayError>;

/// A per-type table of handler functions, built once via the builder methods
/// below and consulted by [`crate::Delegator::resolve`] on every dispatch.
///
/// Replaces the reflective `getattr(obj, f"in{state}_on{event}")` lookup this
/// design is drawn from with an explicit table populated at construction —
/// typically behind a `std::sync::OnceLock` so it is built exactly once per
/// type, not per instance.
pub struct Delegate<O> {
    state_handlers: HashMap<(String, String), HandlerFn<O>>,
    state_defaults: HashMap<String, HandlerFn<O>>,
    event_handlers: HashMap<String, HandlerFn<O>>,
    default_handler: Option<HandlerFn<O>>,
}

impl<O> Delegate<O> {
    pub fn new() -> Self {
        Self {
            state_handlers: HashMap::new(),
            state_defaults: HashMap::new(),
            event_handlers: HashMap::new(),
            default_handler: None,
        }
    }

    /// Register a handler for `event` while in `state` — the equivalent of
    /// naming a method `in{state}_on{event}`.
    pub fn on_state(
        mut self,
        state: impl Into<String>,
        event: impl Into<String>,
        handler: HandlerFn<O>,
    ) -> Self {
        self.state_handlers
            .insert((state.into(), event.into()), handler);
        self
    }

    /// Register the fallback handler for any event while in `state` — the
    /// equivalent of naming a method `in{state}_onDefault`.
    pub fn on_state_default(mut self, state: impl Into<String>, handler: HandlerFn<O>) -> Self {
        self.state_defaults.insert(state.into(), handler);
        self
    }

    /// Register a state-independent handler for `event` — the equivalent of
    /// naming a method `on{event}`.
    pub fn on(mut self, event: impl Into<String>, handler: HandlerFn<O>) -> Self {
        self.event_handlers.insert(event.into(), handler);
        self
    }

    /// Register the state-independent fallback handler — the equivalent of
    /// naming a method `onDefault`.
    pub fn on_default(mut self, handler: HandlerFn<O>) -> Self {
        self.default_handler = Some(handler);
        self
    }

    pub(crate) fn state_handler(&self, state: &str, event: &str) -> Option<HandlerFn<O>> {
        self.state_handlers
            .get(&(state.to_string(), event.to_string()))
            .copied()
    }

    pub(crate) fn state_default(&self, state: &str) -> Option<HandlerFn<O>> {
        self.state_defaults.get(state).copied()
    }

    pub(crate) fn event_handler(&self, event: &str) -> Option<HandlerFn<O>> {
        self.event_handlers.get(event).copied()
    }

    pub(crate) fn default_handler(&self) -> Option<HandlerFn<O>> {
        self.default_handler
    }
}

impl<O> Default for Delegate<O> {
    fn default() -> Self {
        Self::new()
    }
}
