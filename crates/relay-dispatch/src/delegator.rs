use relay_types::{Args, Event, RelayError, Value};
use tracing::debug;

use crate::delegate::{Delegate, HandlerFn};
use crate::dispatcher::EventHandler;

/// Pure handler-resolution algorithm, deterministic in `(delegate, event,
/// state)`.
///
/// Precedence:
/// 1. If a state is given: the state-specific handler, then the state's
///    default handler.
/// 2. If nothing matched yet (or no state was given): the event handler,
///    then the default handler.
pub struct Delegator;

impl Delegator {
    pub fn resolve<O>(delegate: &Delegate<O>, event: &str, state: Option<&str>) -> Option<HandlerFn<O>> {
        if let Some(state) = state {
            if let Some(handler) = delegate.state_handler(state, event) {
                return Some(handler);
            }
            if let Some(handler) = delegate.state_default(state) {
                return Some(handler);
            }
        }

        if let Some(handler) = delegate.event_handler(event) {
            return Some(handler);
        }

        delegate.default_handler()
    }

    pub fn has_handler<O>(delegate: &Delegate<O>, event: &str, state: Option<&str>) -> bool {
        Self::resolve(delegate, event, state).is_some()
    }
}

/// The one-line call an [`EventHandler::dispatch`] implementation is
/// expected to make: identify the event and current state, resolve a
/// handler via [`Delegator::resolve`], and invoke it. An event that resolves
/// to no handler is not an error — it is logged at `debug` and reported to
/// the caller as `Value::Unit`.
pub fn dispatch_with<O: EventHandler>(
    obj: &mut O,
    event: Event,
    args: &Args,
    delegate: &Delegate<O>,
) -> Result<Value, RelayError> {
    let event = obj.identify_event(event);
    let state = obj.identify_state(&event);

    match Delegator::resolve(delegate, event.id(), state.as_deref()) {
        Some(handler) => handler(obj, &event, args),
        None => {
            debug!(event = %event, state = ?state, "unhandled event");
            Ok(Value::Unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::{Args, Event, RelayError, Value};

    struct Counter {
        log: Vec<&'static str>,
    }

    fn in_stopped_on_start(o: &mut Counter, _e: &Event, _a: &Args) -> Result<Value, RelayError> {
        o.log.push("inStopped_onStart");
        Ok(Value::Unit)
    }

    fn in_stopped_on_default(o: &mut Counter, _e: &Event, _a: &Args) -> Result<Value, RelayError> {
        o.log.push("inStopped_onDefault");
        Ok(Value::Unit)
    }

    fn on_default(o: &mut Counter, _e: &Event, _a: &Args) -> Result<Value, RelayError> {
        o.log.push("onDefault");
        Ok(Value::Unit)
    }

    fn on_test(o: &mut Counter, _e: &Event, _a: &Args) -> Result<Value, RelayError> {
        o.log.push("onTest");
        Ok(Value::Unit)
    }

    fn delegate() -> Delegate<Counter> {
        Delegate::new()
            .on_state("Stopped", "Start", in_stopped_on_start)
            .on_state_default("Stopped", in_stopped_on_default)
            .on_default(on_default)
            .on("Test", on_test)
    }

    #[test]
    fn state_specific_handler_wins_over_everything_else() {
        let d = delegate();
        let h = Delegator::resolve(&d, "Start", Some("Stopped")).unwrap();
        let mut obj = Counter { log: Vec::new() };
        h(&mut obj, &Event::new("Start"), &Args::new()).unwrap();
        assert_eq!(obj.log, vec!["inStopped_onStart"]);
    }

    #[test]
    fn state_default_wins_over_event_and_global_default() {
        let d = delegate();
        let h = Delegator::resolve(&d, "Test", Some("Stopped")).unwrap();
        let mut obj = Counter { log: Vec::new() };
        h(&mut obj, &Event::new("Test"), &Args::new()).unwrap();
        assert_eq!(obj.log, vec!["inStopped_onDefault"]);
    }

    #[test]
    fn event_handler_used_when_no_state_given() {
        let d = delegate();
        let h = Delegator::resolve(&d, "Test", None).unwrap();
        let mut obj = Counter { log: Vec::new() };
        h(&mut obj, &Event::new("Test"), &Args::new()).unwrap();
        assert_eq!(obj.log, vec!["onTest"]);
    }

    #[test]
    fn global_default_used_when_nothing_else_matches() {
        let d = delegate();
        let h = Delegator::resolve(&d, "Unknown", Some("Running")).unwrap();
        let mut obj = Counter { log: Vec::new() };
        h(&mut obj, &Event::new("Unknown"), &Args::new()).unwrap();
        assert_eq!(obj.log, vec!["onDefault"]);
    }

    #[test]
    fn no_handler_resolves_to_none() {
        let d: Delegate<Counter> = Delegate::new();
        assert!(!Delegator::has_handler(&d, "Anything", None));
    }
}
