use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use relay_dispatch::{dispatch_with, Delegate, Dispatcher, EventHandler, Outcome, State};
use relay_runtime::Context;
use relay_types::{Args, Event, RelayError, StateEvent, Value};

struct Echo {
    received: Vec<String>,
}

fn delegate() -> &'static Delegate<Echo> {
    static DELEGATE: OnceLock<Delegate<Echo>> = OnceLock::new();
    DELEGATE.get_or_init(|| {
        Delegate::new().on_default(|o: &mut Echo, e, _a| {
            o.received.push(e.id().to_string());
            Ok(Value::Text(e.id().to_string()))
        })
    })
}

impl EventHandler for Echo {
    fn dispatch(&mut self, event: Event, args: &Args) -> Result<Value, RelayError> {
        dispatch_with(self, event, args, delegate())
    }
}

#[test_log::test]
fn same_context_send_is_synchronous() {
    let ctx = Context::new("shared");
    let dispatcher = Dispatcher::new();

    let sender = Arc::new(Mutex::new(Echo { received: Vec::new() }));
    let receiver = Arc::new(Mutex::new(Echo { received: Vec::new() }));

    let src = dispatcher
        .add(sender as Arc<Mutex<dyn EventHandler>>, None, Some(ctx.clone()))
        .unwrap();
    let dst = dispatcher
        .add(receiver.clone() as Arc<Mutex<dyn EventHandler>>, None, Some(ctx))
        .unwrap();

    let outcome = dispatcher
        .send(Event::new("Ping"), src, dst, Args::new())
        .unwrap();

    assert!(matches!(&outcome, Outcome::Mimic(_)));
    assert_eq!(outcome.retrieve().unwrap(), Some(Value::Text("Ping".into())));
    assert_eq!(receiver.lock().unwrap().received, vec!["Ping".to_string()]);
}

#[test_log::test]
fn cross_context_send_is_queued_and_runs_on_the_receivers_worker() {
    let ctx_a = Context::new("a");
    let ctx_b = Context::new("b");
    ctx_b.start();
    let dispatcher = Dispatcher::new();

    let sender = Arc::new(Mutex::new(Echo { received: Vec::new() }));
    let receiver = Arc::new(Mutex::new(Echo { received: Vec::new() }));

    let src = dispatcher
        .add(sender as Arc<Mutex<dyn EventHandler>>, None, Some(ctx_a))
        .unwrap();
    let dst = dispatcher
        .add(receiver.clone() as Arc<Mutex<dyn EventHandler>>, None, Some(ctx_b.clone()))
        .unwrap();

    let outcome = dispatcher
        .send(Event::new("Pong"), src, dst, Args::new())
        .unwrap();

    assert!(matches!(&outcome, Outcome::Queued(_)));
    assert_eq!(outcome.retrieve().unwrap(), Some(Value::Text("Pong".into())));
    assert_eq!(receiver.lock().unwrap().received, vec!["Pong".to_string()]);

    ctx_b.stop(Some(Duration::from_secs(1)));
}

#[test_log::test]
fn notify_fans_out_to_every_listener() {
    let ctx = Context::new("fanout");
    ctx.start();
    let dispatcher = Dispatcher::new();

    let publisher = Arc::new(Mutex::new(Echo { received: Vec::new() }));
    let a = Arc::new(Mutex::new(Echo { received: Vec::new() }));
    let b = Arc::new(Mutex::new(Echo { received: Vec::new() }));

    let src = dispatcher
        .add(publisher as Arc<Mutex<dyn EventHandler>>, None, Some(ctx.clone()))
        .unwrap();
    let a_id = dispatcher
        .add(a.clone() as Arc<Mutex<dyn EventHandler>>, None, Some(ctx.clone()))
        .unwrap();
    let b_id = dispatcher
        .add(b.clone() as Arc<Mutex<dyn EventHandler>>, None, Some(ctx))
        .unwrap();

    dispatcher.add_listener(src, a_id).unwrap();
    dispatcher.add_listener(src, b_id).unwrap();

    let futures = dispatcher.notify(Event::new("Tick"), src, Args::new()).unwrap();
    assert_eq!(futures.len(), 2);
    for f in futures {
        f.retrieve().unwrap();
    }

    assert_eq!(a.lock().unwrap().received, vec!["Tick".to_string()]);
    assert_eq!(b.lock().unwrap().received, vec!["Tick".to_string()]);
}

#[test_log::test]
fn remove_scrubs_listener_memberships() {
    let ctx = Context::new("scrub");
    let dispatcher = Dispatcher::new();

    let publisher = Arc::new(Mutex::new(Echo { received: Vec::new() }));
    let listener = Arc::new(Mutex::new(Echo { received: Vec::new() }));

    let src = dispatcher
        .add(publisher as Arc<Mutex<dyn EventHandler>>, None, Some(ctx.clone()))
        .unwrap();
    let dst = dispatcher
        .add(listener as Arc<Mutex<dyn EventHandler>>, None, Some(ctx))
        .unwrap();

    dispatcher.add_listener(src, dst).unwrap();
    dispatcher.remove(dst).unwrap();

    // dst no longer exists as a listener; notifying src must not error even
    // though the removed id is still (harmlessly) reachable only via src's
    // own bookkeeping, which remove() scrubbed.
    let futures = dispatcher.notify(Event::new("Tick"), src, Args::new()).unwrap();
    assert!(futures.is_empty());
}

struct Light {
    state: Option<Arc<State>>,
    transitions: Vec<(String, String)>,
}

fn light_delegate() -> &'static Delegate<Light> {
    static DELEGATE: OnceLock<Delegate<Light>> = OnceLock::new();
    DELEGATE.get_or_init(|| {
        Delegate::new()
            .on(StateEvent::ENTER, |o: &mut Light, e, _a| {
                let new = e
                    .transition()
                    .map(|t| t.new_state.clone())
                    .unwrap_or_default();
                let old = e
                    .transition()
                    .and_then(|t| t.old_state.clone())
                    .unwrap_or_default();
                o.transitions.push((old, new));
                Ok(Value::Unit)
            })
            .on(StateEvent::TIMEOUT, |o: &mut Light, _e, _a| {
                if let Some(state) = o.state.clone() {
                    state.change_state(o, "Stopped", true)?;
                }
                Ok(Value::Unit)
            })
    })
}

impl EventHandler for Light {
    fn identify_state(&self, event: &Event) -> Option<String> {
        self.state.as_ref().and_then(|s| s.identify_state(event))
    }

    fn dispatch(&mut self, event: Event, args: &Args) -> Result<Value, RelayError> {
        dispatch_with(self, event, args, light_delegate())
    }
}

#[test_log::test]
fn state_fsm_runs_stopped_started_paused_stopped_with_a_timeout() {
    let ctx = Context::new("fsm");
    ctx.start();
    let dispatcher = Arc::new(Dispatcher::new());

    let light = Arc::new(Mutex::new(Light {
        state: None,
        transitions: Vec::new(),
    }));
    let id = dispatcher
        .add(light.clone() as Arc<Mutex<dyn EventHandler>>, None, Some(ctx.clone()))
        .unwrap();

    let mut timeouts = HashMap::new();
    timeouts.insert("Paused".to_string(), Duration::from_millis(30));
    let state = Arc::new(State::new(dispatcher.clone(), id, "Stopped", timeouts).unwrap());
    light.lock().unwrap().state = Some(state.clone());

    state
        .change_state(&mut *light.lock().unwrap(), "Started", false)
        .unwrap();
    state
        .change_state(&mut *light.lock().unwrap(), "Paused", false)
        .unwrap();

    // The Paused timeout handler calls state.change_state("Stopped", ..)
    // itself; give the worker time to run it.
    std::thread::sleep(Duration::from_millis(200));

    assert_eq!(state.current(), Some("Stopped".to_string()));
    assert_eq!(
        light.lock().unwrap().transitions,
        vec![
            ("Stopped".to_string(), "Started".to_string()),
            ("Started".to_string(), "Paused".to_string()),
            ("Paused".to_string(), "Stopped".to_string()),
        ]
    );

    ctx.stop(Some(Duration::from_secs(1)));
}
