use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_runtime::{Context, Future, FutureMimic, ScheduledFuture};
use relay_types::{Args, Event, NodeId, NodeIdGenerator, RelayError, Value};
use tracing::{debug, trace};

use crate::util::{lock, panic_message};

/// Implemented by application objects registered with a [`Dispatcher`].
///
/// `identify_event`/`identify_state` are consulted by [`crate::dispatch_with`]
/// before resolving a handler; their defaults (pass the event through
/// unchanged, report no state) are right for any object that is not itself a
/// state machine. `dispatch` is the single entry point the dispatcher calls
/// on every delivery; application impls are expected to be a one-line call
/// into [`crate::dispatch_with`] with the type's own [`crate::Delegate`].
pub trait EventHandler: Send {
    fn identify_event(&self, event: Event) -> Event {
        event
    }

    fn identify_state(&self, _event: &Event) -> Option<String> {
        None
    }

    fn dispatch(&mut self, event: Event, args: &Args) -> Result<Value, RelayError>;
}

struct Node {
    owner: Arc<Mutex<dyn EventHandler>>,
    #[allow(dead_code)]
    parent: Option<NodeId>,
    context: Context,
    listeners: HashSet<NodeId>,
}

/// The result of [`Dispatcher::send`]: either the handler already ran
/// (same-context, synchronous) or it was queued onto the destination's
/// context and will run later.
pub enum Outcome {
    Mimic(FutureMimic<Value>),
    Queued(Future<Value>),
}

impl Outcome {
    /// Block until the result is available either way.
    pub fn retrieve(self) -> Result<Option<Value>, RelayError> {
        match self {
            Outcome::Mimic(mimic) => Ok(Some(mimic.retrieve())),
            Outcome::Queued(future) => future.retrieve(),
        }
    }
}

/// Registry of registered objects ("Nodes"), owning routing between them.
///
/// Explicitly injected (usually behind an `Arc<Dispatcher>`) rather than a
/// global/static singleton, so every component that routes events takes one
/// as a constructor argument.
pub struct Dispatcher {
    nodes: Mutex<HashMap<NodeId, Node>>,
    ids: NodeIdGenerator,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            ids: NodeIdGenerator::new(),
        }
    }

    /// Register `owner`. If `context` is omitted, it is inherited from
    /// `parent`'s Node; if neither is available, errors with
    /// `MissingContext`.
    pub fn add(
        &self,
        owner: Arc<Mutex<dyn EventHandler>>,
        parent: Option<NodeId>,
        context: Option<Context>,
    ) -> Result<NodeId, RelayError> {
        let mut nodes = lock(&self.nodes);

        let context = match (context, parent) {
            (Some(context), _) => context,
            (None, Some(parent_id)) => {
                nodes
                    .get(&parent_id)
                    .ok_or(RelayError::UnknownNode(parent_id))?
                    .context
                    .clone()
            }
            (None, None) => {
                let id = self.ids.next();
                return Err(RelayError::MissingContext(id));
            }
        };

        let id = self.ids.next();
        debug!(node = %id, "add");
        nodes.insert(
            id,
            Node {
                owner,
                parent,
                context,
                listeners: HashSet::new(),
            },
        );
        Ok(id)
    }

    /// Unregister `id`, scrubbing it out of every remaining Node's listener
    /// set.
    pub fn remove(&self, id: NodeId) -> Result<(), RelayError> {
        let mut nodes = lock(&self.nodes);
        nodes.remove(&id).ok_or(RelayError::UnknownNode(id))?;
        for node in nodes.values_mut() {
            node.listeners.remove(&id);
        }
        debug!(node = %id, "remove");
        Ok(())
    }

    pub fn add_listener(&self, src: NodeId, dst: NodeId) -> Result<(), RelayError> {
        let mut nodes = lock(&self.nodes);
        if !nodes.contains_key(&dst) {
            return Err(RelayError::UnknownNode(dst));
        }
        nodes
            .get_mut(&src)
            .ok_or(RelayError::UnknownNode(src))?
            .listeners
            .insert(dst);
        Ok(())
    }

    pub fn remove_listener(&self, src: NodeId, dst: NodeId) -> Result<(), RelayError> {
        let mut nodes = lock(&self.nodes);
        nodes
            .get_mut(&src)
            .ok_or(RelayError::UnknownNode(src))?
            .listeners
            .remove(&dst);
        Ok(())
    }

    /// Route `event` from `src` to `dst`: synchronous and inline if they
    /// share a context, otherwise queued onto `dst`'s context.
    pub fn send(
        &self,
        event: Event,
        src: NodeId,
        dst: NodeId,
        args: Args,
    ) -> Result<Outcome, RelayError> {
        let (dst_owner, dst_context, same_context) = {
            let nodes = lock(&self.nodes);
            let src_context = nodes.get(&src).ok_or(RelayError::UnknownNode(src))?.context.clone();
            let dst_node = nodes.get(&dst).ok_or(RelayError::UnknownNode(dst))?;
            (
                Arc::clone(&dst_node.owner),
                dst_node.context.clone(),
                src_context == dst_node.context,
            )
        };

        if same_context {
            trace!(%src, %dst, event = %event, "send (same context)");
            let value = Self::invoke(&dst_owner, event, args)?;
            Ok(Outcome::Mimic(FutureMimic::new(value)))
        } else {
            trace!(%src, %dst, event = %event, "send (queued)");
            let future = dst_context.queue(move || Self::invoke(&dst_owner, event, args));
            Ok(Outcome::Queued(future))
        }
    }

    /// Always queued onto `dst`'s context, regardless of whether `src` and
    /// `dst` share one.
    pub fn queue(
        &self,
        event: Event,
        src: NodeId,
        dst: NodeId,
        args: Args,
    ) -> Result<Future<Value>, RelayError> {
        let (dst_owner, dst_context) = self.resolve_dst(src, dst)?;
        Ok(dst_context.queue(move || Self::invoke(&dst_owner, event, args)))
    }

    /// Schedule `event` to be delivered to `dst` after `delay`.
    pub fn schedule(
        &self,
        delay: Duration,
        event: Event,
        src: NodeId,
        dst: NodeId,
        args: Args,
    ) -> Result<ScheduledFuture<Value>, RelayError> {
        let (dst_owner, dst_context) = self.resolve_dst(src, dst)?;
        Ok(dst_context.schedule(delay, move || Self::invoke(&dst_owner, event, args)))
    }

    /// Fan out `event` to every listener registered on `src`. Each delivery
    /// is queued, never synchronous.
    pub fn notify(&self, event: Event, src: NodeId, args: Args) -> Result<Vec<Future<Value>>, RelayError> {
        let listeners: Vec<NodeId> = {
            let nodes = lock(&self.nodes);
            nodes
                .get(&src)
                .ok_or(RelayError::UnknownNode(src))?
                .listeners
                .iter()
                .copied()
                .collect()
        };

        listeners
            .into_iter()
            .map(|dst| self.queue(event.clone(), src, dst, args.clone()))
            .collect()
    }

    fn resolve_dst(&self, src: NodeId, dst: NodeId) -> Result<(Arc<Mutex<dyn EventHandler>>, Context), RelayError> {
        let nodes = lock(&self.nodes);
        if !nodes.contains_key(&src) {
            return Err(RelayError::UnknownNode(src));
        }
        let dst_node = nodes.get(&dst).ok_or(RelayError::UnknownNode(dst))?;
        Ok((Arc::clone(&dst_node.owner), dst_node.context.clone()))
    }

    fn invoke(owner: &Arc<Mutex<dyn EventHandler>>, event: Event, args: Args) -> Result<Value, RelayError> {
        let mut guard = lock(owner);
        dispatch_guarded(&mut *guard, event, &args)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Call `owner.dispatch(event, args)`, capturing a handler panic into
/// `RelayError::HandlerFailed` instead of letting it unwind across the
/// caller.
///
/// Exposed so callers that already hold `owner` locked or mutably borrowed
/// — notably [`crate::State::change_state`], dispatching a synthetic
/// Leave/Enter event to the very object whose handler is currently
/// running — can invoke the same panic-safe path directly instead of going
/// back through [`Dispatcher::send`], which would try to lock the owner's
/// mutex a second time on the same thread and deadlock.
pub(crate) fn dispatch_guarded(
    owner: &mut dyn EventHandler,
    event: Event,
    args: &Args,
) -> Result<Value, RelayError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| owner.dispatch(event, args)));

    match outcome {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(&panic);
            debug!(message, "handler panicked");
            Err(RelayError::handler_failed(message))
        }
    }
}
