use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle identifying an object registered with the dispatcher.
///
/// Routing operations take `NodeId`s explicitly instead of inferring a
/// caller by walking the stack.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic generator for `NodeId`s, shared by a `Dispatcher`.
#[derive(Debug, Default)]
pub struct NodeIdGenerator(AtomicU64);

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next(&self) -> NodeId {
        NodeId::from_raw(self.0.fetch_add(1, Ordering::Relaxed))
    }
}
