pub mod error;
pub mod event;
pub mod node_id;
pub mod value;

pub use error::RelayError;
pub use event::{Event, StateEvent, Transition};
pub use node_id::{NodeId, NodeIdGenerator};
pub use value::{Args, Value};
