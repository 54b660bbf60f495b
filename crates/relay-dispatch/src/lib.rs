mod delegate;
mod delegator;
mod dispatcher;
pub mod naming;
mod state;
mod util;

pub use delegate::{Delegate, HandlerFn};
pub use delegator::{dispatch_with, Delegator};
pub use dispatcher::{Dispatcher, EventHandler, Outcome};
pub use state::State;
