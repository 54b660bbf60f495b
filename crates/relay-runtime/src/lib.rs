mod context;
mod future;
mod future_mimic;
mod scheduled_future;
mod util;

pub use context::Context;
pub use future::{Future, Job};
pub use future_mimic::FutureMimic;
pub use scheduled_future::ScheduledFuture;
