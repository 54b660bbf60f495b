//! Documentation-only module.
//!
//! The handler-resolution precedence implemented by [`crate::Delegator`] is
//! modeled on a reflective naming convention that is *not* used at runtime
//! here; authors building a [`crate::Delegate`] are encouraged to keep
//! naming their handler functions the same way for readability, so the
//! registered table stays self-describing:
//!
//! - `in{state}_on{event}` — handler for `event` while in `state`.
//! - `in{state}_onDefault` — fallback handler for any event while in `state`.
//! - `on{event}` — state-independent handler for `event`.
//! - `onDefault` — state-independent fallback handler.
//!
//! For example, a handler meant to run only `on Start` while in the
//! `Stopped` state would be named `in_stopped_on_start` and registered with
//! `Delegate::on_state("Stopped", "Start", in_stopped_on_start)`.
