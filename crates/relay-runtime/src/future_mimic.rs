/// Non-blocking stand-in for [`crate::Future`], returned when the dispatcher
/// executed a handler synchronously and already has a result in hand.
///
/// Exposes the same retrieval contract so callers can treat same-context and
/// cross-context dispatch uniformly; does not support cancellation.
#[derive(Clone, Debug)]
pub struct FutureMimic<T> {
    result: T,
}

impl<T: Clone> FutureMimic<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }

    pub fn retrieve(&self) -> T {
        self.result.clone()
    }
}
