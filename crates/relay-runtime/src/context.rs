use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use relay_types::RelayError;
use tracing::{debug, info};

use crate::future::{Future, Job};
use crate::scheduled_future::ScheduledFuture;
use crate::util::lock;

enum Item {
    Job(Box<dyn Job>),
    Terminate,
}

struct Inner {
    name: String,
    sender: Sender<Item>,
    receiver: Mutex<Option<Receiver<Item>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    done: Arc<(Mutex<bool>, Condvar)>,
}

/// A serial event loop: an unbounded FIFO of pending jobs drained by one
/// worker thread, one item at a time.
///
/// Cloning a `Context` shares the same queue and worker; this is how
/// multiple producers enqueue onto a single consumer.
#[derive(Clone)]
pub struct Context(Arc<Inner>);

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self(Arc::new(Inner {
            name: name.into(),
            sender,
            receiver: Mutex::new(Some(receiver)),
            worker: Mutex::new(None),
            done: Arc::new((Mutex::new(false), Condvar::new())),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Wrap `job` in a [`Future`] and append it to the FIFO, returning a
    /// handle the caller can retrieve from or cancel.
    pub fn queue<T: Send + 'static>(
        &self,
        job: impl FnOnce() -> Result<T, RelayError> + Send + 'static,
    ) -> Future<T> {
        let future = Future::new(job);
        debug!(context = %self.0.name, "queue");
        let _ = self.0.sender.send(Item::Job(Box::new(future.clone())));
        future
    }

    /// Build a [`ScheduledFuture`] whose scheduling closure re-appends it to
    /// this context's FIFO once its timer fires.
    pub fn schedule<T: Send + 'static>(
        &self,
        delay: Duration,
        job: impl FnOnce() -> Result<T, RelayError> + Send + 'static,
    ) -> ScheduledFuture<T> {
        debug!(context = %self.0.name, ?delay, "schedule");
        let sender = self.0.sender.clone();
        ScheduledFuture::new(
            delay,
            move |sf| {
                let _ = sender.send(Item::Job(Box::new(sf)));
            },
            job,
        )
    }

    /// Spawn the worker thread that drains the FIFO via [`Context::run`].
    ///
    /// Takes ownership of the receiver, so `start()` and `poll()` are
    /// mutually exclusive — only one draining mode can own the queue at a
    /// time.
    pub fn start(&self) {
        let Some(receiver) = lock(&self.0.receiver).take() else {
            debug!(context = %self.0.name, "start called with no receiver available, ignoring");
            return;
        };

        debug!(context = %self.0.name, "start");
        let inner = Arc::clone(&self.0);
        let handle = thread::Builder::new()
            .name(self.0.name.clone())
            .spawn(move || Self::run_loop(&inner, receiver))
            .expect("failed to spawn context worker thread");
        *lock(&self.0.worker) = Some(handle);
    }

    fn run_loop(inner: &Inner, receiver: Receiver<Item>) {
        for item in receiver.iter() {
            match item {
                Item::Job(job) => job.process(),
                Item::Terminate => break,
            }
        }
        info!(context = %inner.name, "worker terminated");
        let (done, condvar) = &*inner.done;
        *lock(done) = true;
        condvar.notify_all();
    }

    /// Non-blocking drain: process whatever is currently queued without a
    /// dedicated worker thread. Only has an effect if this context was never
    /// [`Context::start`]ed (or has since been [`Context::stop`]ped).
    pub fn poll(&self) {
        let guard = lock(&self.0.receiver);
        let Some(receiver) = guard.as_ref() else {
            return;
        };
        loop {
            match receiver.try_recv() {
                Ok(Item::Job(job)) => job.process(),
                Ok(Item::Terminate) => break,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Append the termination sentinel and wait for the worker to exit.
    ///
    /// Returns whether the worker signalled completion within `timeout`
    /// (`None` waits indefinitely). Anything enqueued after the sentinel is
    /// left in the channel, unprocessed, once the worker exits.
    pub fn stop(&self, timeout: Option<Duration>) -> bool {
        debug!(context = %self.0.name, "stop");
        let _ = self.0.sender.send(Item::Terminate);

        let (done, condvar) = &*self.0.done;
        let guard = lock(done);
        let finished = match timeout {
            Some(timeout) => {
                let (guard, result) = condvar
                    .wait_timeout_while(guard, timeout, |done| !*done)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let _ = guard;
                !result.timed_out()
            }
            None => {
                let guard = condvar
                    .wait_while(guard, |done| !*done)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *guard
            }
        };

        if let Some(handle) = lock(&self.0.worker).take() {
            let _ = handle.join();
        }

        finished
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Context {}
