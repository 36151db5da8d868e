//! Single-threaded completion context.
//!
//! # Design
//! Transports finish on arbitrary threads. Every success and failure
//! callback is funneled through one dedicated thread so callers can touch
//! their own state from inside a callback without locking. A panicking
//! callback is caught and logged; the thread keeps serving later calls.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

/// Name of the thread every callback runs on.
pub const COMPLETION_THREAD_NAME: &str = "retriever-completion";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the completion thread. Clones share the same thread, which
/// exits once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct CompletionQueue {
    sender: mpsc::Sender<Job>,
}

impl CompletionQueue {
    pub fn start() -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name(COMPLETION_THREAD_NAME.to_string())
            .spawn(move || {
                for job in receiver {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!("completion callback panicked");
                    }
                }
                tracing::debug!("completion queue drained, thread exiting");
            })?;
        Ok(Self { sender })
    }

    /// Queue `job` to run on the completion thread.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        if let Err(mpsc::SendError(job)) = self.sender.send(Box::new(job)) {
            tracing::warn!("completion thread is gone, running callback inline");
            job();
        }
    }
}
