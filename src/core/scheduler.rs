use std::{
    sync::mpsc::{channel, Sender},
    thread::{self, JoinHandle, ThreadId},
};

use parking_lot::Mutex;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Execution contexts a [`Runtime`](crate::core::Runtime) dispatches onto.
///
/// The affinity context is where change notifications are delivered, so that
/// a surrounding observation or UI system sees them on the thread it
/// requires. Background jobs carry best-effort work such as deferred saves.
pub trait Scheduler: Send + Sync + 'static {
    /// Whether the calling thread is the affinity context.
    fn is_affinity(&self) -> bool;

    /// Queues `job` onto the affinity context.
    fn on_affinity(&self, job: Job);

    /// Queues `job` onto the background context.
    fn in_background(&self, job: Job);
}

/// Runs every job immediately on the calling thread.
///
/// Every thread counts as the affinity context, so notifications fire inline
/// and deferred saves complete before the mutating call returns. Intended
/// for deterministic single-threaded tests.
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn is_affinity(&self) -> bool {
        true
    }
    fn on_affinity(&self, job: Job) {
        job();
    }
    fn in_background(&self, job: Job) {
        job();
    }
}

/// A dedicated affinity thread and a background worker thread.
///
/// Jobs queued onto either context run in queue order on that context's
/// thread. Dropping the scheduler stops both threads after draining their
/// queues.
pub struct ThreadScheduler {
    affinity: Worker,
    background: Worker,
}

impl ThreadScheduler {
    pub fn spawn() -> Self {
        Self {
            affinity: Worker::spawn("sharemut-affinity"),
            background: Worker::spawn("sharemut-background"),
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn is_affinity(&self) -> bool {
        thread::current().id() == self.affinity.thread_id
    }
    fn on_affinity(&self, job: Job) {
        self.affinity.push(job);
    }
    fn in_background(&self, job: Job) {
        self.background.push(job);
    }
}

struct Worker {
    sender: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl Worker {
    fn spawn(name: &str) -> Self {
        let (sender, receiver) = channel::<Job>();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
            })
            .expect("failed to spawn scheduler thread");
        let thread_id = handle.thread().id();
        Worker {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            thread_id,
        }
    }

    fn push(&self, job: Job) {
        // Jobs sent after shutdown are dropped.
        if let Some(sender) = &*self.sender.lock() {
            let _ = sender.send(job);
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        *self.sender.get_mut() = None;
        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = self.handle.get_mut().take() {
            let _ = handle.join();
        }
    }
}
