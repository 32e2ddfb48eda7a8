mod observe;
mod runtime;
mod scheduler;

pub use observe::{AccessObserver, IssueSink, LogSink, NullObserver};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scheduler::{InlineScheduler, Job, Scheduler, ThreadScheduler};
