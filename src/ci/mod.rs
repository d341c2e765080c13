//! CI build watching: run discovery, status polling and the deduplicated
//! build queue.

mod job;
mod result;
mod waiter;
mod watch;

pub use job::{
    BuildJob, DEFAULT_MAX_LOG_CHARS, DEFAULT_PER_PAGE, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT,
    WatchOptions,
};
pub use result::{Conclusion, WorkflowResult};
pub use waiter::{BuildFuture, BuildWaiter};
pub use watch::{select_run, watch_build};
