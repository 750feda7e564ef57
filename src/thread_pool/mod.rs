//! Worker pools used by the [`CommandExecutor`](crate::CommandExecutor) to run commands
//! concurrently against a shared [`KvStore`](crate::KvStore).
use crate::Result;

/// A pool of threads that runs submitted jobs
pub trait ThreadPool: Send + Sync + 'static {
    /// creates a new pool with the given number of `threads`
    ///
    /// # Errors
    /// returns an error if `threads` is zero or the threads could not be started
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// queues `job` to run on one of the pool's threads
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

mod rayon_pool;
mod shared_queue;

pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
