use super::ThreadPool;
use crate::{KvsError, Result};
use tracing::debug;

/// A thread pool that uses a work stealing strategy as implemented by the [`Rayon`] library.
///
/// [`Rayon`]: https://docs.rs/rayon/latest/rayon/index.html
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self> {
        // rayon treats 0 as its own default thread count
        if threads == 0 {
            return Err(KvsError::StringErr(
                "a thread pool needs at least one thread".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|idx| format!("kvs-rayon-{}", idx))
            .build()
            .map_err(|e| KvsError::StringErr(format!("could not build thread pool: {:?}", &e)))?;
        debug!("created rayon pool with {} threads", threads);

        Ok(Self { pool })
    }

    /// Jobs are spawned without blocking the caller.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}
