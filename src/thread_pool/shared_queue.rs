use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error};

use super::ThreadPool;
use crate::{KvsError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool fed by one shared job queue.
///
/// The queue is a crossbeam MPMC [`channel`]: the pool is the only producer and every worker
/// thread is a consumer. A worker whose job panics is replaced by a fresh thread. Workers exit
/// once the pool is dropped and the queue has drained.
///
/// [`channel`]: https://docs.rs/crossbeam/0.8.1/crossbeam/channel/index.html
pub struct SharedQueueThreadPool {
    tx: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: u32) -> Result<Self> {
        if threads == 0 {
            return Err(KvsError::StringErr(
                "a thread pool needs at least one thread".to_string(),
            ));
        }
        let (tx, rx) = channel::unbounded::<Job>();
        for id in 0..threads {
            let worker = Worker { id, rx: rx.clone() };
            spawn_worker(worker)?;
        }
        debug!("created shared queue pool with {} threads", threads);
        Ok(SharedQueueThreadPool { tx })
    }

    /// Queues `job`; if every worker is gone the job is dropped and an error is logged.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            error!("no worker left in the pool, job dropped");
        }
    }
}

/// The receiving side of the queue owned by one worker thread.
///
/// Dropping it while the thread unwinds from a panicking job starts a replacement worker.
#[derive(Clone)]
struct Worker {
    id: u32,
    rx: Receiver<Job>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        if thread::panicking() {
            debug!(worker = self.id, "job panicked, restarting worker");
            if let Err(e) = spawn_worker(self.clone()) {
                error!("Failed to spawn a thread: {}", e);
            }
        }
    }
}

fn spawn_worker(worker: Worker) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("kvs-worker-{}", worker.id))
        .spawn(move || run_jobs(worker))?;
    Ok(())
}

// runs jobs until the pool's sender is dropped
fn run_jobs(worker: Worker) {
    while let Ok(job) = worker.rx.recv() {
        job();
    }
    debug!(worker = worker.id, "queue closed, worker exiting");
}
