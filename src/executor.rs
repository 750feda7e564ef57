use crossbeam::channel::{self, Receiver};
use tracing::{debug, error};

use crate::command::{Request, Response, Status};
use crate::thread_pool::ThreadPool;
use crate::KvStore;

/// Runs [`Request`]s concurrently against a [`KvStore`].
///
/// Each submitted request becomes one job on the [`ThreadPool`]. The job receives its own handle
/// to the store and sends the [`Response`] back over a one-shot channel.
pub struct CommandExecutor<P: ThreadPool> {
    store: KvStore,
    pool: P,
}

impl<P: ThreadPool> CommandExecutor<P> {
    /// Create a new `CommandExecutor` using the given store and [`ThreadPool`] implementation.
    pub fn new(store: KvStore, pool: P) -> Self {
        CommandExecutor { store, pool }
    }

    /// the store requests are executed against
    pub fn store(&self) -> &KvStore {
        &self.store
    }

    /// Queues `req` on the pool and returns the channel its [`Response`] will arrive on.
    ///
    /// The channel disconnects without a message if the job panicked.
    pub fn submit(&self, req: Request) -> Receiver<Response> {
        let (tx, rx) = channel::bounded(1);
        let store = self.store.clone();
        self.pool.spawn(move || {
            let response = store.execute(&req);
            if tx.send(response).is_err() {
                debug!("caller stopped waiting for {:?}", req);
            }
        });
        rx
    }

    /// Runs every request concurrently and returns the responses in submission order.
    ///
    /// Requests on the same structure are serialized by that structure's lock, in whatever order
    /// the workers reach it.
    pub fn execute_all(&self, reqs: impl IntoIterator<Item = Request>) -> Vec<Response> {
        let pending: Vec<Receiver<Response>> = reqs.into_iter().map(|req| self.submit(req)).collect();
        pending
            .into_iter()
            .map(|rx| {
                rx.recv().unwrap_or_else(|_| {
                    error!("worker dropped a request");
                    Response::new(Status::Error, "request was not executed")
                })
            })
            .collect()
    }
}
