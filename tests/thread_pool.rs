use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::sync::WaitGroup;
use kvstores::thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};
use kvstores::{CommandExecutor, KvStore, Request, Result, Status, Target};

fn spawn_counter<P: ThreadPool>(pool: P) -> Result<()> {
    const TASK_NUM: usize = 20;
    const ADD_COUNT: usize = 1000;

    let wg = WaitGroup::new();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..TASK_NUM {
        let counter = Arc::clone(&counter);
        let wg = wg.clone();
        pool.spawn(move || {
            for _ in 0..ADD_COUNT {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            drop(wg);
        })
    }

    wg.wait();
    assert_eq!(counter.load(Ordering::SeqCst), TASK_NUM * ADD_COUNT);
    Ok(())
}

#[test]
fn shared_queue_thread_pool_spawn_counter() -> Result<()> {
    let pool = SharedQueueThreadPool::new(4)?;
    spawn_counter(pool)
}

#[test]
fn rayon_thread_pool_spawn_counter() -> Result<()> {
    let pool = RayonThreadPool::new(4)?;
    spawn_counter(pool)
}

#[test]
fn shared_queue_thread_pool_panic_task() -> Result<()> {
    const TASK_NUM: usize = 20;

    let pool = SharedQueueThreadPool::new(4)?;
    for _ in 0..TASK_NUM {
        pool.spawn(move || {
            // It suppresses flood of panic messages to the console.
            panic_control::disable_hook_in_current_thread();
            panic!();
        })
    }
    // the panicked workers were replaced, so the pool still runs jobs
    spawn_counter(pool)
}

fn executor_keeps_submission_order<P: ThreadPool>(pool: P) {
    let executor = CommandExecutor::new(KvStore::with_capacity(100).unwrap(), pool);
    let requests: Vec<Request> = (0..100)
        .map(|i| Request::new("HSET", format!("k{}", i)).value(i.to_string()))
        .collect();
    let responses = executor.execute_all(requests);
    assert_eq!(responses.len(), 100);
    assert!(responses.iter().all(|r| r.status == Status::Ok));

    let gets: Vec<Request> = (0..100).map(|i| Request::new("HGET", format!("k{}", i))).collect();
    for (i, response) in executor.execute_all(gets).into_iter().enumerate() {
        assert_eq!(response.value, Some(i.to_string()));
    }
    assert_eq!(executor.store().stats_for(Target::Hash).remaining, 0);
}

#[test]
fn executor_on_shared_queue_pool() {
    executor_keeps_submission_order(SharedQueueThreadPool::new(4).unwrap());
}

#[test]
fn executor_on_rayon_pool() {
    executor_keeps_submission_order(RayonThreadPool::new(4).unwrap());
}

#[test]
fn executor_reports_capacity_races() {
    let executor = CommandExecutor::new(
        KvStore::with_capacity(10).unwrap(),
        SharedQueueThreadPool::new(8).unwrap(),
    );
    let requests = (0..40).map(|i| Request::new("RSET", format!("k{}", i)).value("v"));
    let responses = executor.execute_all(requests);
    let ok = responses.iter().filter(|r| r.status == Status::Ok).count();
    let full = responses.iter().filter(|r| r.status == Status::Full).count();
    assert_eq!((ok, full), (10, 30));
}

#[test]
fn pools_reject_zero_threads() {
    assert!(SharedQueueThreadPool::new(0).is_err());
    assert!(RayonThreadPool::new(0).is_err());
}

#[test]
fn executor_serves_every_structure() -> Result<()> {
    let executor = CommandExecutor::new(KvStore::with_capacity(8)?, SharedQueueThreadPool::new(4)?);
    let responses = executor.execute_all(vec![
        Request::new("SET", "a").value("1"),
        Request::new("HSET", "b").value("2"),
        Request::new("RSET", "c").value("3"),
    ]);
    assert!(responses.iter().all(|r| r.is_ok()));

    let stats = executor.store().stats();
    for target in Target::ALL.iter() {
        assert_eq!(stats.get(*target).count, 1);
    }
    Ok(())
}
