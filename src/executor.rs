//! Strategies for running independent, indexed tasks.
//!
//! Every task is a pure function of its index and of shared, read-only
//! inputs. Results always come back in task index order, whichever order the
//! tasks finish in, so switching strategy never changes the output.

use crate::FxError;
use log::{debug, warn};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

/// Something which can run `num_tasks` indexed tasks and collect their
/// results in index order.
pub trait Executor: Sync {
    /// Run `task(0)..task(num_tasks)`, returning the results in index order.
    ///
    /// # Errors
    ///
    /// The first error from any task is returned and all other results are
    /// discarded.
    fn run_indexed<T, F>(&self, num_tasks: usize, task: F) -> Result<Vec<T>, FxError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, FxError> + Sync + Send;

    /// The number of tasks which may run at once.
    fn num_workers(&self) -> usize;
}

/// Run tasks on a bounded pool of worker threads.
pub struct PoolExecutor {
    pool: ThreadPool,
}

impl PoolExecutor {
    /// Build a pool of `num_workers` threads.
    ///
    /// # Errors
    ///
    /// Will return [`FxError::ThreadPool`] if the threads can't be spawned.
    pub fn new(num_workers: usize) -> Result<Self, FxError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|idx| format!("fx-worker-{idx}"))
            .build()?;
        Ok(Self { pool })
    }
}

impl Executor for PoolExecutor {
    fn run_indexed<T, F>(&self, num_tasks: usize, task: F) -> Result<Vec<T>, FxError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, FxError> + Sync + Send,
    {
        self.pool
            .install(|| (0..num_tasks).into_par_iter().map(&task).collect())
    }

    fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// Run tasks one after the other on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn run_indexed<T, F>(&self, num_tasks: usize, task: F) -> Result<Vec<T>, FxError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, FxError> + Sync + Send,
    {
        (0..num_tasks).map(task).collect()
    }

    fn num_workers(&self) -> usize {
        1
    }
}

/// The executor chosen by configuration.
pub enum AnyExecutor {
    /// a worker pool
    Pool(PoolExecutor),
    /// sequential execution
    Inline(InlineExecutor),
}

impl AnyExecutor {
    /// Choose an executor. When the pool is disabled, or can't be built, tasks
    /// run inline.
    pub fn from_config(disable_pool: bool, num_workers: usize) -> Self {
        if disable_pool {
            debug!("worker pool disabled, running inline");
            return AnyExecutor::Inline(InlineExecutor);
        }
        match PoolExecutor::new(num_workers) {
            Ok(pool) => AnyExecutor::Pool(pool),
            Err(err) => {
                warn!("{err}, falling back to running inline");
                AnyExecutor::Inline(InlineExecutor)
            }
        }
    }
}

impl Executor for AnyExecutor {
    fn run_indexed<T, F>(&self, num_tasks: usize, task: F) -> Result<Vec<T>, FxError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, FxError> + Sync + Send,
    {
        match self {
            AnyExecutor::Pool(pool) => pool.run_indexed(num_tasks, task),
            AnyExecutor::Inline(inline) => inline.run_indexed(num_tasks, task),
        }
    }

    fn num_workers(&self) -> usize {
        match self {
            AnyExecutor::Pool(pool) => pool.num_workers(),
            AnyExecutor::Inline(inline) => inline.num_workers(),
        }
    }
}
