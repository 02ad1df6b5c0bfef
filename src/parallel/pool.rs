use crossbeam::channel::{Receiver, Sender, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use thiserror::Error;

/// Failure to bring a pool up
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread {worker_id}: {source}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Shared cancellation flag observed by workers and the work they run
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Cloneable control handle for a running pool.
///
/// Both `join` and `terminate` drain the same set of thread handles, so
/// whichever runs first does the joining and later calls are no-ops.
#[derive(Clone)]
pub struct PoolHandle {
    cancel: CancelToken,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl PoolHandle {
    /// Wait for every worker to exit on its own
    pub fn join(&self) {
        let handles: Vec<_> = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            workers.drain(..).collect()
        };

        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::warn!("{name} panicked before shutting down");
            }
        }
    }

    /// Cancel in-flight work and wait for the workers to stop
    pub fn terminate(&self) {
        self.cancel.cancel();
        self.join();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<T, R, F> {
    work_rx: Receiver<T>,
    result_tx: Sender<R>,
    cancel: CancelToken,
    processor: Arc<F>,
}

/// Fixed-size pool draining a work queue into an unordered completion queue.
///
/// Completions arrive in finish order, not submission order.
pub struct WorkerPool<T, R> {
    work_tx: Option<Sender<T>>,
    result_rx: Receiver<R>,
    handle: PoolHandle,
    size: usize,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Spawn `size` named worker threads running `processor` on each submitted item.
    ///
    /// The processor returns `None` when it abandoned the item because of
    /// cancellation; nothing is emitted for that item.
    pub fn spawn<F>(size: usize, name: &str, processor: F) -> Result<Self, PoolError>
    where
        F: Fn(&T, &CancelToken) -> Option<R> + Send + Sync + 'static,
    {
        let (work_tx, work_rx) = unbounded::<T>();
        let (result_tx, result_rx) = unbounded::<R>();
        let cancel = CancelToken::new();
        let processor = Arc::new(processor);
        let mut workers = Vec::with_capacity(size);

        for worker_id in 0..size {
            let ctx = WorkerContext {
                work_rx: work_rx.clone(),
                result_tx: result_tx.clone(),
                cancel: cancel.clone(),
                processor: processor.clone(),
            };

            let spawned = std::thread::Builder::new()
                .name(format!("{name}-{worker_id}"))
                .spawn(move || worker_thread(ctx));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    // Closing the queue lets the threads that did start exit
                    cancel.cancel();
                    drop(work_tx);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn { worker_id, source });
                }
            }
        }

        tracing::debug!("Spawned {} {} worker(s)", size, name);

        Ok(Self {
            work_tx: Some(work_tx),
            result_rx,
            handle: PoolHandle {
                cancel,
                workers: Arc::new(Mutex::new(workers)),
            },
            size,
        })
    }

    /// Queue every item, then close the queue so idle workers shut down
    pub fn submit_all(&mut self, items: impl IntoIterator<Item = T>) {
        if let Some(work_tx) = self.work_tx.take() {
            for item in items {
                if work_tx.send(item).is_err() {
                    break; // Workers dropped
                }
            }
        }
    }

    /// Blocking iterator over completions; ends once every worker has exited
    pub fn completions(&self) -> crossbeam::channel::Iter<'_, R> {
        self.result_rx.iter()
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Join all workers after the completion stream has been drained
    pub fn join(self) {
        self.handle.join();
    }
}

fn worker_thread<T, R, F>(ctx: WorkerContext<T, R, F>)
where
    F: Fn(&T, &CancelToken) -> Option<R>,
{
    while let Ok(work_item) = ctx.work_rx.recv() {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let Some(result) = (ctx.processor)(&work_item, &ctx.cancel) else {
            break; // Abandoned on cancellation
        };

        if ctx.result_tx.send(result).is_err() {
            break; // Receiver dropped
        }
    }
}
