//! # Background worker pool.
//!
//! [`BackgroundPool`] runs callback jobs on tokio's blocking pool: a cached pool that
//! spawns threads on demand, reuses idle ones, and reaps them after a keep-alive period.
//!
//! ## Rules
//! - `submit` never blocks and applies no back-pressure.
//! - The owned runtime is built lazily on first submission; a bus that never uses
//!   `Background`/`Async` modes never starts a thread.
//! - When the thread cap is reached, jobs wait in tokio's queue instead of blocking the submitter.
//! - On drop, the owned runtime is shut down without waiting for running jobs.

use std::sync::OnceLock;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, error};

use super::Job;

enum Backend {
    /// Runtime owned by the pool, built on first use (`None` if building failed).
    Owned {
        runtime: OnceLock<Option<Runtime>>,
        thread_name: String,
        max_threads: Option<usize>,
        keep_alive: Duration,
    },
    /// Blocking pool of a runtime owned by the host.
    Shared(Handle),
}

/// Cached, unbounded-growth pool for `Background` and `Async` deliveries.
pub struct BackgroundPool {
    backend: Backend,
}

impl BackgroundPool {
    /// Creates a pool that owns its runtime.
    ///
    /// - `max_threads = None` → tokio's default blocking-thread cap
    /// - `keep_alive` → how long an idle worker is kept for reuse
    pub fn new(
        thread_name: impl Into<String>,
        max_threads: Option<usize>,
        keep_alive: Duration,
    ) -> Self {
        Self {
            backend: Backend::Owned {
                runtime: OnceLock::new(),
                thread_name: thread_name.into(),
                max_threads,
                keep_alive,
            },
        }
    }

    /// Creates a pool on top of an existing runtime's blocking pool.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            backend: Backend::Shared(handle),
        }
    }

    /// Submits a job (fire-and-forget).
    pub fn submit(&self, job: Job) {
        match &self.backend {
            Backend::Shared(handle) => {
                drop(handle.spawn_blocking(job));
            }
            Backend::Owned {
                runtime,
                thread_name,
                max_threads,
                keep_alive,
            } => {
                let runtime =
                    runtime.get_or_init(|| build_runtime(thread_name, *max_threads, *keep_alive));
                match runtime {
                    Some(rt) => drop(rt.spawn_blocking(job)),
                    None => error!(pool = %thread_name, "background pool unavailable; job dropped"),
                }
            }
        }
    }
}

fn build_runtime(
    thread_name: &str,
    max_threads: Option<usize>,
    keep_alive: Duration,
) -> Option<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder
        .worker_threads(1)
        .thread_name(thread_name)
        .thread_keep_alive(keep_alive);
    if let Some(max) = max_threads {
        builder.max_blocking_threads(max.max(1));
    }

    match builder.build() {
        Ok(rt) => {
            debug!(pool = %thread_name, ?max_threads, ?keep_alive, "background pool started");
            Some(rt)
        }
        Err(err) => {
            error!(pool = %thread_name, error = %err, "failed to build background pool");
            None
        }
    }
}

impl Drop for BackgroundPool {
    fn drop(&mut self) {
        if let Backend::Owned { runtime, .. } = &mut self.backend {
            if let Some(Some(rt)) = runtime.take() {
                rt.shutdown_background();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Arc, Barrier};
    use std::thread;

    #[test]
    fn test_runs_off_caller_thread() {
        let pool = BackgroundPool::new("test-bg", None, Duration::from_secs(1));
        let (tx, rx) = mpsc::channel();

        pool.submit(Box::new(move || {
            let _ = tx.send(thread::current().id());
        }));

        let worker = rx.recv_timeout(Duration::from_secs(5)).expect("job ran");
        assert_ne!(worker, thread::current().id());
    }

    #[test]
    fn test_grows_without_blocking_submitter() {
        // Every job waits for all the others: only completes if they run concurrently.
        const JOBS: usize = 16;
        let pool = BackgroundPool::new("test-bg-grow", None, Duration::from_secs(1));
        let barrier = Arc::new(Barrier::new(JOBS));
        let (tx, rx) = mpsc::channel();

        for _ in 0..JOBS {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            pool.submit(Box::new(move || {
                barrier.wait();
                let _ = tx.send(());
            }));
        }

        for _ in 0..JOBS {
            rx.recv_timeout(Duration::from_secs(5)).expect("all jobs released");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_shared_handle() {
        let pool = BackgroundPool::with_handle(Handle::current());
        let (tx, rx) = tokio::sync::oneshot::channel();

        pool.submit(Box::new(move || {
            let _ = tx.send(7);
        }));

        assert_eq!(rx.await.expect("job ran"), 7);
    }

    #[tokio::test]
    async fn test_owned_pool_drops_inside_async_context() {
        let pool = BackgroundPool::new("test-bg-drop", Some(2), Duration::from_millis(100));
        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.submit(Box::new(move || {
            let _ = tx.send(());
        }));
        rx.await.expect("job ran");
        drop(pool);
    }
}
