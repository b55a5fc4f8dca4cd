//! # Serial main-thread queue.
//!
//! [`MainLoop`] is the default [`MainThread`]: an unbounded FIFO queue whose jobs
//! are executed one at a time by a single driver thread.
//!
//! ## Architecture
//! ```text
//! submit(job) ──► [unbounded mpsc] ──► MainLoopDriver ──► job()  (strict FIFO, no overlap)
//!   (any thread,                          │
//!    never blocks)                        └─► records its thread as "main"
//! ```
//!
//! ## Driving the queue
//! - [`MainLoop::dedicated`] starts a named thread on first submission; nothing to do.
//! - [`MainLoop::new`] hands the [`MainLoopDriver`] to the host, which runs it on its own
//!   main thread: [`run_blocking`](MainLoopDriver::run_blocking) until all senders are gone,
//!   [`run`](MainLoopDriver::run) until a `CancellationToken` fires, or
//!   [`run_pending`](MainLoopDriver::run_pending) once per frame of an existing loop.
//!
//! ## Panic handling
//! A panicking job is caught and logged; the loop keeps running.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::{Job, MainThread};

/// Handle to a serial FIFO queue bound to one driver thread.
///
/// Cheap to share behind an `Arc`; `submit` is callable from any thread.
pub struct MainLoop {
    tx: mpsc::UnboundedSender<Job>,
    owner: Arc<OnceLock<ThreadId>>,
    /// Driver not started yet (only for dedicated loops).
    pending: Mutex<Option<(String, MainLoopDriver)>>,
}

/// Receiving side of a [`MainLoop`]; runs queued jobs on the current thread.
pub struct MainLoopDriver {
    rx: mpsc::UnboundedReceiver<Job>,
    owner: Arc<OnceLock<ThreadId>>,
}

impl MainLoop {
    /// Creates a queue driven by the host.
    ///
    /// The thread that first runs the returned driver becomes the main thread.
    pub fn new() -> (Self, MainLoopDriver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let owner = Arc::new(OnceLock::new());
        let driver = MainLoopDriver {
            rx,
            owner: Arc::clone(&owner),
        };
        let main = Self {
            tx,
            owner,
            pending: Mutex::new(None),
        };
        (main, driver)
    }

    /// Creates a queue driven by its own named thread, started on first submission.
    pub fn dedicated(thread_name: impl Into<String>) -> Self {
        let (mut main, driver) = Self::new();
        main.pending = Mutex::new(Some((thread_name.into(), driver)));
        main
    }

    /// Id of the driver thread, once a driver has started.
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.owner.get().copied()
    }

    fn ensure_started(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((name, driver)) = pending.take() else {
            return;
        };

        let spawned = thread::Builder::new()
            .name(name.clone())
            .spawn(move || driver.run_blocking());
        match spawned {
            Ok(_) => debug!(thread = %name, "main loop started"),
            Err(err) => error!(thread = %name, error = %err, "failed to start main loop thread"),
        }
    }
}

impl MainThread for MainLoop {
    fn is_main_thread(&self) -> bool {
        self.owner.get() == Some(&thread::current().id())
    }

    fn submit(&self, job: Job) {
        self.ensure_started();
        if self.tx.send(job).is_err() {
            error!("main loop is closed; job dropped");
        }
    }
}

impl MainLoopDriver {
    /// Runs jobs until every [`MainLoop`] handle is dropped.
    ///
    /// Blocks the current thread. Must not be called from inside an async runtime.
    pub fn run_blocking(mut self) {
        self.claim();
        while let Some(job) = self.rx.blocking_recv() {
            run_job(job);
        }
        debug!("main loop finished: all senders dropped");
    }

    /// Runs jobs until `token` is cancelled or every [`MainLoop`] handle is dropped.
    ///
    /// Drive it with `block_on` on the host's main thread; the thread that polls the
    /// future is recorded as the main thread.
    pub async fn run(mut self, token: CancellationToken) {
        self.claim();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => run_job(job),
                    None => break,
                },
            }
        }
    }

    /// Runs the jobs queued right now and returns how many ran.
    ///
    /// Intended for hosts that already own a frame/event loop and call this once per tick.
    pub fn run_pending(&mut self) -> usize {
        self.claim();
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            run_job(job);
            ran += 1;
        }
        ran
    }

    fn claim(&self) {
        let current = thread::current().id();
        let owner = *self.owner.get_or_init(|| current);
        if owner != current {
            error!("main loop driver moved to another thread; main-thread checks keep the first");
        }
    }
}

fn run_job(job: Job) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(job)) {
        let info = crate::error::CallbackError::from_panic(panic);
        error!(error = %info, "main loop job panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    #[test]
    fn test_dedicated_runs_fifo_on_one_thread() {
        let main = Arc::new(MainLoop::dedicated("test-main"));
        let (tx, rx) = std_mpsc::channel();

        for i in 0..100 {
            let tx = tx.clone();
            let handle = Arc::clone(&main);
            main.submit(Box::new(move || {
                let _ = tx.send((i, thread::current().id(), handle.is_main_thread()));
            }));
        }

        let mut seen = Vec::new();
        for _ in 0..100 {
            seen.push(rx.recv_timeout(Duration::from_secs(5)).expect("job ran"));
        }

        let order: Vec<i32> = seen.iter().map(|(i, _, _)| *i).collect();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
        assert!(seen.iter().all(|(_, _, on_main)| *on_main));
        assert!(seen.iter().all(|(_, id, _)| Some(*id) == main.thread_id()));
        assert!(!main.is_main_thread());
    }

    #[test]
    fn test_jobs_never_overlap() {
        let main = MainLoop::dedicated("test-serial");
        let busy = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let (tx, rx) = std_mpsc::channel();

        for _ in 0..20 {
            let busy = Arc::clone(&busy);
            let tx = tx.clone();
            main.submit(Box::new(move || {
                let overlapped = busy.swap(true, std::sync::atomic::Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
                busy.store(false, std::sync::atomic::Ordering::SeqCst);
                let _ = tx.send(overlapped);
            }));
        }

        for _ in 0..20 {
            assert!(!rx.recv_timeout(Duration::from_secs(5)).expect("job ran"));
        }
    }

    #[test]
    fn test_run_pending_claims_current_thread() {
        let (main, mut driver) = MainLoop::new();
        let (tx, rx) = std_mpsc::channel();

        for i in 0..3 {
            let tx = tx.clone();
            main.submit(Box::new(move || {
                let _ = tx.send(i);
            }));
        }
        assert!(!main.is_main_thread());

        assert_eq!(driver.run_pending(), 3);
        assert!(main.is_main_thread());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(driver.run_pending(), 0);
    }

    #[test]
    fn test_panicking_job_does_not_stop_loop() {
        let (main, mut driver) = MainLoop::new();
        let (tx, rx) = std_mpsc::channel();

        main.submit(Box::new(|| panic!("job boom")));
        main.submit(Box::new(move || {
            let _ = tx.send("after");
        }));

        assert_eq!(driver.run_pending(), 2);
        assert_eq!(rx.try_recv(), Ok("after"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_run_until_cancelled() {
        let (main, driver) = MainLoop::new();
        let token = CancellationToken::new();
        let (tx, rx) = std_mpsc::channel();

        {
            let tx = tx.clone();
            main.submit(Box::new(move || {
                let _ = tx.send(1);
            }));
        }
        let stop = token.clone();
        main.submit(Box::new(move || {
            let _ = tx.send(2);
            stop.cancel();
        }));

        driver.run(token).await;

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(main.is_main_thread());
    }

    #[test]
    fn test_run_blocking_ends_when_handles_drop() {
        let (main, driver) = MainLoop::new();
        let worker = thread::spawn(move || driver.run_blocking());
        drop(main);
        worker.join().expect("driver thread exits");
    }
}
