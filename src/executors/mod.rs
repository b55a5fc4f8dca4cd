//! Scheduling backends used by the dispatcher.
//!
//! This module groups the execution contexts a callback can be delivered on,
//! other than the poster's own thread.
//!
//! ## Contents
//! - [`MainThread`] host-injectable "main thread" contract (identity + serial queue)
//! - [`MainLoop`] / [`MainLoopDriver`] default serial FIFO queue and its driver
//! - [`BackgroundPool`] cached worker pool backed by tokio's blocking pool
//!
//! ## Quick wiring
//! ```text
//! Dispatcher
//!   ├─► Posting / Main (on main) / Background (off main) ─► inline on caller
//!   ├─► Main (off main)                                  ─► MainThread::submit(job)
//!   └─► Background (on main) / Async                     ─► BackgroundPool::submit(job)
//! ```

mod background;
mod main_loop;

pub use background::BackgroundPool;
pub use main_loop::{MainLoop, MainLoopDriver};

/// Unit of work handed to a backend: one callback invocation.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The execution context designated as "main" by the host.
///
/// ### Implementation requirements
/// - `submit` must not block and must run jobs one at a time, in submission order.
/// - `is_main_thread` must be true exactly when called from the context that runs
///   submitted jobs.
pub trait MainThread: Send + Sync + 'static {
    /// True if the calling thread is the main thread.
    fn is_main_thread(&self) -> bool;

    /// Enqueues a job for serial execution on the main thread (fire-and-forget).
    fn submit(&self, job: Job);
}
