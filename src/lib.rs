//! # eventline
//!
//! **Eventline** is an in-process, typed publish/subscribe event bus.
//!
//! Publishers post plain values; every subscriber callback registered for the value's
//! concrete type receives it, on the execution context the callback asked for.
//! Publishers and subscribers never reference each other.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────┐   ┌──────────────┐        ┌──────────────┐
//!   │ Subscriber A │   │ Subscriber B │        │  Publisher   │
//!   │ (Arc<A>)     │   │ (Arc<B>)     │        │ (any thread) │
//!   └──────┬───────┘   └──────┬───────┘        └──────┬───────┘
//!          │ register          │ register              │ post(M)
//!          ▼                   ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Bus                                                              │
//! │  - MethodFinder (callback tables, cached per subscriber type)     │
//! │  - Registry (message type ─► priority-ordered subscriptions)      │
//! │  - Sticky store (latest value per type)                           │
//! │  - Dispatcher (thread-mode routing, failure isolation)            │
//! └──────┬──────────────────┬──────────────────────┬──────────────────┘
//!        ▼                  ▼                      ▼
//!   inline on poster   MainThread queue      BackgroundPool
//!   (Posting, Main     (Main, posted off     (Background, posted on
//!    on main,          the main thread)       main; Async always)
//!    Background off
//!    main)
//! ```
//!
//! ### Delivery
//! ```text
//! post(M) ──► Registry::lookup(TypeId of M) ──► snapshot [s1, s2, ...]
//!
//! for each subscription (priority desc, then registration order) {
//!   ├─► skip if unregistered
//!   ├─► route by ThreadMode and "is the poster the main thread?"
//!   └─► invoke inside catch_unwind
//!          ├─ Ok            ─► done
//!          └─ Err / panic   ─► warn! + post SubscriberFailed (never for meta events)
//! }
//!
//! no subscription ─► debug! + post NoSubscriber (never for meta events)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Bus**           | Register, unregister, post, sticky messages, default instance.| [`Bus`], [`BusBuilder`], [`Registration`]   |
//! | **Subscribers**   | Declare typed callbacks with mode, priority and stickiness.   | [`Subscriber`], [`Methods`], [`Subscribe`]  |
//! | **Thread modes**  | Posting, Main, Background, Async.                             | [`ThreadMode`], [`MainThread`], [`MainLoop`]|
//! | **Meta events**   | Observe failed callbacks and unmatched posts.                 | [`SubscriberFailed`], [`NoSubscriber`]      |
//! | **Errors**        | Typed errors for registration and callbacks.                  | [`RegisterError`], [`CallbackError`]        |
//! | **Configuration** | Centralize bus settings.                                      | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use eventline::{Bus, Methods, Subscribe, Subscriber};
//!
//! struct Progress(u64);
//!
//! #[derive(Default)]
//! struct ProgressBar {
//!     last: AtomicU64,
//! }
//!
//! impl Subscriber for ProgressBar {
//!     fn subscribe(methods: &mut Methods<Self>) {
//!         methods.on("on_progress", Subscribe::posting().priority(10), |this: &ProgressBar, p: &Progress| {
//!             this.last.store(p.0, Ordering::SeqCst);
//!         });
//!     }
//! }
//!
//! let bus = Bus::new();
//! let bar = Arc::new(ProgressBar::default());
//! bus.register(&bar).unwrap();
//!
//! bus.post(Progress(42));
//! assert_eq!(bar.last.load(Ordering::SeqCst), 42);
//!
//! bus.unregister(&bar);
//! ```
mod core;
mod error;
mod events;
mod executors;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Bus, BusBuilder, Config, Registration};
pub use error::{BusError, CallbackError, RegisterError};
pub use events::{NoSubscriber, SubscriberFailed};
pub use executors::{BackgroundPool, Job, MainLoop, MainLoopDriver, MainThread};
pub use subscribers::{
    CallbackOutcome, Discovery, MessageType, MethodFinder, Methods, RawHandler, Subscribe,
    SubscriberKey, SubscriberMethod, Subscriber, Subscription, ThreadMode,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
