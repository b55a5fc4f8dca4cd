//! # Subscriber declaration and discovery.
//!
//! This module provides the [`Subscriber`] trait through which a type declares its
//! callbacks, the resolved descriptors built from those declarations, and the live
//! bindings the bus keeps for registered instances.
//!
//! ## Architecture
//! ```text
//! impl Subscriber for T ──► Methods<T> ──► MethodFinder (cache per type)
//!                                               │
//!                                               ▼
//!                                     Arc<SubscriberMethod>  (shared by all instances of T)
//!                                               │  bus.register(&Arc<T>)
//!                                               ▼
//!                                     Subscription { key, instance, method, active }
//! ```
//!
//! ## Built-in subscribers
//! - [`LogWriter`] prints meta events to stdout (feature `logging`).

pub(crate) mod finder;
pub(crate) mod method;
pub(crate) mod subscriber;
pub(crate) mod subscription;

#[cfg(feature = "logging")]
mod log;

pub use finder::{Discovery, MethodFinder};
pub use method::{MessageType, Subscribe, SubscriberMethod, ThreadMode};
pub use subscriber::{CallbackOutcome, Methods, RawHandler, Subscriber};
pub use subscription::{SubscriberKey, Subscription};

#[cfg(feature = "logging")]
pub use log::LogWriter;
