//! Meta events: messages the bus publishes about its own deliveries.
//!
//! ## Contents
//! - [`SubscriberFailed`] a callback returned an error or panicked
//! - [`NoSubscriber`] a post matched no subscription
//!
//! ## Quick reference
//! - **Publisher**: the bus itself (dispatcher on failure, facade on unmatched post),
//!   gated by [`Config`](crate::Config) flags.
//! - **Consumers**: any subscriber, e.g. [`LogWriter`](crate::LogWriter).

mod event;

pub use event::{NoSubscriber, SubscriberFailed};

pub(crate) use event::is_meta;
