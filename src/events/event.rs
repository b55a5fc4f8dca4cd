//! # Messages published by the bus about itself.
//!
//! - [`SubscriberFailed`]: a callback returned an error or panicked.
//! - [`NoSubscriber`]: a message was posted and nobody was subscribed to its type.
//!
//! Both are ordinary messages: subscribe to them like to any other type.
//!
//! ## Ordering guarantees
//! Each meta event carries a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the emission order when events are delivered
//! on different threads.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventline::{Bus, Methods, Subscribe, Subscriber, SubscriberFailed};
//!
//! struct Alerts;
//!
//! impl Subscriber for Alerts {
//!     fn subscribe(methods: &mut Methods<Self>) {
//!         methods.on("on_failure", Subscribe::posting(), |_: &Alerts, ev: &SubscriberFailed| {
//!             eprintln!("[{}] {} failed: {}", ev.seq, ev.subscriber, ev.error);
//!         });
//!     }
//! }
//!
//! let bus = Bus::new();
//! bus.register(&Arc::new(Alerts)).unwrap();
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::CallbackError;
use crate::subscribers::{MessageType, ThreadMode};

/// Global sequence counter for meta events.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed) + 1
}

/// A subscriber callback failed while handling a message.
#[derive(Debug, Clone)]
pub struct SubscriberFailed {
    /// Global sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Subscriber name.
    pub subscriber: &'static str,
    /// Callback name.
    pub method: String,
    /// Type of the message being delivered.
    pub message_type: MessageType,
    /// Mode the callback ran in.
    pub mode: ThreadMode,
    /// What went wrong.
    pub error: CallbackError,
}

impl SubscriberFailed {
    pub(crate) fn new(
        subscriber: &'static str,
        method: impl Into<String>,
        message_type: MessageType,
        mode: ThreadMode,
        error: CallbackError,
    ) -> Self {
        Self {
            seq: next_seq(),
            at: SystemTime::now(),
            subscriber,
            method: method.into(),
            message_type,
            mode,
            error,
        }
    }
}

/// A message was posted but no subscriber was registered for its type.
#[derive(Debug, Clone)]
pub struct NoSubscriber {
    /// Global sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Type of the unmatched message.
    pub message_type: MessageType,
}

impl NoSubscriber {
    pub(crate) fn new(message_type: MessageType) -> Self {
        Self {
            seq: next_seq(),
            at: SystemTime::now(),
            message_type,
        }
    }
}

/// True for message types the bus publishes about itself.
///
/// Failures or misses of these types are never re-published, which prevents feedback loops.
pub(crate) fn is_meta(message_type: MessageType) -> bool {
    message_type.is::<SubscriberFailed>() || message_type.is::<NoSubscriber>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = NoSubscriber::new(MessageType::of::<u8>());
        let b = SubscriberFailed::new(
            "sub",
            "on_u8",
            MessageType::of::<u8>(),
            ThreadMode::Posting,
            CallbackError::Failed { error: "x".into() },
        );
        assert!(b.seq > a.seq);
        assert_eq!(b.method, "on_u8");
    }

    #[test]
    fn test_meta_types() {
        assert!(is_meta(MessageType::of::<SubscriberFailed>()));
        assert!(is_meta(MessageType::of::<NoSubscriber>()));
        assert!(!is_meta(MessageType::of::<String>()));
    }
}
