//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints the bus's meta events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [subscriber-failed] seq=3 subscriber=screen method=show_text type=alloc::string::String mode=main err="callback failed: offline"
//! [no-subscriber] seq=4 type=i64
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use eventline::{Bus, LogWriter};
//! let bus = Bus::new();
//! bus.register(&Arc::new(LogWriter)).unwrap();
//! bus.post(42_i64); // prints "[no-subscriber] seq=1 type=i64"
//! ```

use crate::events::{NoSubscriber, SubscriberFailed};

use super::method::Subscribe;
use super::subscriber::{Methods, Subscriber};

/// Stdout logging subscriber for meta events.
///
/// Enabled via the `logging` feature. Not intended for production use: subscribe to
/// [`SubscriberFailed`] / [`NoSubscriber`] yourself for structured logging or metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    fn failed_line(e: &SubscriberFailed) -> String {
        format!(
            "[subscriber-failed] seq={} subscriber={} method={} type={} mode={} err={:?}",
            e.seq,
            e.subscriber,
            e.method,
            e.message_type,
            e.mode,
            e.error.to_string()
        )
    }

    fn unmatched_line(e: &NoSubscriber) -> String {
        format!("[no-subscriber] seq={} type={}", e.seq, e.message_type)
    }
}

impl Subscriber for LogWriter {
    fn subscribe(methods: &mut Methods<Self>) {
        methods
            .on(
                "on_subscriber_failed",
                Subscribe::posting(),
                |_: &LogWriter, e: &SubscriberFailed| {
                    println!("{}", LogWriter::failed_line(e));
                },
            )
            .on(
                "on_no_subscriber",
                Subscribe::posting(),
                |_: &LogWriter, e: &NoSubscriber| {
                    println!("{}", LogWriter::unmatched_line(e));
                },
            );
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::subscribers::{MessageType, ThreadMode};

    #[test]
    fn test_failed_line_format() {
        let mut e = SubscriberFailed::new(
            "screen",
            "show_text",
            MessageType::of::<u8>(),
            ThreadMode::Main,
            CallbackError::Failed { error: "offline".into() },
        );
        e.seq = 3;
        assert_eq!(
            LogWriter::failed_line(&e),
            concat!(
                "[subscriber-failed] seq=3 subscriber=screen method=show_text type=u8 mode=main ",
                "err=\"callback failed: offline\""
            )
        );
    }

    #[test]
    fn test_unmatched_line_format() {
        let mut e = NoSubscriber::new(MessageType::of::<i64>());
        e.seq = 4;
        assert_eq!(LogWriter::unmatched_line(&e), "[no-subscriber] seq=4 type=i64");
    }

    #[test]
    fn test_registers_both_meta_callbacks() {
        let bus = crate::Bus::new();
        let reg = bus.register(&std::sync::Arc::new(LogWriter)).expect("registered");
        assert_eq!(reg.added(), 2);
        assert!(bus.has_subscriber_for::<SubscriberFailed>());
        assert!(bus.has_subscriber_for::<NoSubscriber>());
    }
}
