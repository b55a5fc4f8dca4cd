//! # Bus configuration.
//!
//! Provides [`Config`], the centralized settings consumed by
//! [`BusBuilder`](crate::BusBuilder).
//!
//! ## Sentinel values
//! - `max_background_threads = 0` → tokio's default blocking-thread cap

use std::time::Duration;

/// Configuration of one bus instance.
///
/// Defines:
/// - **Failure reporting**: how callback failures are logged and re-published
/// - **Unmatched messages**: how posts without subscribers are reported
/// - **Backends**: thread names and sizing of the main loop and background pool
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Log callback failures (errors and panics) at `warn`.
    pub log_subscriber_errors: bool,

    /// Post a [`SubscriberFailed`](crate::SubscriberFailed) message when a callback fails.
    ///
    /// A failing `SubscriberFailed` handler never triggers another one.
    pub send_subscriber_failed_event: bool,

    /// Log posts that matched no subscriber at `debug`.
    pub log_no_subscriber_messages: bool,

    /// Post a [`NoSubscriber`](crate::NoSubscriber) message when a post matched no subscriber.
    pub send_no_subscriber_event: bool,

    /// Name of the dedicated main-loop thread (unused when a custom main thread is injected).
    pub main_thread_name: String,

    /// Name prefix of background pool threads.
    pub background_thread_name: String,

    /// Maximum number of background threads.
    ///
    /// - `0` = tokio default cap
    /// - `n > 0` = at most `n` concurrent background deliveries; the rest wait in the pool queue
    pub max_background_threads: usize,

    /// How long an idle background thread is kept for reuse.
    pub background_keep_alive: Duration,
}

impl Config {
    /// Returns the background thread cap as an `Option`.
    ///
    /// - `None` → tokio default cap
    /// - `Some(n)` → at most `n` threads
    #[inline]
    pub fn background_thread_limit(&self) -> Option<usize> {
        if self.max_background_threads == 0 {
            None
        } else {
            Some(self.max_background_threads)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - failures are logged and re-published as `SubscriberFailed`
    /// - unmatched posts are logged at debug and re-published as `NoSubscriber`
    /// - `main_thread_name = "eventline-main"`, `background_thread_name = "eventline-bg"`
    /// - `max_background_threads = 0` (tokio default)
    /// - `background_keep_alive = 60s`
    fn default() -> Self {
        Self {
            log_subscriber_errors: true,
            send_subscriber_failed_event: true,
            log_no_subscriber_messages: true,
            send_no_subscriber_event: true,
            main_thread_name: "eventline-main".to_string(),
            background_thread_name: "eventline-bg".to_string(),
            max_background_threads: 0,
            background_keep_alive: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_thread_limit_sentinel() {
        let mut cfg = Config::default();
        assert_eq!(cfg.background_thread_limit(), None);

        cfg.max_background_threads = 4;
        assert_eq!(cfg.background_thread_limit(), Some(4));
    }
}
