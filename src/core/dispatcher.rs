//! # Delivery scheduling and failure isolation.
//!
//! [`Dispatcher`] decides, per matched subscription, where the callback runs.
//! [`Invoker`] performs the call itself and turns errors and panics into reports.
//!
//! ## Routing
//! ```text
//!                    on main thread          off main thread
//! Posting     ──►    inline                  inline
//! Main        ──►    inline                  MainThread::submit
//! Background  ──►    BackgroundPool::submit  inline
//! Async       ──►    BackgroundPool::submit  BackgroundPool::submit
//! ```
//!
//! ## Rules
//! - Inactive subscriptions are skipped before scheduling and again right before the call.
//! - A failing callback never reaches the poster and never stops delivery to the others.
//! - Failures of meta-event handlers are logged but never re-published.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use tracing::{trace, warn};

use crate::error::CallbackError;
use crate::events::{is_meta, SubscriberFailed};
use crate::executors::{BackgroundPool, Job, MainThread};
use crate::subscribers::{MessageType, Subscription, ThreadMode};

use super::bus::BusInner;

/// A posted message together with its runtime type.
#[derive(Clone)]
pub(crate) struct Envelope {
    pub(crate) payload: Arc<dyn Any + Send + Sync>,
    pub(crate) message_type: MessageType,
}

impl Envelope {
    pub(crate) fn new<M: Any + Send + Sync>(message: M) -> Self {
        Self::from_arc(Arc::new(message))
    }

    pub(crate) fn from_arc<M: Any + Send + Sync>(message: Arc<M>) -> Self {
        Self {
            payload: message,
            message_type: MessageType::of::<M>(),
        }
    }
}

/// Calls one subscription with panic isolation and failure reporting.
#[derive(Clone)]
pub(crate) struct Invoker {
    bus: Weak<BusInner>,
    log_errors: bool,
    send_event: bool,
}

impl Invoker {
    pub(crate) fn new(bus: Weak<BusInner>, log_errors: bool, send_event: bool) -> Self {
        Self {
            bus,
            log_errors,
            send_event,
        }
    }

    /// Invokes the callback unless the subscription was deactivated in the meantime.
    pub(crate) fn invoke(&self, sub: &Subscription, env: &Envelope) {
        if !sub.is_active() {
            trace!(
                subscriber = sub.subscriber_name(),
                method = sub.method().name(),
                "skipped: unregistered"
            );
            return;
        }

        let method = sub.method();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            method.call(sub.subscriber(), &*env.payload)
        }))
        .unwrap_or_else(|panic| Err(CallbackError::from_panic(panic)));

        if let Err(error) = outcome {
            self.report(sub, env.message_type, error);
        }
    }

    fn report(&self, sub: &Subscription, message_type: MessageType, error: CallbackError) {
        let method = sub.method();
        if self.log_errors {
            warn!(
                subscriber = sub.subscriber_name(),
                method = method.name(),
                message_type = %message_type,
                mode = %method.mode(),
                reason = error.as_label(),
                error = %error,
                "subscriber callback failed"
            );
        }
        if !self.send_event || is_meta(message_type) {
            return;
        }

        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let event = SubscriberFailed::new(
            sub.subscriber_name(),
            method.name(),
            message_type,
            method.mode(),
            error,
        );
        bus.publish(Envelope::new(event));
    }
}

/// Routes deliveries to the right execution context.
pub(crate) struct Dispatcher {
    main: Arc<dyn MainThread>,
    pool: BackgroundPool,
    invoker: Invoker,
}

impl Dispatcher {
    pub(crate) fn new(main: Arc<dyn MainThread>, pool: BackgroundPool, invoker: Invoker) -> Self {
        Self { main, pool, invoker }
    }

    /// True if the caller runs on the main thread.
    pub(crate) fn is_main_thread(&self) -> bool {
        self.main.is_main_thread()
    }

    /// Delivers `env` to `sub`; `on_main` is the poster's main-thread status.
    pub(crate) fn dispatch(&self, sub: &Arc<Subscription>, env: &Envelope, on_main: bool) {
        if !sub.is_active() {
            return;
        }

        match (sub.method().mode(), on_main) {
            (ThreadMode::Posting, _)
            | (ThreadMode::Main, true)
            | (ThreadMode::Background, false) => self.invoker.invoke(sub, env),
            (ThreadMode::Main, false) => self.main.submit(self.job(sub, env)),
            (ThreadMode::Background, true) | (ThreadMode::Async, _) => {
                self.pool.submit(self.job(sub, env));
            }
        }
    }

    fn job(&self, sub: &Arc<Subscription>, env: &Envelope) -> Job {
        let invoker = self.invoker.clone();
        let sub = Arc::clone(sub);
        let env = env.clone();
        Box::new(move || invoker.invoke(&sub, &env))
    }
}
