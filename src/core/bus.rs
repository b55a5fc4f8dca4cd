//! # The bus facade.
//!
//! [`Bus`] ties the pieces together: discovery ([`MethodFinder`]), the subscription
//! [`Registry`], the sticky store and the [`Dispatcher`].
//!
//! ## Architecture
//! ```text
//! register(&Arc<S>) ──► MethodFinder::find::<S>() ──► Registry::index ──► sticky replay
//! unregister(&Arc<S>) ─► Registry::remove
//! post(M) ────────────► Registry::lookup(type) ──► Dispatcher::dispatch (per subscription)
//!                              │
//!                              └─ none ──► debug log + NoSubscriber (unless M is a meta event)
//! ```
//!
//! ## Rules
//! - `Bus` is a cheap handle (`Clone`); clones share one registry.
//! - [`Bus::get_default`] returns the process-wide instance, created at most once.
//! - Backends start lazily: a bus that only uses `Posting` callbacks never spawns a thread.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::error::RegisterError;
use crate::events::{is_meta, NoSubscriber};
use crate::executors::{BackgroundPool, MainThread};
use crate::subscribers::{MessageType, MethodFinder, Subscriber, SubscriberKey};

use super::builder::BusBuilder;
use super::config::Config;
use super::dispatcher::{Dispatcher, Envelope, Invoker};
use super::registry::{Registry, Snapshot};

/// Process-wide default instance.
pub(super) static DEFAULT: OnceLock<Bus> = OnceLock::new();

/// Shared state behind every [`Bus`] handle.
pub(crate) struct BusInner {
    cfg: Config,
    registry: Registry,
    finder: MethodFinder,
    dispatcher: Dispatcher,
    sticky: RwLock<HashMap<MessageType, Arc<dyn Any + Send + Sync>>>,
}

impl BusInner {
    /// Delivers `env` to every current subscription of its type.
    pub(crate) fn publish(&self, env: Envelope) {
        let subs = self.registry.lookup(env.message_type);
        self.deliver(env, subs);
    }

    /// Delivers `env` to a snapshot taken by the caller.
    fn deliver(&self, env: Envelope, subs: Option<Snapshot>) {
        let Some(subs) = subs else {
            self.unmatched(env.message_type);
            return;
        };

        let on_main = self.dispatcher.is_main_thread();
        for sub in subs.iter() {
            self.dispatcher.dispatch(sub, &env, on_main);
        }
    }

    fn unmatched(&self, message_type: MessageType) {
        if is_meta(message_type) {
            return;
        }
        if self.cfg.log_no_subscriber_messages {
            debug!(message_type = %message_type, "no subscribers registered for message type");
        }
        if self.cfg.send_no_subscriber_event {
            self.publish(Envelope::new(NoSubscriber::new(message_type)));
        }
    }
}

/// Outcome of a successful [`Bus::register`] call.
///
/// Registration is partial when some callbacks were rejected; see [`rejected`](Self::rejected).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    subscriber: &'static str,
    added: usize,
    rejected: Vec<RegisterError>,
    sticky_delivered: usize,
}

impl Registration {
    /// Name of the registered subscriber.
    pub fn subscriber(&self) -> &'static str {
        self.subscriber
    }

    /// Number of subscriptions created.
    pub fn added(&self) -> usize {
        self.added
    }

    /// Callbacks that were rejected (duplicates, multi-parameter declarations).
    pub fn rejected(&self) -> &[RegisterError] {
        &self.rejected
    }

    /// Number of retained sticky messages scheduled for delivery.
    pub fn sticky_delivered(&self) -> usize {
        self.sticky_delivered
    }

    /// True if every declared callback was bound.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Turns the first rejection into an error.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use eventline::{Bus, Methods, RegisterError, Subscribe, Subscriber};
    ///
    /// struct Greeter;
    ///
    /// impl Subscriber for Greeter {
    ///     fn subscribe(methods: &mut Methods<Self>) {
    ///         methods.on("greet", Subscribe::posting(), |_: &Greeter, name: &String| {
    ///             println!("hello, {name}");
    ///         });
    ///     }
    /// }
    ///
    /// let bus = Bus::new();
    /// let greeter = Arc::new(Greeter);
    /// assert!(bus.register(&greeter).unwrap().into_result().is_ok());
    ///
    /// let again = bus.register(&greeter);
    /// assert!(matches!(again, Err(RegisterError::DuplicateSubscription { .. })));
    /// ```
    pub fn into_result(mut self) -> Result<Self, RegisterError> {
        if self.rejected.is_empty() {
            Ok(self)
        } else {
            Err(self.rejected.swap_remove(0))
        }
    }
}

/// In-process publish/subscribe bus.
///
/// # Example
/// ```
/// use std::sync::{Arc, Mutex};
/// use eventline::{Bus, Methods, Subscribe, Subscriber};
///
/// #[derive(Default)]
/// struct Inbox(Mutex<Vec<String>>);
///
/// impl Subscriber for Inbox {
///     fn subscribe(methods: &mut Methods<Self>) {
///         methods.on("store", Subscribe::posting(), |this: &Inbox, msg: &String| {
///             this.0.lock().unwrap().push(msg.clone());
///         });
///     }
/// }
///
/// let bus = Bus::new();
/// let inbox = Arc::new(Inbox::default());
/// bus.register(&inbox).unwrap();
///
/// bus.post(String::from("hello"));
/// assert_eq!(*inbox.0.lock().unwrap(), vec!["hello".to_string()]);
///
/// assert!(bus.unregister(&inbox));
/// bus.post(String::from("dropped"));
/// assert_eq!(inbox.0.lock().unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    /// Returns the process-wide default bus, creating it on first access.
    ///
    /// Concurrent first calls observe the same instance.
    pub fn get_default() -> &'static Bus {
        DEFAULT.get_or_init(Bus::new)
    }

    /// Creates an isolated bus with [`Config::default`].
    pub fn new() -> Self {
        BusBuilder::new(Config::default()).build()
    }

    /// Starts building a bus with a custom configuration.
    pub fn builder(cfg: Config) -> BusBuilder {
        BusBuilder::new(cfg)
    }

    pub(super) fn from_parts(cfg: Config, main: Arc<dyn MainThread>, pool: BackgroundPool) -> Self {
        let inner = Arc::new_cyclic(|weak| BusInner {
            registry: Registry::new(),
            finder: MethodFinder::new(),
            dispatcher: Dispatcher::new(
                main,
                pool,
                Invoker::new(
                    weak.clone(),
                    cfg.log_subscriber_errors,
                    cfg.send_subscriber_failed_event,
                ),
            ),
            sticky: RwLock::new(HashMap::new()),
            cfg,
        });
        Self { inner }
    }

    /// Configuration this bus was built with.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Registers every callback declared by `S`.
    ///
    /// Returns [`RegisterError::NoSubscriberMethods`] if `S` declares no usable callback, and
    /// [`RegisterError::DuplicateSubscription`] if every callback is already bound (the
    /// instance is registered). Otherwise callbacks that cannot be bound are reported in the
    /// returned [`Registration`] while the others are registered. Newly added sticky callbacks
    /// receive the retained message of their type, if any.
    pub fn register<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
    ) -> Result<Registration, RegisterError> {
        let name = subscriber.name();
        let discovery = self.inner.finder.find::<S>();

        for err in &discovery.errors {
            warn!(subscriber = name, reason = err.as_label(), error = %err, "callback declaration skipped");
        }
        if discovery.methods.is_empty() {
            let err = RegisterError::NoSubscriberMethods { subscriber: name };
            warn!(subscriber = name, reason = err.as_label(), "registration ignored: {err}");
            return Err(err);
        }

        let key = SubscriberKey::of(subscriber);
        let erased: Arc<dyn Any + Send + Sync> = subscriber.clone();

        // Indexing and reading the sticky store form one step against `post_sticky`:
        // a sticky subscriber sees a sticky post either in the snapshot or in the replay.
        let (indexed, replay) = {
            let sticky = self.inner.sticky.read().unwrap_or_else(PoisonError::into_inner);
            let indexed = self.inner.registry.index(key, erased, name, &discovery.methods);
            let replay: Vec<_> = indexed
                .added
                .iter()
                .filter(|sub| sub.method().is_sticky())
                .filter_map(|sub| {
                    let message_type = sub.method().message_type();
                    let payload = sticky.get(&message_type).cloned()?;
                    Some((Arc::clone(sub), Envelope { payload, message_type }))
                })
                .collect();
            (indexed, replay)
        };

        for err in &indexed.rejected {
            warn!(subscriber = name, reason = err.as_label(), error = %err, "subscription rejected");
        }
        if indexed.added.is_empty() {
            if let Some(err) = indexed.rejected.first() {
                return Err(err.clone());
            }
        }

        let sticky_delivered = replay.len();
        if !replay.is_empty() {
            let on_main = self.inner.dispatcher.is_main_thread();
            for (sub, env) in &replay {
                self.inner.dispatcher.dispatch(sub, env, on_main);
            }
        }

        debug!(
            subscriber = name,
            added = indexed.added.len(),
            rejected = indexed.rejected.len(),
            sticky = sticky_delivered,
            "subscriber registered"
        );

        let mut rejected = discovery.errors.clone();
        rejected.extend(indexed.rejected);
        Ok(Registration {
            subscriber: name,
            added: indexed.added.len(),
            rejected,
            sticky_delivered,
        })
    }

    /// Removes every subscription of `subscriber`.
    ///
    /// Deliveries already queued for it become no-ops. Returns `false` if it was not registered.
    pub fn unregister<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        let removed = self.inner.registry.remove(SubscriberKey::of(subscriber));
        if removed == 0 {
            debug!(subscriber = subscriber.name(), "unregister: subscriber was not registered");
            return false;
        }
        debug!(subscriber = subscriber.name(), removed, "subscriber unregistered");
        true
    }

    /// True if `subscriber` currently has at least one subscription.
    pub fn is_registered<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        self.inner.registry.is_registered(SubscriberKey::of(subscriber))
    }

    /// True if at least one callback is registered for messages of type `M`.
    pub fn has_subscriber_for<M: Any>(&self) -> bool {
        self.inner.registry.has_subscribers(MessageType::of::<M>())
    }

    /// Number of callbacks registered for messages of type `M`.
    pub fn subscription_count<M: Any>(&self) -> usize {
        self.inner.registry.subscription_count(MessageType::of::<M>())
    }

    /// Delivers `message` to every callback registered for its type.
    ///
    /// Returns once inline callbacks have run and the others are scheduled.
    pub fn post<M: Any + Send + Sync>(&self, message: M) {
        self.inner.publish(Envelope::new(message));
    }

    /// Like [`post`](Self::post) for an already shared message.
    pub fn post_arc<M: Any + Send + Sync>(&self, message: Arc<M>) {
        self.inner.publish(Envelope::from_arc(message));
    }

    /// Retains `message` as the sticky message of its type, then posts it.
    ///
    /// Callbacks declared with `sticky(true)` that register later receive it immediately.
    pub fn post_sticky<M: Any + Send + Sync>(&self, message: M) {
        let env = Envelope::new(message);
        let subs = {
            let mut sticky = self.inner.sticky.write().unwrap_or_else(PoisonError::into_inner);
            sticky.insert(env.message_type, Arc::clone(&env.payload));
            self.inner.registry.lookup(env.message_type)
        };
        self.inner.deliver(env, subs);
    }

    /// Returns the retained sticky message of type `M`.
    pub fn sticky<M: Any + Send + Sync>(&self) -> Option<Arc<M>> {
        self.sticky_payload(MessageType::of::<M>())
            .and_then(|payload| payload.downcast::<M>().ok())
    }

    /// Removes and returns the retained sticky message of type `M`.
    pub fn remove_sticky<M: Any + Send + Sync>(&self) -> Option<Arc<M>> {
        self.inner
            .sticky
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&MessageType::of::<M>())
            .and_then(|payload| payload.downcast::<M>().ok())
    }

    /// Drops every retained sticky message.
    pub fn remove_all_sticky(&self) {
        self.inner
            .sticky
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn sticky_payload(&self, message_type: MessageType) -> Option<Arc<dyn Any + Send + Sync>> {
        self.inner
            .sticky
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&message_type)
            .cloned()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("cached_subscriber_types", &self.inner.finder.cached_types())
            .finish_non_exhaustive()
    }
}
