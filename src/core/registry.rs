//! # Subscription registry.
//!
//! Owns the two indexes of the bus:
//! - `by_message`: message type → subscriptions, ordered by priority (desc), then registration
//! - `by_subscriber`: subscriber → message types it is bound to (used for teardown)
//!
//! ## Architecture
//! ```text
//! register ──► index(key, descriptors) ─┐
//! unregister ─► remove(key) ────────────┼──► RwLock<Indexes> (one coarse lock)
//! post ──────► lookup(type) ────────────┘          │
//!                 │                                 └─ lists are replaced, never edited in place
//!                 └─► Arc<[Arc<Subscription>]>  (point-in-time snapshot, iterated without the lock)
//! ```
//!
//! ## Rules
//! - Both indexes change inside the same write section, so they are always consistent.
//! - A subscriber holds at most one subscription per message type.
//! - No user code runs while the lock is held.
//! - A snapshot handed out by `lookup` never changes; it may still contain subscriptions that
//!   were deactivated afterwards (the dispatcher re-checks `is_active`).

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RegisterError;
use crate::subscribers::{MessageType, SubscriberKey, SubscriberMethod, Subscription};

/// Immutable, priority-ordered subscription list.
pub type Snapshot = Arc<[Arc<Subscription>]>;

#[derive(Default)]
struct Indexes {
    by_message: HashMap<MessageType, Snapshot>,
    by_subscriber: HashMap<SubscriberKey, HashSet<MessageType>>,
}

/// Result of [`Registry::index`].
#[derive(Debug, Default)]
pub struct Indexed {
    /// Newly created subscriptions, in descriptor order.
    pub added: Vec<Arc<Subscription>>,
    /// Descriptors rejected as duplicates.
    pub rejected: Vec<RegisterError>,
}

/// Thread-safe index of live subscriptions.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Indexes>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `descriptors` to `subscriber`.
    ///
    /// Each subscription is inserted after every existing one with a priority greater
    /// than or equal to its own. A descriptor for a message type the subscriber is already
    /// bound to is rejected with [`RegisterError::DuplicateSubscription`]; the others proceed.
    pub fn index(
        &self,
        key: SubscriberKey,
        subscriber: Arc<dyn Any + Send + Sync>,
        subscriber_name: &'static str,
        descriptors: &[Arc<SubscriberMethod>],
    ) -> Indexed {
        let mut out = Indexed::default();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let idx = &mut *guard;

        for method in descriptors {
            let message_type = method.message_type();
            let bound = idx.by_subscriber.entry(key).or_default();
            if !bound.insert(message_type) {
                out.rejected.push(RegisterError::DuplicateSubscription {
                    subscriber: subscriber_name,
                    message_type: message_type.name(),
                });
                continue;
            }

            let sub = Arc::new(Subscription::new(
                key,
                Arc::clone(&subscriber),
                subscriber_name,
                Arc::clone(method),
            ));

            let current = idx.by_message.get(&message_type).map(|s| &s[..]).unwrap_or(&[]);
            let pos = current.partition_point(|s| s.method().priority() >= method.priority());
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend_from_slice(&current[..pos]);
            next.push(Arc::clone(&sub));
            next.extend_from_slice(&current[pos..]);
            idx.by_message.insert(message_type, next.into());

            out.added.push(sub);
        }

        if idx.by_subscriber.get(&key).is_some_and(HashSet::is_empty) {
            idx.by_subscriber.remove(&key);
        }
        out
    }

    /// Deactivates and removes every subscription of `key`.
    ///
    /// Returns the number of removed subscriptions; `0` for an unknown subscriber.
    pub fn remove(&self, key: SubscriberKey) -> usize {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let idx = &mut *guard;

        let Some(types) = idx.by_subscriber.remove(&key) else {
            return 0;
        };

        let mut removed = 0;
        for message_type in types {
            let Some(current) = idx.by_message.get(&message_type) else {
                continue;
            };

            let mut kept = Vec::with_capacity(current.len().saturating_sub(1));
            for sub in current.iter() {
                if sub.key() == key {
                    sub.deactivate();
                    removed += 1;
                } else {
                    kept.push(Arc::clone(sub));
                }
            }

            if kept.is_empty() {
                idx.by_message.remove(&message_type);
            } else {
                idx.by_message.insert(message_type, kept.into());
            }
        }
        removed
    }

    /// Returns the current subscriptions for `message_type`, or `None` if there are none.
    pub fn lookup(&self, message_type: MessageType) -> Option<Snapshot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_message
            .get(&message_type)
            .cloned()
    }

    /// True if `key` has at least one subscription.
    pub fn is_registered(&self, key: SubscriberKey) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_subscriber
            .contains_key(&key)
    }

    /// True if at least one subscription exists for `message_type`.
    pub fn has_subscribers(&self, message_type: MessageType) -> bool {
        self.subscription_count(message_type) > 0
    }

    /// Number of subscriptions for `message_type`.
    pub fn subscription_count(&self, message_type: MessageType) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_message
            .get(&message_type)
            .map_or(0, |s| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::subscribers::method::ErasedHandler;
    use crate::subscribers::{Subscribe, ThreadMode};

    fn method<M: Any>(name: &'static str, opts: Subscribe) -> Arc<SubscriberMethod> {
        let handler: ErasedHandler = Arc::new(
            |_: &(dyn Any + Send + Sync),
             _: &(dyn Any + Send + Sync)|
             -> Result<(), CallbackError> { Ok(()) },
        );
        Arc::new(SubscriberMethod::new(
            name.into(),
            MessageType::of::<M>(),
            opts,
            handler,
        ))
    }

    struct Sub;

    fn add(
        registry: &Registry,
        name: &'static str,
        methods: &[Arc<SubscriberMethod>],
    ) -> (Arc<Sub>, Indexed) {
        let sub = Arc::new(Sub);
        let indexed = registry.index(SubscriberKey::of(&sub), sub.clone(), name, methods);
        (sub, indexed)
    }

    fn order(registry: &Registry) -> Vec<&'static str> {
        registry
            .lookup(MessageType::of::<String>())
            .map(|s| s.iter().map(|sub| sub.subscriber_name()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_lookup_contains_registered_descriptor() {
        let registry = Registry::new();
        let (sub, indexed) = add(
            &registry,
            "a",
            &[
                method::<String>("on_text", Subscribe::main().priority(7)),
                method::<u32>("on_num", Subscribe::asynchronous()),
            ],
        );
        assert_eq!(indexed.added.len(), 2);
        assert!(indexed.rejected.is_empty());

        let texts = registry.lookup(MessageType::of::<String>()).expect("indexed");
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].key(), SubscriberKey::of(&sub));
        assert_eq!(texts[0].method().mode(), ThreadMode::Main);
        assert_eq!(texts[0].method().priority(), 7);

        let nums = registry.lookup(MessageType::of::<u32>()).expect("indexed");
        assert_eq!(nums[0].method().mode(), ThreadMode::Async);

        assert!(registry.is_registered(SubscriberKey::of(&sub)));
    }

    #[test]
    fn test_priority_then_registration_order() {
        let registry = Registry::new();
        add(&registry, "A", &[method::<String>("on", Subscribe::default().priority(100))]);
        add(&registry, "B", &[method::<String>("on", Subscribe::default().priority(50))]);
        assert_eq!(order(&registry), vec!["A", "B"]);

        add(&registry, "C", &[method::<String>("on", Subscribe::default().priority(100))]);
        assert_eq!(order(&registry), vec!["A", "C", "B"]);

        add(&registry, "D", &[method::<String>("on", Subscribe::default().priority(-1))]);
        add(&registry, "E", &[method::<String>("on", Subscribe::default().priority(200))]);
        assert_eq!(order(&registry), vec!["E", "A", "C", "B", "D"]);
    }

    #[test]
    fn test_duplicate_rejected_others_proceed() {
        let registry = Registry::new();
        let sub = Arc::new(Sub);
        let key = SubscriberKey::of(&sub);

        let on_text = method::<String>("on", Subscribe::default());
        let first = registry.index(key, sub.clone(), "dup", &[on_text]);
        assert_eq!(first.added.len(), 1);

        let second = registry.index(
            key,
            sub.clone(),
            "dup",
            &[
                method::<String>("on_again", Subscribe::default()),
                method::<u8>("on_byte", Subscribe::default()),
            ],
        );
        assert_eq!(second.added.len(), 1);
        assert_eq!(
            second.rejected,
            vec![RegisterError::DuplicateSubscription {
                subscriber: "dup",
                message_type: "alloc::string::String",
            }]
        );
        assert_eq!(registry.subscription_count(MessageType::of::<String>()), 1);
        assert_eq!(registry.subscription_count(MessageType::of::<u8>()), 1);
    }

    #[test]
    fn test_remove_deactivates_and_clears_both_indexes() {
        let registry = Registry::new();
        let (a, indexed) = add(
            &registry,
            "a",
            &[
                method::<String>("on_text", Subscribe::default()),
                method::<u8>("on_byte", Subscribe::default()),
            ],
        );
        add(&registry, "b", &[method::<String>("on_text", Subscribe::default())]);

        assert_eq!(registry.remove(SubscriberKey::of(&a)), 2);
        assert!(indexed.added.iter().all(|s| !s.is_active()));
        assert!(!registry.is_registered(SubscriberKey::of(&a)));
        assert_eq!(order(&registry), vec!["b"]);
        assert!(!registry.has_subscribers(MessageType::of::<u8>()));
        assert!(registry.lookup(MessageType::of::<u8>()).is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = Registry::new();
        let (a, _) = add(&registry, "a", &[method::<String>("on", Subscribe::default())]);
        let never = Arc::new(Sub);

        assert_eq!(registry.remove(SubscriberKey::of(&a)), 1);
        assert_eq!(registry.remove(SubscriberKey::of(&a)), 0);
        assert_eq!(registry.remove(SubscriberKey::of(&never)), 0);
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let registry = Registry::new();
        let (a, _) = add(&registry, "a", &[method::<String>("on", Subscribe::default())]);
        let snapshot = registry.lookup(MessageType::of::<String>()).expect("indexed");

        add(&registry, "b", &[method::<String>("on", Subscribe::default().priority(9))]);
        registry.remove(SubscriberKey::of(&a));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].subscriber_name(), "a");
        assert!(!snapshot[0].is_active());
        assert_eq!(order(&registry), vec!["b"]);
    }

    #[test]
    fn test_concurrent_index_and_remove_keep_indexes_consistent() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let on = method::<String>("on", Subscribe::default());
                        let (sub, _) = add(&registry, "t", &[on]);
                        let snapshot =
                            registry.lookup(MessageType::of::<String>()).expect("indexed");
                        assert!(snapshot.iter().any(|s| s.key() == SubscriberKey::of(&sub)));
                        assert_eq!(registry.remove(SubscriberKey::of(&sub)), 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker finished");
        }
        assert!(!registry.has_subscribers(MessageType::of::<String>()));
    }
}
