//! # Live subscriptions.
//!
//! A [`Subscription`] binds one [`SubscriberMethod`] to one registered instance.
//! It is created by the registry on `register` and deactivated on `unregister`.
//!
//! ## Rules
//! - `active` only ever goes from `true` to `false`.
//! - Deliveries scheduled before deactivation re-check the flag and become no-ops.
//! - An invocation that already started always runs to completion.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::method::SubscriberMethod;

/// Identity of a registered subscriber instance (address of its `Arc` allocation).
///
/// Stable while the instance is registered, since the registry keeps it alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberKey(usize);

impl SubscriberKey {
    /// Returns the key of a shared instance.
    pub fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }
}

/// Revocable binding of a callback descriptor to a subscriber instance.
pub struct Subscription {
    key: SubscriberKey,
    subscriber: Arc<dyn Any + Send + Sync>,
    subscriber_name: &'static str,
    method: Arc<SubscriberMethod>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        key: SubscriberKey,
        subscriber: Arc<dyn Any + Send + Sync>,
        subscriber_name: &'static str,
        method: Arc<SubscriberMethod>,
    ) -> Self {
        Self {
            key,
            subscriber,
            subscriber_name,
            method,
            active: AtomicBool::new(true),
        }
    }

    /// Key of the bound instance.
    pub fn key(&self) -> SubscriberKey {
        self.key
    }

    /// The bound instance.
    pub fn subscriber(&self) -> &(dyn Any + Send + Sync) {
        self.subscriber.as_ref()
    }

    /// Name reported by [`Subscriber::name`](crate::Subscriber::name) at registration.
    pub fn subscriber_name(&self) -> &'static str {
        self.subscriber_name
    }

    /// The bound callback descriptor.
    pub fn method(&self) -> &SubscriberMethod {
        &self.method
    }

    /// False once the subscriber was unregistered.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber_name)
            .field("method", &self.method.name())
            .field("message_type", &self.method.message_type())
            .field("priority", &self.method.priority())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_follows_allocation() {
        let a = Arc::new(1_u8);
        let a2 = Arc::clone(&a);
        let b = Arc::new(1_u8);

        assert_eq!(SubscriberKey::of(&a), SubscriberKey::of(&a2));
        assert_ne!(SubscriberKey::of(&a), SubscriberKey::of(&b));

        let erased: Arc<dyn Any + Send + Sync> = a;
        assert_eq!(SubscriberKey::of(&erased), SubscriberKey::of(&a2));
    }
}
