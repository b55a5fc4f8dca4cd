//! # Callback descriptors.
//!
//! A [`SubscriberMethod`] is the immutable, resolved description of one subscriber
//! callback: which message type it accepts, on which [`ThreadMode`] it runs, its
//! priority, whether it wants sticky messages, and a type-erased handle that invokes it.
//!
//! Descriptors are produced once per subscriber **type** by the
//! [`MethodFinder`](super::finder::MethodFinder) and shared by every registered
//! instance of that type.
//!
//! ## Ordering
//! ```text
//! priority 100 ─► priority 100 ─► priority 50 ─► priority 0
//!  (registered 1st) (registered 3rd)  (2nd)        (4th)
//! ```
//! Higher priority is delivered first; equal priorities keep registration order.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::CallbackError;

/// Runtime identity of a message type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for logs.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// Returns the message type of `M`.
    pub fn of<M: Any>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    /// Returns the underlying [`TypeId`].
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type name (as reported by [`std::any::type_name`]).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True if this is the type of `M`.
    #[inline]
    pub fn is<M: Any>(&self) -> bool {
        self.id == TypeId::of::<M>()
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Execution context used to invoke a matched callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThreadMode {
    /// Invoke synchronously on the thread that called `post`.
    ///
    /// Use when:
    /// - The callback is cheap
    /// - Thread identity does not matter
    #[default]
    Posting,

    /// Invoke on the main thread.
    ///
    /// Inline if the poster already is the main thread, otherwise queued (FIFO)
    /// on the main-thread scheduler.
    Main,

    /// Invoke off the main thread.
    ///
    /// Inline if the poster is not the main thread, otherwise submitted to the
    /// background pool.
    Background,

    /// Always submit to the background pool, regardless of the poster's thread.
    Async,
}

impl ThreadMode {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ThreadMode::Posting => "posting",
            ThreadMode::Main => "main",
            ThreadMode::Background => "background",
            ThreadMode::Async => "async",
        }
    }
}

impl fmt::Display for ThreadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Declared options of one callback: thread mode, priority and stickiness.
///
/// # Example
/// ```
/// use eventline::{Subscribe, ThreadMode};
///
/// let opts = Subscribe::new(ThreadMode::Main).priority(100).sticky(true);
/// assert_eq!(opts.mode, ThreadMode::Main);
/// assert_eq!(opts.priority, 100);
/// assert!(opts.sticky);
///
/// let defaults = Subscribe::default();
/// assert_eq!(defaults.mode, ThreadMode::Posting);
/// assert_eq!(defaults.priority, 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Subscribe {
    /// Execution context of the callback.
    pub mode: ThreadMode,
    /// Delivery priority (higher = earlier). Default: `0`.
    pub priority: i32,
    /// Deliver the retained sticky message on registration. Default: `false`.
    pub sticky: bool,
}

impl Subscribe {
    /// Options with the given mode, priority `0`, not sticky.
    pub fn new(mode: ThreadMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Shorthand for `Subscribe::new(ThreadMode::Posting)`.
    pub fn posting() -> Self {
        Self::new(ThreadMode::Posting)
    }

    /// Shorthand for `Subscribe::new(ThreadMode::Main)`.
    pub fn main() -> Self {
        Self::new(ThreadMode::Main)
    }

    /// Shorthand for `Subscribe::new(ThreadMode::Background)`.
    pub fn background() -> Self {
        Self::new(ThreadMode::Background)
    }

    /// Shorthand for `Subscribe::new(ThreadMode::Async)`.
    pub fn asynchronous() -> Self {
        Self::new(ThreadMode::Async)
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets stickiness.
    pub fn sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }
}

/// Type-erased invocable: `(subscriber, message)`.
pub(crate) type ErasedHandler = Arc<
    dyn Fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> Result<(), CallbackError>
        + Send
        + Sync,
>;

/// Immutable descriptor of one subscriber callback.
#[derive(Clone)]
pub struct SubscriberMethod {
    name: Cow<'static, str>,
    message_type: MessageType,
    options: Subscribe,
    handler: ErasedHandler,
}

impl SubscriberMethod {
    pub(crate) fn new(
        name: Cow<'static, str>,
        message_type: MessageType,
        options: Subscribe,
        handler: ErasedHandler,
    ) -> Self {
        Self {
            name,
            message_type,
            options,
            handler,
        }
    }

    /// Callback name as declared in the method table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Message type accepted by the callback.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Scheduling mode.
    pub fn mode(&self) -> ThreadMode {
        self.options.mode
    }

    /// Delivery priority (higher = earlier).
    pub fn priority(&self) -> i32 {
        self.options.priority
    }

    /// Whether the callback receives the retained sticky message on registration.
    pub fn is_sticky(&self) -> bool {
        self.options.sticky
    }

    /// Calls the bound handler. Does not catch panics.
    pub(crate) fn call(
        &self,
        subscriber: &(dyn Any + Send + Sync),
        message: &(dyn Any + Send + Sync),
    ) -> Result<(), CallbackError> {
        (self.handler)(subscriber, message)
    }
}

impl fmt::Debug for SubscriberMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberMethod")
            .field("name", &self.name)
            .field("message_type", &self.message_type)
            .field("mode", &self.options.mode)
            .field("priority", &self.options.priority)
            .field("sticky", &self.options.sticky)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_message_type_identity_ignores_name() {
        let a = MessageType::of::<String>();
        let b = MessageType::of::<String>();
        let c = MessageType::of::<u32>();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is::<String>());
        assert!(!c.is::<String>());

        let set: HashSet<MessageType> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_subscribe_shorthands() {
        assert_eq!(Subscribe::posting().mode, ThreadMode::Posting);
        assert_eq!(Subscribe::main().mode, ThreadMode::Main);
        assert_eq!(Subscribe::background().mode, ThreadMode::Background);
        assert_eq!(Subscribe::asynchronous().mode, ThreadMode::Async);
        assert_eq!(Subscribe::main().priority(-5).priority, -5);
        assert!(!Subscribe::main().sticky);
    }

    #[test]
    fn test_method_calls_handler() {
        let handler: ErasedHandler = Arc::new(
            |_: &(dyn Any + Send + Sync),
             msg: &(dyn Any + Send + Sync)|
             -> Result<(), CallbackError> {
                match msg.downcast_ref::<u32>() {
                    Some(7) => Ok(()),
                    _ => Err(CallbackError::Failed {
                        error: "not seven".into(),
                    }),
                }
            },
        );
        let method = SubscriberMethod::new(
            "on_number".into(),
            MessageType::of::<u32>(),
            Subscribe::asynchronous().priority(3),
            handler,
        );

        assert_eq!(method.name(), "on_number");
        assert_eq!(method.mode(), ThreadMode::Async);
        assert_eq!(method.priority(), 3);
        assert!(method.call(&(), &7_u32).is_ok());
        assert!(method.call(&(), &8_u32).is_err());
    }
}
