//! # Subscriber trait and method tables.
//!
//! Provides [`Subscriber`], the extension point through which a type declares its
//! callbacks, and [`Methods`], the table it fills in.
//!
//! ## Architecture
//! ```text
//! Subscriber::subscribe(&mut Methods<Self>)      (once per type, cached)
//!        │
//!        ├─► methods.on::<M>(name, Subscribe, |this, msg| ...)     typed, arity checked by rustc
//!        └─► methods.declare(name, params, Subscribe, RawHandler)  generated tables, arity checked at discovery
//!                     │
//!                     ▼
//!              MethodFinder ──► Vec<SubscriberMethod> + Vec<RegisterError>
//! ```
//!
//! ## Rules
//! - The table is built from the **type**, not the instance: every instance of a type
//!   shares the same callbacks.
//! - Each callback takes exactly one message. `declare` entries with any other
//!   parameter count are rejected with `MultiParameterCallback`.
//! - A callback returns `()` or `Result<(), E>` with `E: Display`; errors and panics are
//!   isolated by the dispatcher.
//!
//! ## Example
//! ```rust
//! use eventline::{Methods, Subscribe, Subscriber};
//!
//! struct Screen;
//!
//! impl Subscriber for Screen {
//!     fn subscribe(methods: &mut Methods<Self>) {
//!         methods
//!             .on("show_text", Subscribe::main().priority(50), |_this: &Screen, text: &String| {
//!                 println!("{text}");
//!             })
//!             .on("store_count", Subscribe::background(), |_this: &Screen, n: &u64| {
//!                 if *n == 0 {
//!                     return Err("empty counter");
//!                 }
//!                 Ok(())
//!             });
//!     }
//!
//!     fn name(&self) -> &'static str { "screen" }
//! }
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;

use crate::error::CallbackError;

use super::method::{MessageType, Subscribe};

/// A type whose instances can be registered on a [`Bus`](crate::Bus).
///
/// ### Implementation requirements
/// - Declare every callback in [`subscribe`](Subscriber::subscribe).
/// - Keep callbacks short for `Posting`/`Main` modes; they run on the poster's or the main thread.
/// - Call [`Bus::unregister`](crate::Bus::unregister) before dropping the last handle you own,
///   otherwise the bus keeps the instance alive.
pub trait Subscriber: Send + Sync + 'static {
    /// Declares the callbacks of this type.
    ///
    /// Called once per type; the result is cached by the bus.
    fn subscribe(methods: &mut Methods<Self>)
    where
        Self: Sized;

    /// Returns the subscriber name used in logs and [`SubscriberFailed`](crate::SubscriberFailed).
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Return types accepted from callbacks.
pub trait CallbackOutcome {
    /// Converts the callback's return value into the dispatcher's result.
    fn into_outcome(self) -> Result<(), CallbackError>;
}

impl CallbackOutcome for () {
    #[inline]
    fn into_outcome(self) -> Result<(), CallbackError> {
        Ok(())
    }
}

impl<E: Display> CallbackOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), CallbackError> {
        self.map_err(|e| CallbackError::Failed {
            error: e.to_string(),
        })
    }
}

/// Hand-written invocable for [`Methods::declare`].
///
/// Receives the subscriber and the message as `&dyn Any`; the handler downcasts it.
pub type RawHandler<S> =
    Arc<dyn Fn(&S, &(dyn Any + Send + Sync)) -> Result<(), CallbackError> + Send + Sync>;

/// One entry of a method table.
pub(crate) struct MethodDecl<S> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) params: Vec<MessageType>,
    pub(crate) options: Subscribe,
    pub(crate) handler: RawHandler<S>,
}

/// Method table filled in by [`Subscriber::subscribe`].
pub struct Methods<S> {
    decls: Vec<MethodDecl<S>>,
}

impl<S: Subscriber> Methods<S> {
    pub(crate) fn new() -> Self {
        Self { decls: Vec::new() }
    }

    /// Declares a typed callback for messages of type `M`.
    pub fn on<M, F, R>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        options: Subscribe,
        f: F,
    ) -> &mut Self
    where
        M: Any + Send + Sync,
        F: Fn(&S, &M) -> R + Send + Sync + 'static,
        R: CallbackOutcome,
    {
        let handler: RawHandler<S> = Arc::new(move |this: &S, msg: &(dyn Any + Send + Sync)| {
            match msg.downcast_ref::<M>() {
                Some(msg) => f(this, msg).into_outcome(),
                None => Err(CallbackError::TypeMismatch {
                    expected: std::any::type_name::<M>(),
                }),
            }
        });
        self.decls.push(MethodDecl {
            name: name.into(),
            params: vec![MessageType::of::<M>()],
            options,
            handler,
        });
        self
    }

    /// Declares a callback with an explicit parameter list.
    ///
    /// Intended for generated registration tables. The declaration is rejected at
    /// discovery time unless `params` has exactly one entry, which becomes the
    /// message type of the callback.
    pub fn declare(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        params: Vec<MessageType>,
        options: Subscribe,
        handler: RawHandler<S>,
    ) -> &mut Self {
        self.decls.push(MethodDecl {
            name: name.into(),
            params,
            options,
            handler,
        });
        self
    }

    /// Number of declared callbacks.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// True if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub(crate) fn into_decls(self) -> Vec<MethodDecl<S>> {
        self.decls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    impl Subscriber for Counter {
        fn subscribe(methods: &mut Methods<Self>) {
            methods.on("on_count", Subscribe::default(), |_: &Counter, n: &u32| {
                if *n > 10 {
                    Err(format!("too big: {n}"))
                } else {
                    Ok(())
                }
            });
        }
    }

    #[test]
    fn test_typed_declaration_records_single_param() {
        let mut methods = Methods::<Counter>::new();
        Counter::subscribe(&mut methods);
        assert_eq!(methods.len(), 1);

        let decls = methods.into_decls();
        assert_eq!(decls[0].params, vec![MessageType::of::<u32>()]);
        assert_eq!(decls[0].name, "on_count");
    }

    #[test]
    fn test_typed_handler_maps_outcomes() {
        let mut methods = Methods::<Counter>::new();
        Counter::subscribe(&mut methods);
        let decls = methods.into_decls();
        let handler = decls[0].handler.clone();

        assert_eq!(handler(&Counter, &3_u32), Ok(()));
        assert_eq!(
            handler(&Counter, &11_u32),
            Err(CallbackError::Failed {
                error: "too big: 11".into()
            })
        );
        assert_eq!(
            handler(&Counter, &"wrong"),
            Err(CallbackError::TypeMismatch { expected: "u32" })
        );
    }

    #[test]
    fn test_unit_outcome_is_ok() {
        assert_eq!(().into_outcome(), Ok(()));
        assert!(Err::<(), _>("x").into_outcome().is_err());
    }
}
