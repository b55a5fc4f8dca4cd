//! # Method discovery with a per-type cache.
//!
//! [`MethodFinder`] turns a subscriber type's method table into resolved
//! [`SubscriberMethod`] descriptors. The result is computed once per type and
//! shared by every later registration of that type.
//!
//! ## Rules
//! - Declarations with a parameter count other than one are skipped and reported
//!   as `MultiParameterCallback`; the other declarations of the type still resolve.
//! - Declaration order is preserved (it becomes the registration order).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{CallbackError, RegisterError};

use super::method::{ErasedHandler, SubscriberMethod};
use super::subscriber::{Methods, Subscriber};

/// Resolved callbacks of one subscriber type.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Valid descriptors in declaration order.
    pub methods: Vec<Arc<SubscriberMethod>>,
    /// Declarations that were rejected.
    pub errors: Vec<RegisterError>,
}

/// Discovers and caches subscriber callbacks by subscriber type.
#[derive(Default)]
pub struct MethodFinder {
    cache: RwLock<HashMap<TypeId, Arc<Discovery>>>,
}

impl MethodFinder {
    /// Creates an empty finder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the callbacks of `S`, resolving them on first use.
    pub fn find<S: Subscriber>(&self) -> Arc<Discovery> {
        let key = TypeId::of::<S>();
        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(found);
        }

        // Resolve outside the lock; `subscribe` is user code.
        let discovery = Arc::new(Self::resolve::<S>());
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert(discovery))
    }

    /// Number of cached subscriber types.
    pub(crate) fn cached_types(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn resolve<S: Subscriber>() -> Discovery {
        let subscriber = std::any::type_name::<S>();
        let mut methods = Methods::<S>::new();
        S::subscribe(&mut methods);

        let mut out = Discovery::default();
        for decl in methods.into_decls() {
            let message_type = match decl.params.as_slice() {
                [only] => *only,
                other => {
                    out.errors.push(RegisterError::MultiParameterCallback {
                        subscriber,
                        method: decl.name.into_owned(),
                        params: other.len(),
                    });
                    continue;
                }
            };

            let raw = decl.handler;
            let handler: ErasedHandler = Arc::new(
                move |this: &(dyn Any + Send + Sync),
                      msg: &(dyn Any + Send + Sync)|
                      -> Result<(), CallbackError> {
                    match this.downcast_ref::<S>() {
                        Some(this) => raw(this, msg),
                        None => Err(CallbackError::TypeMismatch {
                            expected: subscriber,
                        }),
                    }
                },
            );
            out.methods.push(Arc::new(SubscriberMethod::new(
                decl.name,
                message_type,
                decl.options,
                handler,
            )));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::method::{MessageType, Subscribe, ThreadMode};
    use crate::subscribers::subscriber::RawHandler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RESOLVED: AtomicUsize = AtomicUsize::new(0);

    fn accept_all<S: Subscriber>() -> RawHandler<S> {
        Arc::new(|_: &S, _: &(dyn Any + Send + Sync)| -> Result<(), CallbackError> { Ok(()) })
    }

    fn accept_u8<S: Subscriber>() -> RawHandler<S> {
        Arc::new(
            |_: &S, msg: &(dyn Any + Send + Sync)| -> Result<(), CallbackError> {
                match msg.downcast_ref::<u8>() {
                    Some(_) => Ok(()),
                    None => Err(CallbackError::TypeMismatch { expected: "u8" }),
                }
            },
        )
    }

    struct Mixed;

    impl Subscriber for Mixed {
        fn subscribe(methods: &mut Methods<Self>) {
            methods
                .on("on_text", Subscribe::main().priority(5), |_: &Mixed, _: &String| {})
                .declare(
                    "on_pair",
                    vec![MessageType::of::<u32>(), MessageType::of::<u64>()],
                    Subscribe::default(),
                    accept_all(),
                )
                .declare("on_nothing", vec![], Subscribe::default(), accept_all())
                .declare(
                    "on_raw",
                    vec![MessageType::of::<u8>()],
                    Subscribe::asynchronous(),
                    accept_u8(),
                );
        }
    }

    struct Cached;

    impl Subscriber for Cached {
        fn subscribe(methods: &mut Methods<Self>) {
            RESOLVED.fetch_add(1, Ordering::SeqCst);
            methods.on("on_unit", Subscribe::default(), |_: &Cached, _: &()| {});
        }
    }

    struct Empty;

    impl Subscriber for Empty {
        fn subscribe(_methods: &mut Methods<Self>) {}
    }

    #[test]
    fn test_rejects_non_unary_declarations() {
        let finder = MethodFinder::new();
        let found = finder.find::<Mixed>();

        let names: Vec<&str> = found.methods.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["on_text", "on_raw"]);
        assert_eq!(found.methods[0].mode(), ThreadMode::Main);
        assert_eq!(found.methods[0].priority(), 5);
        assert!(found.methods[1].message_type().is::<u8>());

        assert_eq!(found.errors.len(), 2);
        assert!(matches!(
            &found.errors[0],
            RegisterError::MultiParameterCallback { method, params: 2, .. } if method == "on_pair"
        ));
        assert!(matches!(
            &found.errors[1],
            RegisterError::MultiParameterCallback { method, params: 0, .. }
                if method == "on_nothing"
        ));
    }

    #[test]
    fn test_caches_per_type() {
        let finder = MethodFinder::new();
        let before = RESOLVED.load(Ordering::SeqCst);

        let first = finder.find::<Cached>();
        let second = finder.find::<Cached>();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(RESOLVED.load(Ordering::SeqCst), before + 1);
        assert_eq!(finder.cached_types(), 1);
    }

    #[test]
    fn test_erased_handler_checks_subscriber_type() {
        let finder = MethodFinder::new();
        let found = finder.find::<Mixed>();
        let raw = &found.methods[1];

        assert!(raw.call(&Mixed, &1_u8).is_ok());
        assert!(matches!(
            raw.call(&Empty, &1_u8),
            Err(CallbackError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_table() {
        let finder = MethodFinder::new();
        let found = finder.find::<Empty>();
        assert!(found.methods.is_empty());
        assert!(found.errors.is_empty());
    }
}
