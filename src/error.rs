//! Error types used by the bus and by subscriber callbacks.
//!
//! This module defines three error enums:
//!
//! - [`RegisterError`]: configuration-shape problems surfaced by [`Bus::register`](crate::Bus::register).
//! - [`CallbackError`]: failures of a single callback invocation (caught by the dispatcher).
//! - [`BusError`]: errors raised by the bus lifecycle itself.
//!
//! All of them provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! None of them is fatal: registration errors are continuable and callback errors never
//! reach the poster.

use thiserror::Error;

/// # Errors produced while registering a subscriber.
///
/// Registration is best-effort: a rejected callback does not prevent the
/// other callbacks of the same subscriber from being subscribed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The subscriber type declares no usable callback methods.
    #[error("subscriber {subscriber} has no callback methods")]
    NoSubscriberMethods {
        /// Subscriber type name.
        subscriber: &'static str,
    },

    /// The subscriber is already subscribed to this message type.
    #[error("subscriber {subscriber} is already subscribed to {message_type}")]
    DuplicateSubscription {
        /// Subscriber type name.
        subscriber: &'static str,
        /// Message type name.
        message_type: &'static str,
    },

    /// A declared callback does not take exactly one message parameter.
    #[error("callback {subscriber}::{method} must take one message parameter, found {params}")]
    MultiParameterCallback {
        /// Subscriber type name.
        subscriber: &'static str,
        /// Declared callback name.
        method: String,
        /// Number of declared parameters.
        params: usize,
    },
}

impl RegisterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventline::RegisterError;
    ///
    /// let err = RegisterError::NoSubscriberMethods { subscriber: "Screen" };
    /// assert_eq!(err.as_label(), "register_no_subscriber_methods");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegisterError::NoSubscriberMethods { .. } => "register_no_subscriber_methods",
            RegisterError::DuplicateSubscription { .. } => "register_duplicate_subscription",
            RegisterError::MultiParameterCallback { .. } => "register_multi_parameter_callback",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegisterError::NoSubscriberMethods { subscriber } => {
                format!("no callbacks: subscriber={subscriber}")
            }
            RegisterError::DuplicateSubscription {
                subscriber,
                message_type,
            } => format!("duplicate: subscriber={subscriber} message={message_type}"),
            RegisterError::MultiParameterCallback {
                subscriber,
                method,
                params,
            } => format!("bad arity: callback={subscriber}::{method} params={params}"),
        }
    }
}

/// # Errors produced by a subscriber callback.
///
/// These are caught by the dispatcher, logged, optionally re-published as
/// [`SubscriberFailed`](crate::SubscriberFailed), and never propagated to the poster.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// Callback returned an error.
    #[error("callback failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Callback panicked.
    #[error("callback panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Callback received a value of an unexpected type.
    ///
    /// Only reachable through hand-written [`RawHandler`](crate::RawHandler)s.
    #[error("callback expected {expected}")]
    TypeMismatch {
        /// Type name the callback was declared for.
        expected: &'static str,
    },
}

impl CallbackError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventline::CallbackError;
    ///
    /// let err = CallbackError::Failed { error: "boom".into() };
    /// assert_eq!(err.as_label(), "callback_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallbackError::Failed { .. } => "callback_failed",
            CallbackError::Panicked { .. } => "callback_panicked",
            CallbackError::TypeMismatch { .. } => "callback_type_mismatch",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CallbackError::Failed { error } => format!("error: {error}"),
            CallbackError::Panicked { info } => format!("panic: {info}"),
            CallbackError::TypeMismatch { expected } => format!("expected: {expected}"),
        }
    }

    /// Builds a [`CallbackError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        CallbackError::Panicked { info }
    }
}

/// # Errors produced by the bus lifecycle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A default bus already exists (either installed or lazily created by `get_default`).
    #[error("default bus already installed")]
    DefaultAlreadyInstalled,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::DefaultAlreadyInstalled => "bus_default_already_installed",
        }
    }
}
