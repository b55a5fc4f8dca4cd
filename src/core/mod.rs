//! Runtime core: registry, dispatch and the bus facade.
//!
//! The public API from this module is [`Bus`], [`BusBuilder`], [`Config`] and
//! [`Registration`].
//!
//! Internal modules:
//! - [`registry`]: subscription indexes with copy-on-write snapshots;
//! - [`dispatcher`]: per-mode routing and failure isolation;
//! - [`bus`]: register / unregister / post / sticky;
//! - [`builder`]: backend wiring and default-instance installation.

mod builder;
mod bus;
mod config;
mod dispatcher;
mod registry;

pub use builder::BusBuilder;
pub use bus::{Bus, Registration};
pub use config::Config;
