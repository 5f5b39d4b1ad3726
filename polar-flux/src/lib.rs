//! polar-flux: unidirectional data flow stores for Rust
//!
//! Like Flux, but with the concurrency contract spelled out. A store owns one
//! immutable state value; callers change it only by executing the store's
//! actions, and every subscriber sees the same ordered sequence of states.
//!
//! # Example
//! ```
//! use polar_flux::prelude::*;
//!
//! let (store, toggle) = Store::define(false, |ctx| {
//!     ctx.create_reducer(|on: &bool, _: &()| !on).handle()
//! });
//!
//! toggle.execute(());
//! assert!(*store.state());
//! ```

// Re-export everything from core
pub use polar_flux_core::*;

/// Prelude for convenient imports
pub mod prelude {
    // Actions
    pub use polar_flux_core::{Action, ActionHandle, Execute};

    // Stores
    pub use polar_flux_core::{ObservableStore, Store, StoreBuilder, StoreContext, UpdateError};

    // Middleware
    pub use polar_flux_core::{ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware};

    // Channels
    pub use polar_flux_core::{Observable, Subscription, SubscriptionGuard, SubscriptionSet};

    #[cfg(feature = "stream")]
    pub use polar_flux_core::ObservableStream;
}
