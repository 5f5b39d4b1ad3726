//! Test utilities for polar-flux stores and actions
//!
//! - [`Recorder`]: collects every value an observable delivers
//! - Assertion macros for checking recorded values
//!
//! # Example
//!
//! ```
//! use polar_flux_core::testing::Recorder;
//! use polar_flux_core::{assert_recorded, Store};
//!
//! let (store, add) = Store::define(1i64, |ctx| {
//!     ctx.create_reducer(|s: &i64, n: &i64| s + n).handle()
//! });
//!
//! let recorder = Recorder::attach(&store.observe());
//! add.execute(5);
//!
//! assert_eq!(recorder.values(), vec![1, 6]);
//! assert_recorded!(recorder.values(), 6);
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::observable::Observable;
use crate::subscription::Subscription;

/// Records the values delivered to one subscription.
///
/// The subscription is cancelled when the recorder is dropped.
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
    subscription: Subscription,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    /// Subscribe to `observable` and start recording.
    ///
    /// For store views the current state is recorded immediately.
    pub fn attach(observable: &Observable<T>) -> Self {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&values);
        let subscription = observable.subscribe(move |value: &T| {
            sink.lock().push(value.clone());
        });
        Self {
            values,
            subscription,
        }
    }

    /// Everything recorded so far, oldest first.
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    /// The most recent value.
    pub fn last(&self) -> Option<T> {
        self.values.lock().last().cloned()
    }

    /// Take all recorded values, leaving the recorder empty.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.lock())
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// The underlying subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Stop recording. Values recorded so far are kept.
    pub fn stop(&self) {
        self.subscription.cancel();
    }
}

impl<T> Drop for Recorder<T> {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}

impl<T: fmt::Debug> fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("values", &*self.values.lock())
            .field("closed", &self.subscription.is_closed())
            .finish()
    }
}

/// Assert that a value matching the pattern was recorded.
///
/// # Example
///
/// ```ignore
/// use polar_flux::assert_recorded;
///
/// let values = recorder.values();
/// assert_recorded!(values, Counter { value: 7 });
/// assert_recorded!(values, Counter { value } if *value > 5);
/// ```
#[macro_export]
macro_rules! assert_recorded {
    ($values:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $values.iter().any(|v| matches!(v, $pattern $(if $guard)?)),
            "Expected value matching `{}` to be recorded, but got: {:?}",
            stringify!($pattern),
            $values
        );
    };
}

/// Assert that no value matching the pattern was recorded.
///
/// # Example
///
/// ```ignore
/// use polar_flux::assert_not_recorded;
///
/// assert_not_recorded!(recorder.values(), Counter { value: 11 });
/// ```
#[macro_export]
macro_rules! assert_not_recorded {
    ($values:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$values.iter().any(|v| matches!(v, $pattern $(if $guard)?)),
            "Expected value matching `{}` NOT to be recorded, but it was: {:?}",
            stringify!($pattern),
            $values
        );
    };
}

/// Count how many recorded values match a pattern.
///
/// # Example
///
/// ```ignore
/// use polar_flux::count_recorded;
///
/// assert_eq!(count_recorded!(recorder.values(), Counter { value } if *value % 2 == 0), 2);
/// ```
#[macro_export]
macro_rules! count_recorded {
    ($values:expr, $pattern:pat $(if $guard:expr)?) => {
        $values.iter().filter(|v| matches!(v, $pattern $(if $guard)?)).count()
    };
}
