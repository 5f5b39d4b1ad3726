//! Middleware hooks around state transitions
//!
//! Middleware sees every transition a store applies, including ones queued
//! by nested updates. Hooks run inside the store's serialized section, so
//! they observe transitions in exactly the order subscribers do.

use std::fmt;

/// Observer of a store's transitions.
///
/// Hooks only see states; they cannot alter or veto a transition.
pub trait Middleware<S>: Send + Sync {
    /// Called with the current state, before the transform runs.
    fn before(&self, store: &str, current: &S);

    /// Called once the replacement state is computed, before subscribers are
    /// notified.
    fn after(&self, store: &str, previous: &S, next: &S);
}

/// Default for stores built without middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<S> Middleware<S> for NoopMiddleware {
    fn before(&self, _store: &str, _current: &S) {}
    fn after(&self, _store: &str, _previous: &S, _next: &S) {}
}

/// Emits `tracing` debug events for transitions.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Log the state a transform is about to read
    pub log_before: bool,
    /// Log each previous/next pair
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Only the previous/next pair of each transition.
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Both the input state and the resulting pair.
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<S: fmt::Debug> Middleware<S> for LoggingMiddleware {
    fn before(&self, store: &str, current: &S) {
        if self.log_before {
            tracing::debug!(store = %store, state = ?current, "Applying transition");
        }
    }

    fn after(&self, store: &str, previous: &S, next: &S) {
        if self.log_after {
            tracing::debug!(
                store = %store,
                previous = ?previous,
                next = ?next,
                "Transition computed"
            );
        }
    }
}

/// Several middlewares installed on one store.
///
/// `before` runs in insertion order, `after` in reverse, so the first one
/// added wraps every other.
pub struct ComposedMiddleware<S> {
    middlewares: Vec<Box<dyn Middleware<S>>>,
}

impl<S> fmt::Debug for ComposedMiddleware<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("len", &self.middlewares.len())
            .finish()
    }
}

impl<S> Default for ComposedMiddleware<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ComposedMiddleware<S> {
    /// Start with no middleware.
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Append `middleware` as the innermost one.
    pub fn add<M: Middleware<S> + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Box::new(middleware));
        self
    }
}

impl<S> Middleware<S> for ComposedMiddleware<S> {
    fn before(&self, store: &str, current: &S) {
        for middleware in &self.middlewares {
            middleware.before(store, current);
        }
    }

    fn after(&self, store: &str, previous: &S, next: &S) {
        for middleware in self.middlewares.iter().rev() {
            middleware.after(store, previous, next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware<i32> for Tagged {
        fn before(&self, store: &str, current: &i32) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{} before {store} {current}", self.tag));
        }

        fn after(&self, store: &str, previous: &i32, next: &i32) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{} after {store} {previous}->{next}", self.tag));
        }
    }

    #[test]
    fn test_composed_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let composed = ComposedMiddleware::new()
            .add(Tagged {
                tag: "a",
                log: log.clone(),
            })
            .add(Tagged {
                tag: "b",
                log: log.clone(),
            });

        composed.before("counter", &1);
        composed.after("counter", &1, &2);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a before counter 1",
                "b before counter 1",
                "b after counter 1->2",
                "a after counter 1->2",
            ]
        );
    }

    #[test]
    fn test_composed_debug_reports_len() {
        let composed = ComposedMiddleware::<i32>::default()
            .add(NoopMiddleware)
            .add(LoggingMiddleware::new());
        assert_eq!(format!("{composed:?}"), "ComposedMiddleware { len: 2 }");
    }

    #[test]
    fn test_logging_presets() {
        let quiet = LoggingMiddleware::new();
        assert!(!quiet.log_before);
        assert!(quiet.log_after);

        let verbose = LoggingMiddleware::verbose();
        assert!(verbose.log_before);
        assert!(verbose.log_after);

        // No subscriber installed; just make sure the hooks run.
        Middleware::<i32>::before(&verbose, "counter", &1);
        Middleware::<i32>::after(&verbose, "counter", &1, &2);
    }
}
