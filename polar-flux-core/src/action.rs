//! Actions: the only sanctioned way to ask a store for a state change
//!
//! An [`Action`] has two faces. Callers invoke it with
//! [`execute`](Action::execute); the owning store listens to it through
//! [`observe`](Action::observe) / [`subscribe`](Action::subscribe). Stores hand
//! out the narrower [`ActionHandle`] so outside code can trigger an action
//! but never listen to or rewire it.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::observable::Observable;
use crate::subject::Subject;
use crate::subscription::Subscription;

const UNNAMED: &str = "action";

/// Capability to trigger an action and nothing else.
pub trait Execute<P> {
    /// Deliver `parameter` to every listener of the action.
    fn execute(&self, parameter: P);
}

/// Typed trigger that notifies its listeners, in registration order, each
/// time it is executed.
///
/// Clones share the same listeners. Emissions are not replayed: a listener
/// only sees executions that happen after it subscribed.
///
/// # Example
///
/// ```
/// use polar_flux_core::Action;
/// use std::sync::{Arc, Mutex};
///
/// let rename = Action::<String>::named("rename");
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let sink = log.clone();
/// rename.subscribe(move |name| sink.lock().unwrap().push(name.clone()));
///
/// rename.execute("inbox".to_string());
/// assert_eq!(*log.lock().unwrap(), vec!["inbox".to_string()]);
/// ```
pub struct Action<P> {
    name: Arc<str>,
    events: Subject<P>,
}

impl<P: 'static> Action<P> {
    /// Create an unwired action.
    pub fn new() -> Self {
        Self::named(UNNAMED)
    }

    /// Create an unwired action with a name used in logs.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            events: Subject::new(),
        }
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Synchronously notify every listener registered right now.
    ///
    /// A panicking listener is not caught here; the panic reaches the caller
    /// and listeners after it are not notified.
    pub fn execute(&self, parameter: P) {
        trace!(
            action = %self.name,
            listeners = self.events.subscriber_count(),
            "executing action"
        );
        self.events.next(&parameter);
    }

    /// Read-only view of the executions. No replay.
    pub fn observe(&self) -> Observable<P> {
        self.events.observe()
    }

    /// Listen to future executions.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.events.subscriber_count()
    }

    /// Execute-only view of this action.
    pub fn handle(&self) -> ActionHandle<P> {
        ActionHandle {
            action: self.clone(),
        }
    }
}

impl<P: 'static> Default for Action<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for Action<P> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            events: self.events.clone(),
        }
    }
}

impl<P: 'static> fmt::Debug for Action<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<P: 'static> Execute<P> for Action<P> {
    fn execute(&self, parameter: P) {
        Action::execute(self, parameter)
    }
}

/// Execute-only capability for an [`Action`].
///
/// This is what a store exposes publicly; holders cannot subscribe to the
/// action or attach new handlers.
pub struct ActionHandle<P> {
    action: Action<P>,
}

impl<P: 'static> ActionHandle<P> {
    /// Trigger the action.
    pub fn execute(&self, parameter: P) {
        self.action.execute(parameter);
    }

    /// Name of the underlying action.
    pub fn name(&self) -> &str {
        self.action.name()
    }
}

impl<P> Clone for ActionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
        }
    }
}

impl<P: 'static> fmt::Debug for ActionHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionHandle").field(&self.action.name).finish()
    }
}

impl<P: 'static> Execute<P> for ActionHandle<P> {
    fn execute(&self, parameter: P) {
        ActionHandle::execute(self, parameter)
    }
}

impl<P: 'static> From<Action<P>> for ActionHandle<P> {
    fn from(action: Action<P>) -> Self {
        Self { action }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_execute_without_listeners_is_noop() {
        let action = Action::<u8>::new();
        action.execute(1);
        assert_eq!(action.listener_count(), 0);
        assert_eq!(action.name(), "action");
    }

    #[test]
    fn test_listeners_run_in_order_and_complete() {
        let action = Action::<i32>::named("step");
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1_running = Arc::new(AtomicBool::new(false));

        {
            let log = log.clone();
            let running = l1_running.clone();
            action.subscribe(move |x| {
                running.store(true, Ordering::SeqCst);
                log.lock().unwrap().push(format!("L1 start {x}"));
                log.lock().unwrap().push(format!("L1 end {x}"));
                running.store(false, Ordering::SeqCst);
            });
        }
        {
            let log = log.clone();
            let running = l1_running.clone();
            action.subscribe(move |x| {
                assert!(!running.load(Ordering::SeqCst), "L1 must finish first");
                log.lock().unwrap().push(format!("L2 {x}"));
            });
        }

        action.execute(9);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["L1 start 9", "L1 end 9", "L2 9"]
        );
    }

    #[test]
    fn test_no_replay_for_late_listener() {
        let action = Action::<i32>::new();
        action.execute(5);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        action.subscribe(move |x| sink.lock().unwrap().push(*x));

        assert!(seen.lock().unwrap().is_empty());
        action.execute(6);
        assert_eq!(*seen.lock().unwrap(), vec![6]);
    }

    #[test]
    fn test_handle_executes_shared_action() {
        let action = Action::<()>::named("ping");
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        action.subscribe(move |_| flag.store(true, Ordering::SeqCst));

        let handle = action.handle();
        assert_eq!(handle.name(), "ping");
        handle.execute(());
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_execute_trait_object() {
        let action = Action::<u32>::new();
        let total = Arc::new(Mutex::new(0u32));
        let sink = total.clone();
        action.subscribe(move |n| *sink.lock().unwrap() += n);

        let triggers: Vec<Box<dyn Execute<u32>>> =
            vec![Box::new(action.clone()), Box::new(ActionHandle::from(action))];
        for trigger in &triggers {
            trigger.execute(2);
        }
        assert_eq!(*total.lock().unwrap(), 4);
    }
}
