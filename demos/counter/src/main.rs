//! Counter - Minimal polar-flux example
//!
//! The same store the crate docs describe, driven from `main`:
//! - State: What the store knows
//! - Store: Actions wired to transitions
//! - Renderer: An async task following the state stream
//!
//! Run with `RUST_LOG=debug` to see the middleware log every transition.
//! An optional argument replaces the amount passed to `add` (default 5).

use polar_flux::prelude::*;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// State - What the store knows
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct CounterState {
    value: i64,
}

// ============================================================================
// Store - Actions and the transitions they trigger
// ============================================================================

struct CounterStore {
    store: Store<CounterState>,
    increment: ActionHandle<()>,
    add: ActionHandle<i64>,
}

impl CounterStore {
    fn new() -> Self {
        let (store, (increment, add)) = Store::builder(CounterState { value: 1 })
            .name("counter")
            .middleware(LoggingMiddleware::new())
            .define(|ctx| {
                let updater = ctx.clone();
                let increment = ctx.create_action_and_subscribe(move |_: &()| {
                    updater.update_state(|s| CounterState { value: s.value + 1 });
                });
                let add = ctx.create_reducer(|s: &CounterState, n: &i64| CounterState {
                    value: s.value + n,
                });
                (increment.handle(), add.handle())
            });

        Self {
            store,
            increment,
            add,
        }
    }
}

impl ObservableStore<CounterState> for CounterStore {
    fn store(&self) -> &Store<CounterState> {
        &self.store
    }
}

// ============================================================================
// Main - Wire logging, follow the state, execute actions
// ============================================================================

/// Value after one `increment` and one `add(amount)`, if it fits.
fn final_value(start: i64, amount: i64) -> Option<i64> {
    start.checked_add(1)?.checked_add(amount)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let amount = match std::env::args().nth(1).map(|arg| arg.parse::<i64>()) {
        Some(Ok(n)) => n,
        Some(Err(err)) => {
            error!(%err, "amount must be an integer");
            return;
        }
        None => 5,
    };

    let counter = CounterStore::new();
    let Some(target) = final_value(counter.state().value, amount) else {
        error!(amount, "amount would overflow the counter");
        return;
    };

    // Audit trail that lives until shutdown.
    let shutdown = CancellationToken::new();
    counter
        .subscribe(|s| info!(value = s.value, "state published"))
        .cancel_on(shutdown.clone());

    let mut states = counter.observe().into_stream();
    let renderer = tokio::spawn(async move {
        while let Some(state) = states.next().await {
            println!("count = {}", state.value);
            if state.value == target {
                break;
            }
        }
    });

    counter.increment.execute(());
    counter.add.execute(amount);

    if let Err(err) = renderer.await {
        error!(%err, "renderer task failed");
    }
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_value() {
        assert_eq!(final_value(1, 5), Some(7));
        assert_eq!(final_value(1, -3), Some(-1));
        assert_eq!(final_value(1, i64::MAX), None);
        assert_eq!(final_value(i64::MAX, 0), None);
    }

    #[test]
    fn test_counter_store_reaches_final_value() {
        let counter = CounterStore::new();
        counter.increment.execute(());
        counter.add.execute(5);
        assert_eq!(Some(counter.state().value), final_value(1, 5));
    }
}
