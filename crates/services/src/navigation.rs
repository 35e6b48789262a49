use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use rogaine_core::view::View;

/// Work to run when the player navigates away from a view.
#[async_trait]
pub trait LeaveHandler: Send + Sync {
    async fn on_leave(&self, to: View);
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<View, (u64, Arc<dyn LeaveHandler>)>,
}

type SharedRegistry = Arc<Mutex<Registry>>;

fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-view leave hooks, run on navigation within a time budget.
pub struct NavigationHooks {
    registry: SharedRegistry,
    budget: Duration,
}

/// Keeps a leave hook registered; dropping it removes the hook.
#[must_use = "the hook is removed when the registration is dropped"]
pub struct LeaveHookRegistration {
    registry: Weak<Mutex<Registry>>,
    view: View,
    id: u64,
}

impl Drop for LeaveHookRegistration {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut guard = lock(&registry);
        // A newer registration for the same view stays in place.
        if guard
            .handlers
            .get(&self.view)
            .is_some_and(|(id, _)| *id == self.id)
        {
            guard.handlers.remove(&self.view);
        }
    }
}

impl NavigationHooks {
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            registry: SharedRegistry::default(),
            budget,
        }
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Register `handler` for leaving `view`, replacing any earlier one.
    pub fn register(&self, view: View, handler: Arc<dyn LeaveHandler>) -> LeaveHookRegistration {
        let mut guard = lock(&self.registry);
        guard.next_id += 1;
        let id = guard.next_id;
        guard.handlers.insert(view, (id, handler));
        LeaveHookRegistration {
            registry: Arc::downgrade(&self.registry),
            view,
            id,
        }
    }

    #[must_use]
    pub fn is_registered(&self, view: View) -> bool {
        lock(&self.registry).handlers.contains_key(&view)
    }

    /// Run the hook for `from`, waiting at most the budget, and return `to`.
    ///
    /// A hook that outlives the budget keeps running in the background.
    pub async fn navigate(&self, from: View, to: View) -> View {
        let handler = lock(&self.registry)
            .handlers
            .get(&from)
            .map(|(_, handler)| Arc::clone(handler));
        let Some(handler) = handler else {
            return to;
        };

        let task = tokio::spawn(async move { handler.on_leave(to).await });
        match tokio::time::timeout(self.budget, task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("leave hook for {from} failed: {err}"),
            Err(_) => log::debug!("leave hook for {from} still running after {:?}", self.budget),
        }
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl LeaveHandler for Counting {
        async fn on_leave(&self, _to: View) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Stuck;

    #[async_trait]
    impl LeaveHandler for Stuck {
        async fn on_leave(&self, _to: View) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
    }

    #[tokio::test]
    async fn dropped_registration_is_never_invoked() {
        let hooks = NavigationHooks::new(Duration::from_secs(1));
        let calls = Arc::new(AtomicUsize::new(0));

        let registration = hooks.register(View::Result, Arc::new(Counting(Arc::clone(&calls))));
        assert_eq!(hooks.navigate(View::Result, View::Home).await, View::Home);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(registration);
        assert!(!hooks.is_registered(View::Result));
        hooks.navigate(View::Result, View::Home).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_registration_does_not_remove_newer_one() {
        let hooks = NavigationHooks::new(Duration::from_secs(1));
        let calls = Arc::new(AtomicUsize::new(0));

        let old = hooks.register(View::Result, Arc::new(Counting(Arc::clone(&calls))));
        let _new = hooks.register(View::Result, Arc::new(Counting(Arc::clone(&calls))));
        drop(old);

        assert!(hooks.is_registered(View::Result));
        hooks.navigate(View::Result, View::Setup).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_hook_does_not_block_navigation() {
        let hooks = NavigationHooks::new(Duration::from_millis(200));
        let _registration = hooks.register(View::Result, Arc::new(Stuck));

        let to = hooks.navigate(View::Result, View::Rules).await;
        assert_eq!(to, View::Rules);
    }
}
