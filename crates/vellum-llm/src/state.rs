//! Observable registry state.
//!
//! The registry pushes a [`RegistrySnapshot`] into a [`StateSink`] after
//! every lifecycle, health, or provider change. [`ProviderStore`] is the
//! bundled sink: it keeps the latest snapshot and calls registered observers
//! synchronously, in registration order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use vellum_config::Provider;

use crate::registry::RegistryLifecycle;
use crate::types::AdapterHealthStatus;

/// Point-in-time view of the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    pub lifecycle: RegistryLifecycle,
    pub current_provider: Option<Provider>,
    pub statuses: BTreeMap<Provider, AdapterHealthStatus>,
    pub last_error: Option<String>,
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self {
            lifecycle: RegistryLifecycle::Uninitialized,
            current_provider: None,
            statuses: BTreeMap::new(),
            last_error: None,
        }
    }
}

impl RegistrySnapshot {
    /// Providers whose status is healthy.
    pub fn healthy_providers(&self) -> Vec<Provider> {
        self.statuses
            .iter()
            .filter(|(_, status)| status.is_healthy())
            .map(|(provider, _)| *provider)
            .collect()
    }
}

/// Receiver of registry state updates.
pub trait StateSink: Send + Sync {
    fn publish(&self, snapshot: &RegistrySnapshot);
}

/// Sink that discards updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StateSink for NullSink {
    fn publish(&self, _snapshot: &RegistrySnapshot) {}
}

/// Handle returned by [`ProviderStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&RegistrySnapshot) + Send + Sync>;

/// Latest-value store with explicit observer registration.
#[derive(Default)]
pub struct ProviderStore {
    current: RwLock<RegistrySnapshot>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_id: AtomicU64,
}

impl ProviderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It is not called with the current value.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&RegistrySnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> RegistrySnapshot {
        self.current.read().clone()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}

impl StateSink for ProviderStore {
    fn publish(&self, snapshot: &RegistrySnapshot) {
        *self.current.write() = snapshot.clone();

        // Observers may subscribe or unsubscribe from inside the callback.
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(snapshot);
        }
    }
}

impl std::fmt::Debug for ProviderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderStore")
            .field("current", &*self.current.read())
            .field("observers", &self.observer_count())
            .finish()
    }
}
