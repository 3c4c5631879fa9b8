//! Adapter registry: one adapter per provider, health bookkeeping, and the
//! validated provider switch.
//!
//! The registry is constructed once by the host and shared as
//! `Arc<AdapterRegistry>`. It is the only writer of health records and of
//! the current provider; everything else observes through
//! [`RegistrySnapshot`]s pushed into the [`StateSink`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use vellum_config::{AiSettings, Provider};

use crate::adapter::{AdapterContext, SharedAdapter};
use crate::catalog;
use crate::error::{LlmError, Result};
use crate::notify::Notice;
use crate::providers::HttpAdapterFactory;
use crate::state::{RegistrySnapshot, StateSink};
use crate::types::AdapterHealthStatus;

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle & Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Registry lifecycle.
///
/// `Uninitialized → Initializing → Ready → Destroying → Destroyed`, or
/// `Initializing → Error` when no adapter could be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryLifecycle {
    Uninitialized,
    Initializing,
    Ready,
    Destroying,
    Destroyed,
    Error,
}

impl std::fmt::Display for RegistryLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegistryLifecycle::Uninitialized => "uninitialized",
            RegistryLifecycle::Initializing => "initializing",
            RegistryLifecycle::Ready => "ready",
            RegistryLifecycle::Destroying => "destroying",
            RegistryLifecycle::Destroyed => "destroyed",
            RegistryLifecycle::Error => "error",
        };
        f.write_str(name)
    }
}

/// Creates the adapter for a provider.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, provider: Provider, context: &AdapterContext) -> Result<SharedAdapter>;
}

impl<F> AdapterFactory for F
where
    F: Fn(Provider, &AdapterContext) -> Result<SharedAdapter> + Send + Sync,
{
    fn create(&self, provider: Provider, context: &AdapterContext) -> Result<SharedAdapter> {
        self(provider, context)
    }
}

/// Resets the single-flight flag when a switch ends, however it ends.
struct SwitchGuard<'a>(&'a AtomicBool);

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Owns every provider adapter and the current-provider pointer.
pub struct AdapterRegistry {
    context: AdapterContext,
    factory: Box<dyn AdapterFactory>,
    sink: Arc<dyn StateSink>,
    adapters: RwLock<HashMap<Provider, SharedAdapter>>,
    statuses: RwLock<BTreeMap<Provider, AdapterHealthStatus>>,
    current: RwLock<Option<Provider>>,
    last_error: RwLock<Option<String>>,
    lifecycle: RwLock<RegistryLifecycle>,
    switching: AtomicBool,
    watcher: Mutex<Option<JoinHandle<()>>>,
    // Held across snapshot and delivery so the sink sees states in order.
    publish_lock: Mutex<()>,
}

impl AdapterRegistry {
    /// Registry backed by the HTTP adapters.
    pub fn new(context: AdapterContext, sink: Arc<dyn StateSink>) -> Arc<Self> {
        Self::with_factory(context, HttpAdapterFactory, sink)
    }

    /// Registry with a custom adapter factory.
    pub fn with_factory(
        context: AdapterContext,
        factory: impl AdapterFactory + 'static,
        sink: Arc<dyn StateSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            context,
            factory: Box::new(factory),
            sink,
            adapters: RwLock::new(HashMap::new()),
            statuses: RwLock::new(BTreeMap::new()),
            current: RwLock::new(None),
            last_error: RwLock::new(None),
            lifecycle: RwLock::new(RegistryLifecycle::Uninitialized),
            switching: AtomicBool::new(false),
            watcher: Mutex::new(None),
            publish_lock: Mutex::new(()),
        })
    }

    /// Create one adapter per provider and start following settings changes.
    ///
    /// A provider whose adapter fails to construct is recorded as unhealthy;
    /// only a registry with no adapters at all fails.
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.write();
            match *lifecycle {
                RegistryLifecycle::Uninitialized | RegistryLifecycle::Destroyed => {
                    *lifecycle = RegistryLifecycle::Initializing;
                }
                other => {
                    return Err(LlmError::NotReady(format!(
                        "cannot initialize registry while {}",
                        other
                    )));
                }
            }
        }
        tracing::info!("Initializing adapter registry");
        self.publish();

        let settings = self.context.settings.snapshot();
        let mut adapters = HashMap::new();
        let mut statuses = BTreeMap::new();

        for provider in Provider::ALL {
            match self.factory.create(provider, &self.context) {
                Ok(adapter) => {
                    if let Some(secret) = settings.resolve_api_key(provider) {
                        tracing::debug!(provider = %provider, source = %secret.source, "API key resolved");
                        adapter.set_api_key(Some(secret.value));
                    }
                    adapters.insert(provider, adapter);
                    statuses.insert(provider, AdapterHealthStatus::initialized());
                }
                Err(e) => {
                    tracing::warn!(provider = %provider, error = %e, "Failed to create adapter");
                    statuses.insert(provider, AdapterHealthStatus::failed(e.to_string()));
                }
            }
        }

        let registered = adapters.len();
        *self.adapters.write() = adapters;
        *self.statuses.write() = statuses;

        if registered == 0 {
            let message = "no provider adapters could be created".to_string();
            *self.last_error.write() = Some(message.clone());
            *self.lifecycle.write() = RegistryLifecycle::Error;
            tracing::error!("Adapter registry failed to initialize: {}", message);
            self.publish();
            return Err(LlmError::Internal(message));
        }

        let selected = settings.selected_provider();
        let current = if self.adapters.read().contains_key(&selected) {
            Some(selected)
        } else {
            tracing::warn!(provider = %selected, "Selected provider has no adapter");
            None
        };
        *self.current.write() = current;
        *self.last_error.write() = None;
        *self.lifecycle.write() = RegistryLifecycle::Ready;

        self.spawn_watcher(settings);
        tracing::info!(
            adapters = registered,
            current = ?current,
            "Adapter registry ready"
        );
        self.publish();
        Ok(())
    }

    fn spawn_watcher(self: &Arc<Self>, initial: AiSettings) {
        let mut rx = self.context.settings.subscribe();
        let registry: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut previous = initial;
            while rx.changed().await.is_ok() {
                let settings = rx.borrow_and_update().clone();
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.apply_settings(&previous, &settings).await;
                previous = settings;
            }
        });

        if let Some(old) = self.watcher.lock().replace(handle) {
            old.abort();
        }
    }

    /// React to a settings change: push changed keys into adapters, then run
    /// the switch protocol if the selected provider diverged.
    async fn apply_settings(&self, previous: &AiSettings, settings: &AiSettings) {
        let adapters: Vec<(Provider, SharedAdapter)> = self
            .adapters
            .read()
            .iter()
            .map(|(p, a)| (*p, Arc::clone(a)))
            .collect();
        for (provider, adapter) in adapters {
            let old = previous.resolve_api_key(provider).map(|s| s.value);
            let new = settings.resolve_api_key(provider).map(|s| s.value);
            if old != new {
                tracing::debug!(provider = %provider, "API key changed");
                adapter.set_api_key(new);
            }
        }

        let selected = settings.selected_provider();
        if self.lifecycle() == RegistryLifecycle::Ready && self.current_provider() != Some(selected)
        {
            match self.switch_provider(selected).await {
                Ok(()) | Err(LlmError::SwitchFailed { .. }) => {}
                Err(e) => tracing::debug!(provider = %selected, error = %e, "Switch skipped"),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Adapter for `provider`, if registered.
    pub fn get_adapter(&self, provider: Provider) -> Option<SharedAdapter> {
        self.adapters.read().get(&provider).cloned()
    }

    /// Adapter for the current provider.
    pub fn get_current_adapter(&self) -> Result<SharedAdapter> {
        let lifecycle = self.lifecycle();
        if lifecycle != RegistryLifecycle::Ready {
            return Err(LlmError::NotReady(format!("registry is {}", lifecycle)));
        }
        let provider = self
            .current_provider()
            .ok_or_else(|| LlmError::NotReady("no provider selected".to_string()))?;
        self.get_adapter(provider).ok_or_else(|| {
            LlmError::NotReady(format!("no adapter registered for {}", provider))
        })
    }

    pub fn current_provider(&self) -> Option<Provider> {
        *self.current.read()
    }

    pub fn lifecycle(&self) -> RegistryLifecycle {
        *self.lifecycle.read()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate the adapter's API key and record the outcome.
    pub async fn validate_adapter(&self, provider: Provider) -> bool {
        let Some(adapter) = self.get_adapter(provider) else {
            return false;
        };

        let outcome = adapter.check_api_key().await;
        let valid = outcome.is_ok();
        if let Err(e) = &outcome {
            tracing::warn!(provider = %provider, error = %e, "API key validation failed");
        }

        let now = Utc::now();
        self.update_adapter_status(provider, |status| {
            status.last_validated_at = Some(now);
            status.is_connected = valid;
            match outcome {
                Ok(()) => {
                    status.last_connected_at = Some(now);
                    status.last_error = None;
                }
                Err(e) => status.last_error = Some(e.to_string()),
            }
        });
        valid
    }

    /// Connection-test the provider's first catalog model and record the outcome.
    pub async fn test_connection(&self, provider: Provider) -> bool {
        let Some(adapter) = self.get_adapter(provider) else {
            return false;
        };
        let Some(model) = catalog::default_model(provider) else {
            return false;
        };

        let outcome = adapter.health_check(None, model.api_name).await;
        let connected = outcome.is_ok();
        match &outcome {
            Ok(()) => tracing::info!(provider = %provider, model = %model.api_name, "Connection test passed"),
            Err(e) => tracing::warn!(provider = %provider, error = %e, "Connection test failed"),
        }

        self.update_adapter_status(provider, |status| {
            status.is_connected = connected;
            match outcome {
                Ok(()) => {
                    status.last_connected_at = Some(Utc::now());
                    status.last_error = None;
                }
                Err(e) => status.last_error = Some(e.to_string()),
            }
        });
        connected
    }

    /// Initialized and connected. Unregistered providers are never healthy.
    pub fn is_adapter_healthy(&self, provider: Provider) -> bool {
        self.statuses
            .read()
            .get(&provider)
            .is_some_and(AdapterHealthStatus::is_healthy)
    }

    /// Providers that are currently healthy, in provider order.
    pub fn get_healthy_adapters(&self) -> Vec<Provider> {
        self.statuses
            .read()
            .iter()
            .filter(|(_, status)| status.is_healthy())
            .map(|(provider, _)| *provider)
            .collect()
    }

    /// Copy of every health record.
    pub fn get_all_adapter_status(&self) -> BTreeMap<Provider, AdapterHealthStatus> {
        self.statuses.read().clone()
    }

    /// Mutate a provider's health record and publish the new state.
    ///
    /// Providers without a record (including every provider after
    /// [`destroy`](Self::destroy)) are left untouched.
    pub fn update_adapter_status<F>(&self, provider: Provider, update: F)
    where
        F: FnOnce(&mut AdapterHealthStatus),
    {
        {
            let mut statuses = self.statuses.write();
            let Some(status) = statuses.get_mut(&provider) else {
                return;
            };
            update(status);
        }
        self.publish();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Switch Protocol
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `target` the current provider if its adapter validates.
    ///
    /// On failure the current provider is unchanged, the error is recorded on
    /// the target's health record, and settings are written back to the
    /// previous provider. Only one switch runs at a time; a concurrent call
    /// fails with [`LlmError::SwitchInProgress`].
    pub async fn switch_provider(&self, target: Provider) -> Result<()> {
        let lifecycle = self.lifecycle();
        if lifecycle != RegistryLifecycle::Ready {
            return Err(LlmError::NotReady(format!("registry is {}", lifecycle)));
        }
        if self
            .switching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(LlmError::SwitchInProgress);
        }
        let _guard = SwitchGuard(&self.switching);

        let previous = self.current_provider();
        if previous == Some(target) {
            return Ok(());
        }
        tracing::info!(from = ?previous, to = %target, "Switching provider");

        let outcome = if self.get_adapter(target).is_none() {
            Err(LlmError::AdapterNotFound(target).to_string())
        } else if self.validate_adapter(target).await {
            Ok(())
        } else {
            Err(self.recorded_error(target))
        };

        // Teardown may have started while the target was validating.
        let lifecycle = self.lifecycle.read();
        if *lifecycle != RegistryLifecycle::Ready {
            tracing::warn!(target = %target, lifecycle = %*lifecycle, "Registry left Ready during switch, discarding");
            return Err(LlmError::NotReady(format!(
                "registry became {} during switch",
                *lifecycle
            )));
        }

        match outcome {
            Ok(()) => {
                *self.current.write() = Some(target);
                drop(lifecycle);
                *self.last_error.write() = None;
                self.context.settings.set_selected_provider(target);
                tracing::info!(provider = %target, "Provider switch committed");
                self.publish();
                Ok(())
            }
            Err(reason) => {
                drop(lifecycle);
                let err = LlmError::SwitchFailed {
                    target,
                    reason: reason.clone(),
                };
                {
                    let mut statuses = self.statuses.write();
                    statuses.entry(target).or_default().last_error = Some(reason);
                }
                *self.last_error.write() = Some(err.to_string());
                if let Some(previous) = previous {
                    self.context.settings.set_selected_provider(previous);
                }

                tracing::warn!(target = %target, previous = ?previous, error = %err, "Provider switch rolled back");
                let staying = previous
                    .map(|p| format!(" Staying on {}.", p.display_name()))
                    .unwrap_or_default();
                self.context
                    .notifier
                    .notify(Notice::error(format!("{}.{}", err, staying)));
                self.publish();
                Err(err)
            }
        }
    }

    fn recorded_error(&self, provider: Provider) -> String {
        self.statuses
            .read()
            .get(&provider)
            .and_then(|s| s.last_error.clone())
            .unwrap_or_else(|| "validation failed".to_string())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State & Teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// Current registry state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            lifecycle: self.lifecycle(),
            current_provider: self.current_provider(),
            statuses: self.get_all_adapter_status(),
            last_error: self.last_error.read().clone(),
        }
    }

    fn publish(&self) {
        let _ordered = self.publish_lock.lock();
        self.sink.publish(&self.snapshot());
    }

    /// Stop following settings, shut every adapter down, and clear all state.
    ///
    /// Adapter shutdown failures are logged and do not abort teardown.
    pub async fn destroy(&self) {
        {
            let mut lifecycle = self.lifecycle.write();
            if matches!(
                *lifecycle,
                RegistryLifecycle::Destroying | RegistryLifecycle::Destroyed
            ) {
                return;
            }
            *lifecycle = RegistryLifecycle::Destroying;
        }
        tracing::info!("Destroying adapter registry");
        self.publish();

        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }

        let adapters: Vec<(Provider, SharedAdapter)> = self.adapters.write().drain().collect();
        for (provider, adapter) in adapters {
            if let Err(e) = adapter.shutdown().await {
                tracing::warn!(provider = %provider, error = %e, "Adapter cleanup failed");
            }
        }

        self.statuses.write().clear();
        *self.current.write() = None;
        *self.last_error.write() = None;
        *self.lifecycle.write() = RegistryLifecycle::Destroyed;
        tracing::info!("Adapter registry destroyed");
        self.publish();
    }
}

impl Drop for AdapterRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("lifecycle", &self.lifecycle())
            .field("current", &self.current_provider())
            .field("adapters", &self.adapters.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAdapter;
    use crate::notify::{NoticeLevel, RecordingNotifier};
    use crate::state::ProviderStore;
    use std::time::Duration;
    use vellum_config::{SettingsSource, SettingsStore};

    struct Harness {
        registry: Arc<AdapterRegistry>,
        settings: Arc<SettingsStore>,
        notifier: Arc<RecordingNotifier>,
        store: Arc<ProviderStore>,
        mocks: HashMap<Provider, Arc<MockAdapter>>,
    }

    fn harness(providers: &[Provider]) -> Harness {
        let mut initial = AiSettings::default();
        initial.selected_provider = Some(Provider::OpenAi);
        let settings = Arc::new(SettingsStore::new(initial));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = Arc::new(ProviderStore::new());

        let mocks: HashMap<Provider, Arc<MockAdapter>> = providers
            .iter()
            .map(|p| (*p, Arc::new(MockAdapter::new(*p))))
            .collect();
        let factory_mocks = mocks.clone();
        let factory = move |provider: Provider, _ctx: &AdapterContext| {
            factory_mocks
                .get(&provider)
                .map(|m| Arc::clone(m) as SharedAdapter)
                .ok_or_else(|| LlmError::Config(format!("{} disabled", provider)))
        };

        let context = AdapterContext::new(settings.clone(), notifier.clone());
        let registry = AdapterRegistry::with_factory(context, factory, store.clone());
        Harness {
            registry,
            settings,
            notifier,
            store,
            mocks,
        }
    }

    #[tokio::test]
    async fn test_initialize_registers_and_records_failures() {
        let h = harness(&[Provider::OpenAi, Provider::Anthropic]);
        h.registry.initialize().await.unwrap();

        assert_eq!(h.registry.lifecycle(), RegistryLifecycle::Ready);
        assert_eq!(h.registry.current_provider(), Some(Provider::OpenAi));
        assert!(h.registry.get_adapter(Provider::Anthropic).is_some());
        assert!(h.registry.get_adapter(Provider::Google).is_none());

        let statuses = h.registry.get_all_adapter_status();
        assert_eq!(statuses.len(), Provider::ALL.len());
        assert!(statuses[&Provider::OpenAi].is_initialized);
        assert!(!statuses[&Provider::Google].is_initialized);
        assert!(statuses[&Provider::Google].last_error.is_some());
        assert!(!h.registry.is_adapter_healthy(Provider::Google));

        assert_eq!(h.store.current().lifecycle, RegistryLifecycle::Ready);
    }

    #[tokio::test]
    async fn test_initialize_with_no_adapters_errors() {
        let h = harness(&[]);
        assert!(h.registry.initialize().await.is_err());
        assert_eq!(h.registry.lifecycle(), RegistryLifecycle::Error);
        assert!(h.registry.get_current_adapter().is_err());
    }

    #[tokio::test]
    async fn test_current_adapter_requires_ready() {
        let h = harness(&[Provider::OpenAi]);
        assert!(matches!(
            h.registry.get_current_adapter(),
            Err(LlmError::NotReady(_))
        ));

        h.registry.initialize().await.unwrap();
        let adapter = h.registry.get_current_adapter().unwrap();
        assert_eq!(adapter.provider(), Provider::OpenAi);
    }

    #[tokio::test]
    async fn test_connection_updates_health() {
        let h = harness(&[Provider::OpenAi, Provider::Groq]);
        h.mocks[&Provider::Groq].set_reply(crate::GenerationResult::Failure(
            LlmError::HttpStatus {
                status: 401,
                message: "invalid key".to_string(),
            },
        ));
        h.registry.initialize().await.unwrap();

        assert!(h.registry.test_connection(Provider::OpenAi).await);
        assert!(!h.registry.test_connection(Provider::Groq).await);

        let statuses = h.registry.get_all_adapter_status();
        assert!(statuses[&Provider::OpenAi].last_connected_at.is_some());
        assert!(
            statuses[&Provider::Groq]
                .last_error
                .as_deref()
                .unwrap()
                .contains("401")
        );
        assert_eq!(h.registry.get_healthy_adapters(), vec![Provider::OpenAi]);
        assert_eq!(h.store.current().healthy_providers(), vec![Provider::OpenAi]);

        let (_, model) = &h.mocks[&Provider::OpenAi].requests()[0];
        assert_eq!(model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_validate_adapter_records_timestamp() {
        let h = harness(&[Provider::OpenAi, Provider::Mistral]);
        h.mocks[&Provider::Mistral].set_valid(false);
        h.registry.initialize().await.unwrap();

        assert!(!h.registry.validate_adapter(Provider::Mistral).await);
        let status = &h.registry.get_all_adapter_status()[&Provider::Mistral];
        assert!(status.last_validated_at.is_some());
        assert!(!status.is_connected);
        assert!(status.last_error.is_some());

        assert!(h.registry.validate_adapter(Provider::OpenAi).await);
        assert!(h.registry.is_adapter_healthy(Provider::OpenAi));
    }

    #[tokio::test]
    async fn test_switch_commits_on_valid_adapter() {
        let h = harness(&[Provider::OpenAi, Provider::Anthropic]);
        h.registry.initialize().await.unwrap();

        h.registry.switch_provider(Provider::Anthropic).await.unwrap();

        assert_eq!(h.registry.current_provider(), Some(Provider::Anthropic));
        assert_eq!(
            h.settings.snapshot().selected_provider,
            Some(Provider::Anthropic)
        );
        assert_eq!(
            h.store.current().current_provider,
            Some(Provider::Anthropic)
        );
        assert!(h.registry.is_adapter_healthy(Provider::Anthropic));
    }

    #[tokio::test]
    async fn test_switch_rolls_back_on_invalid_adapter() {
        let h = harness(&[Provider::OpenAi, Provider::Anthropic]);
        h.mocks[&Provider::Anthropic].set_valid(false);
        h.registry.initialize().await.unwrap();

        let err = h
            .registry
            .switch_provider(Provider::Anthropic)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::SwitchFailed {
                target: Provider::Anthropic,
                ..
            }
        ));

        assert_eq!(h.registry.current_provider(), Some(Provider::OpenAi));
        assert_eq!(
            h.settings.snapshot().selected_provider,
            Some(Provider::OpenAi)
        );
        let status = &h.registry.get_all_adapter_status()[&Provider::Anthropic];
        assert!(status.last_error.is_some());
        assert!(h.store.current().last_error.is_some());
        assert!(h.notifier.contains(NoticeLevel::Error, "Staying on OpenAI"));
    }

    #[tokio::test]
    async fn test_destroy_during_switch_discards_commit() {
        let h = harness(&[Provider::OpenAi, Provider::Anthropic]);
        h.mocks[&Provider::Anthropic].set_validation_delay(Duration::from_millis(200));
        h.registry.initialize().await.unwrap();

        let registry = Arc::clone(&h.registry);
        let switch =
            tokio::spawn(async move { registry.switch_provider(Provider::Anthropic).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.registry.destroy().await;

        let outcome = switch.await.unwrap();
        assert!(matches!(outcome, Err(LlmError::NotReady(_))));
        assert_eq!(h.registry.current_provider(), None);
        assert!(h.registry.get_all_adapter_status().is_empty());
        assert_eq!(
            h.settings.snapshot().selected_provider,
            Some(Provider::OpenAi)
        );

        let last = h.store.current();
        assert_eq!(last.lifecycle, RegistryLifecycle::Destroyed);
        assert_eq!(last.current_provider, None);
        assert!(last.statuses.is_empty());
    }

    /// Sink whose delivery takes a varying amount of time.
    struct SlowSink {
        calls: std::sync::atomic::AtomicUsize,
        last: Mutex<Option<RegistrySnapshot>>,
    }

    impl StateSink for SlowSink {
        fn publish(&self, snapshot: &RegistrySnapshot) {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            std::thread::sleep(Duration::from_micros((n * 37) % 400));
            *self.last.lock() = Some(snapshot.clone());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_sink_ends_on_latest_state_under_concurrency() {
        for _ in 0..20 {
            let sink = Arc::new(SlowSink {
                calls: std::sync::atomic::AtomicUsize::new(0),
                last: Mutex::new(None),
            });
            let factory = |provider: Provider, _ctx: &AdapterContext| -> Result<SharedAdapter> {
                Ok(Arc::new(MockAdapter::new(provider)) as SharedAdapter)
            };
            let context = AdapterContext::new(
                Arc::new(SettingsStore::default()),
                Arc::new(RecordingNotifier::new()),
            );
            let registry = AdapterRegistry::with_factory(context, factory, sink.clone());
            registry.initialize().await.unwrap();

            let tasks: Vec<_> = Provider::ALL
                .into_iter()
                .map(|provider| {
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move { registry.test_connection(provider).await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            let last = sink.last.lock().clone().unwrap();
            assert_eq!(last.statuses, registry.get_all_adapter_status());
            registry.destroy().await;
        }
    }

    #[tokio::test]
    async fn test_switch_to_unregistered_provider_fails() {
        let h = harness(&[Provider::OpenAi]);
        h.registry.initialize().await.unwrap();

        let err = h
            .registry
            .switch_provider(Provider::Perplexity)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No adapter registered"));
        assert_eq!(h.registry.current_provider(), Some(Provider::OpenAi));
    }

    #[tokio::test]
    async fn test_concurrent_switch_is_rejected() {
        let h = harness(&[Provider::OpenAi, Provider::Anthropic, Provider::Groq]);
        h.mocks[&Provider::Anthropic].set_validation_delay(Duration::from_millis(200));
        h.registry.initialize().await.unwrap();

        let registry = Arc::clone(&h.registry);
        let first =
            tokio::spawn(async move { registry.switch_provider(Provider::Anthropic).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = h.registry.switch_provider(Provider::Groq).await;
        assert_eq!(second, Err(LlmError::SwitchInProgress));

        first.await.unwrap().unwrap();
        assert_eq!(h.registry.current_provider(), Some(Provider::Anthropic));

        // The guard is released once the first switch finishes.
        h.registry.switch_provider(Provider::Groq).await.unwrap();
    }

    #[tokio::test]
    async fn test_settings_change_triggers_switch() {
        let h = harness(&[Provider::OpenAi, Provider::Mistral]);
        h.registry.initialize().await.unwrap();

        h.settings.set_selected_provider(Provider::Mistral);

        let mut switched = false;
        for _ in 0..50 {
            if h.registry.current_provider() == Some(Provider::Mistral) {
                switched = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(switched);
    }

    #[tokio::test]
    async fn test_settings_change_pushes_api_keys() {
        let h = harness(&[Provider::OpenAi, Provider::Perplexity]);
        h.registry.initialize().await.unwrap();

        h.settings.update(&mut |s| {
            s.provider_mut(Provider::Perplexity).api_key = Some("pplx-new".to_string());
        });

        let adapter = h.registry.get_adapter(Provider::Perplexity).unwrap();
        let mut updated = false;
        for _ in 0..50 {
            // An env var takes precedence over the file value when present.
            if adapter.api_key().is_some_and(|k| k != "mock-key") {
                updated = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(updated);
    }

    #[tokio::test]
    async fn test_destroy_is_best_effort() {
        let h = harness(&[Provider::OpenAi, Provider::Anthropic]);
        h.mocks[&Provider::Anthropic].fail_shutdown(LlmError::Internal("stuck".to_string()));
        h.registry.initialize().await.unwrap();

        h.registry.destroy().await;

        assert_eq!(h.registry.lifecycle(), RegistryLifecycle::Destroyed);
        assert_eq!(h.mocks[&Provider::OpenAi].shutdown_count(), 1);
        assert_eq!(h.mocks[&Provider::Anthropic].shutdown_count(), 1);
        assert!(h.registry.get_all_adapter_status().is_empty());
        assert!(h.registry.get_adapter(Provider::OpenAi).is_none());
        assert!(matches!(
            h.registry.get_current_adapter(),
            Err(LlmError::NotReady(_))
        ));
        assert_eq!(h.store.current().lifecycle, RegistryLifecycle::Destroyed);

        // Second destroy is a no-op.
        h.registry.destroy().await;
        assert_eq!(h.mocks[&Provider::OpenAi].shutdown_count(), 1);
    }
}
