//! Subscribable in-memory settings store.
//!
//! The adapter layer never reads config files directly. It consumes a
//! [`SettingsSource`]: a snapshot accessor, a writer, and a change feed.

use tokio::sync::watch;

use crate::{AiSettings, Provider, VellumConfig};

/// Source of AI settings consumed by the adapter registry.
pub trait SettingsSource: Send + Sync {
    /// Current settings.
    fn snapshot(&self) -> AiSettings;

    /// Apply a mutation. Subscribers are notified only if the value changed.
    fn update(&self, apply: &mut dyn FnMut(&mut AiSettings));

    /// Receive every subsequent settings change.
    fn subscribe(&self) -> watch::Receiver<AiSettings>;

    /// Persist a new selected provider.
    fn set_selected_provider(&self, provider: Provider) {
        self.update(&mut |settings| settings.selected_provider = Some(provider));
    }
}

/// Default [`SettingsSource`] backed by a watch channel.
#[derive(Debug)]
pub struct SettingsStore {
    tx: watch::Sender<AiSettings>,
}

impl SettingsStore {
    /// Create a store holding the given settings.
    pub fn new(settings: AiSettings) -> Self {
        Self {
            tx: watch::Sender::new(settings),
        }
    }

    /// Create a store from a loaded config.
    pub fn from_config(config: VellumConfig) -> Self {
        Self::new(config.ai)
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(AiSettings::default())
    }
}

impl SettingsSource for SettingsStore {
    fn snapshot(&self) -> AiSettings {
        self.tx.borrow().clone()
    }

    fn update(&self, apply: &mut dyn FnMut(&mut AiSettings)) {
        self.tx.send_if_modified(|settings| {
            let before = settings.clone();
            apply(settings);
            *settings != before
        });
    }

    fn subscribe(&self) -> watch::Receiver<AiSettings> {
        self.tx.subscribe()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_updates() {
        let store = SettingsStore::default();
        store.update(&mut |s| s.temperature = Some(0.1));
        assert_eq!(store.snapshot().temperature, Some(0.1));
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = SettingsStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.set_selected_provider(Provider::Groq);
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().selected_provider,
            Some(Provider::Groq)
        );
    }

    #[test]
    fn test_unchanged_write_does_not_notify() {
        let mut settings = AiSettings::default();
        settings.selected_provider = Some(Provider::Mistral);
        let store = SettingsStore::new(settings);
        let rx = store.subscribe();

        store.set_selected_provider(Provider::Mistral);
        assert!(!rx.has_changed().unwrap());
    }
}
