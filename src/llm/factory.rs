//! Provider lookup by name or by `"auto"` priority walk.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::ProviderSettings;
use crate::llm::{
    LLMResult,
    error::LLMError,
    gemini::Gemini,
    ollama::Ollama,
    openai::{self, OpenAI},
    traits::Provider,
};

pub const AUTO: &str = "auto";

#[derive(Default)]
struct AvailabilityCache {
    revision: u64,
    entries: HashMap<String, bool>,
}

/// Registry of named providers.
///
/// Availability answers are memoized per settings revision; `reconfigure`
/// and `invalidate` start a new revision so the next lookup probes again.
pub struct ProviderFactory {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
    priority: RwLock<Vec<String>>,
    default_selection: RwLock<String>,
    revision: AtomicU64,
    availability: Mutex<AvailabilityCache>,
}

impl std::fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("priority", &*self.priority.read())
            .field("revision", &self.settings_revision())
            .finish_non_exhaustive()
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ProviderFactory {
    /// Empty factory walking `priority` for `"auto"`.
    pub fn new(priority: Vec<String>) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            priority: RwLock::new(priority),
            default_selection: RwLock::new(AUTO.to_string()),
            revision: AtomicU64::new(0),
            availability: Mutex::new(AvailabilityCache::default()),
        }
    }

    /// Factory holding the four built-in backends built from `settings`.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let factory = Self::new(Vec::new());
        factory.reconfigure(settings);
        factory
    }

    /// Rebuild the built-in backends from new settings. Providers registered
    /// under other names are kept.
    pub fn reconfigure(&self, settings: &ProviderSettings) {
        {
            let mut providers = self.providers.write();
            providers.insert(
                "openai".into(),
                Arc::new(OpenAI::from_settings(
                    "openai",
                    &settings.openai,
                    openai::OPENAI_BASE_URL,
                    openai::OPENAI_DEFAULT_MODEL,
                )),
            );
            providers.insert(
                "deepseek".into(),
                Arc::new(OpenAI::from_settings(
                    "deepseek",
                    &settings.deepseek,
                    openai::DEEPSEEK_BASE_URL,
                    openai::DEEPSEEK_DEFAULT_MODEL,
                )),
            );
            providers.insert("gemini".into(), Arc::new(Gemini::from_settings(&settings.gemini)));
            providers.insert("local".into(), Arc::new(Ollama::from_settings(&settings.local)));
        }
        *self.priority.write() = settings.priority.iter().map(|name| name.to_lowercase()).collect();
        *self.default_selection.write() = settings.selected.to_lowercase();
        self.invalidate();
    }

    /// Add or replace a provider under `name`.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn Provider>) -> &Self {
        let name = name.into().to_lowercase();
        tracing::info!(provider = %name, "registered provider");
        self.providers.write().insert(name, provider);
        self.invalidate();
        self
    }

    pub fn with_priority(self, priority: Vec<String>) -> Self {
        *self.priority.write() = priority.into_iter().map(|name| name.to_lowercase()).collect();
        self
    }

    /// Drop memoized availability answers.
    pub fn invalidate(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn settings_revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Memoized `is_available` for the provider registered as `name`.
    pub fn is_available(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let revision = self.settings_revision();
        {
            let mut cache = self.availability.lock();
            if cache.revision != revision {
                cache.revision = revision;
                cache.entries.clear();
            }
            if let Some(available) = cache.entries.get(&name) {
                return *available;
            }
        }
        let available = self
            .providers
            .read()
            .get(&name)
            .is_some_and(|provider| provider.is_available());
        let mut cache = self.availability.lock();
        if cache.revision == revision {
            cache.entries.insert(name, available);
        }
        available
    }

    /// Names in priority order that are currently available.
    pub fn available_providers(&self) -> Vec<String> {
        self.priority_order()
            .into_iter()
            .filter(|name| self.is_available(name))
            .collect()
    }

    /// Resolve `name`. `"auto"` walks the priority list; an unknown name
    /// falls back to `"auto"` with a warning. A known but unavailable name is
    /// still returned, its `send` reports why it cannot serve.
    pub fn get_provider(&self, name: &str) -> LLMResult<Arc<dyn Provider>> {
        let name = name.to_lowercase();
        if name != AUTO {
            if let Some(provider) = self.providers.read().get(&name) {
                return Ok(provider.clone());
            }
            tracing::warn!(provider = %name, "unknown provider, falling back to auto selection");
        }
        self.best_available()
    }

    /// Resolve the configured `providers.selected` entry.
    pub fn selected(&self) -> LLMResult<Arc<dyn Provider>> {
        let selection = self.default_selection.read().clone();
        self.get_provider(&selection)
    }

    /// First available provider in priority order.
    pub fn best_available(&self) -> LLMResult<Arc<dyn Provider>> {
        let order = self.priority_order();
        for name in &order {
            if self.is_available(name) {
                if let Some(provider) = self.providers.read().get(name) {
                    tracing::debug!(provider = %name, "auto-selected provider");
                    return Ok(provider.clone());
                }
            }
        }
        Err(LLMError::NoProviderAvailable {
            tried: order.join(", "),
        })
    }

    /// Priority list followed by any registered names it does not mention.
    fn priority_order(&self) -> Vec<String> {
        let mut order = self.priority.read().clone();
        let mut extra: Vec<String> = self
            .providers
            .read()
            .keys()
            .filter(|name| !order.contains(name))
            .cloned()
            .collect();
        extra.sort();
        order.extend(extra);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CloudSettings, ProviderSettings};
    use crate::llm::SendRequest;
    use futures::{FutureExt, future::BoxFuture};
    use std::sync::atomic::AtomicUsize;

    struct Probe {
        name: &'static str,
        available: bool,
        probes: AtomicUsize,
    }

    impl Probe {
        fn new(name: &'static str, available: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                available,
                probes: AtomicUsize::new(0),
            })
        }
    }

    impl Provider for Probe {
        fn name(&self) -> &str {
            self.name
        }
        fn is_available(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.available
        }
        fn send<'a>(&'a self, _request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
            async move { Ok(format!("[ANSWER]: from {}", self.name)) }.boxed()
        }
        fn test_connection(&self) -> BoxFuture<'_, bool> {
            async move { self.available }.boxed()
        }
    }

    #[test]
    fn auto_walks_priority() {
        let factory = ProviderFactory::new(vec!["deepseek".into(), "openai".into(), "local".into()]);
        factory.register("deepseek", Probe::new("deepseek", false));
        factory.register("openai", Probe::new("openai", true));
        factory.register("local", Probe::new("local", true));

        assert_eq!(factory.get_provider("auto").unwrap().name(), "openai");
        assert_eq!(factory.available_providers(), vec!["openai", "local"]);
        // unknown names fall back to auto
        assert_eq!(factory.get_provider("claude").unwrap().name(), "openai");
        // known names are returned even when unavailable
        assert_eq!(factory.get_provider("DeepSeek").unwrap().name(), "deepseek");
    }

    #[test]
    fn none_available_is_an_error() {
        let factory = ProviderFactory::new(vec!["openai".into()]);
        factory.register("openai", Probe::new("openai", false));
        let err = factory.get_provider("auto").err().unwrap();
        assert!(matches!(err, LLMError::NoProviderAvailable { .. }));
    }

    #[test]
    fn availability_is_memoized_per_revision() {
        let factory = ProviderFactory::new(vec!["openai".into()]);
        let probe = Probe::new("openai", true);
        factory.register("openai", probe.clone());

        assert!(factory.is_available("openai"));
        assert!(factory.is_available("openai"));
        assert_eq!(probe.probes.load(Ordering::SeqCst), 1);

        factory.invalidate();
        assert!(factory.is_available("openai"));
        assert_eq!(probe.probes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reconfigure_swaps_builtin_backends() {
        let factory = ProviderFactory::from_settings(&ProviderSettings::offline());
        assert!(factory.available_providers().is_empty());
        let before = factory.settings_revision();

        let mut settings = ProviderSettings::offline();
        settings.gemini = CloudSettings::with_api_key("g-key");
        factory.reconfigure(&settings);

        assert!(factory.settings_revision() > before);
        assert_eq!(factory.available_providers(), vec!["gemini"]);
        assert_eq!(factory.selected().unwrap().name(), "gemini");
    }

    #[test]
    fn bad_local_host_leaves_backend_unavailable() {
        let mut settings = ProviderSettings::offline();
        settings.local.enabled = true;
        settings.local.host = "http://".to_string();
        let factory = ProviderFactory::from_settings(&settings);
        assert!(!factory.is_available("local"));
        assert!(factory.get_provider("auto").is_err());
    }
}
