use crate::providers::LLMProvider;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Names that mean "let the registry choose".
pub fn is_auto(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.eq_ignore_ascii_case("auto") || name.eq_ignore_ascii_case("default")
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefaultProvider {
    #[default]
    Auto,
    Named(String),
}

impl fmt::Display for DefaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultProvider::Auto => f.write_str("auto"),
            DefaultProvider::Named(name) => f.write_str(name),
        }
    }
}

/// Named providers in registration order, plus the default selection.
pub struct ProviderRegistry {
    providers: Vec<(String, Arc<dyn LLMProvider>)>,
    default: DefaultProvider,
    auto_preference: String,
}

impl ProviderRegistry {
    pub fn new(auto_preference: &str) -> Self {
        Self {
            providers: Vec::new(),
            default: DefaultProvider::Auto,
            auto_preference: auto_preference.trim().to_lowercase(),
        }
    }

    /// Registering an existing name replaces it in place, keeping its position.
    pub fn register(&mut self, name: &str, provider: Arc<dyn LLMProvider>) {
        let name = name.trim().to_lowercase();
        match self.providers.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                debug!(provider = %name, "replacing registered provider");
                slot.1 = provider;
            }
            None => {
                debug!(provider = %name, "registering provider");
                self.providers.push((name, provider));
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LLMProvider>> {
        let name = name.trim().to_lowercase();
        self.providers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| Arc::clone(p))
    }

    pub fn list(&self) -> Vec<String> {
        self.providers.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.providers.first().map(|(n, _)| n.as_str())
    }

    pub fn auto_preference(&self) -> &str {
        &self.auto_preference
    }

    pub fn default(&self) -> &DefaultProvider {
        &self.default
    }

    /// Returns false and keeps the previous default when `name` is not registered.
    pub fn set_default(&mut self, name: &str) -> bool {
        if is_auto(name) {
            self.default = DefaultProvider::Auto;
            return true;
        }
        let name = name.trim().to_lowercase();
        if !self.has(&name) {
            warn!(
                provider = %name,
                available = ?self.list(),
                "cannot set default provider, keeping {}",
                self.default
            );
            return false;
        }
        self.default = DefaultProvider::Named(name);
        true
    }

    /// Concrete provider name for the current default, if any provider exists.
    pub fn resolve_default(&self) -> Option<String> {
        match &self.default {
            DefaultProvider::Named(name) if self.has(name) => Some(name.clone()),
            _ => {
                if self.has(&self.auto_preference) {
                    Some(self.auto_preference.clone())
                } else {
                    self.first().map(str::to_string)
                }
            }
        }
    }
}
