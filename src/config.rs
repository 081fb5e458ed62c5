use crate::core::error::AiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_AUTO_PREFERENCE: &str = "local";
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant integrated into a Markdown \
editor for philosophy and pedagogy. Provide thoughtful, educational responses.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Groq,
    OpenRouter,
    Gemini,
    Local,
}

impl ProviderKind {
    /// Registration order.
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Groq,
        ProviderKind::OpenRouter,
        ProviderKind::Gemini,
        ProviderKind::Local,
    ];

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAI),
            "anthropic" => Some(ProviderKind::Anthropic),
            "groq" => Some(ProviderKind::Groq),
            "openrouter" => Some(ProviderKind::OpenRouter),
            "gemini" => Some(ProviderKind::Gemini),
            "local" => Some(ProviderKind::Local),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Local => "local",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Local => DEFAULT_LOCAL_URL,
        }
    }

    /// Environment variables holding the credential (or URL for `local`), in lookup order.
    pub fn credential_env(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAI => &["OPENAI_API_KEY"],
            ProviderKind::Anthropic => &["ANTHROPIC_API_KEY"],
            ProviderKind::Groq => &["GROQ_API_KEY"],
            ProviderKind::OpenRouter => &["OPENROUTER_API_KEY"],
            ProviderKind::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            ProviderKind::Local => &["LOCAL_AI_URL"],
        }
    }

    pub fn model_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_MODEL",
            ProviderKind::Anthropic => "ANTHROPIC_MODEL",
            ProviderKind::Groq => "GROQ_MODEL",
            ProviderKind::OpenRouter => "OPENROUTER_MODEL",
            ProviderKind::Gemini => "GEMINI_MODEL",
            ProviderKind::Local => "LOCAL_AI_MODEL",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Local)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    fn overlay(self, over: ProviderConfig) -> ProviderConfig {
        ProviderConfig {
            api_key: over.api_key.or(self.api_key),
            base_url: over.base_url.or(self.base_url),
            model: over.model.or(self.model),
            timeout_secs: over.timeout_secs.or(self.timeout_secs),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_provider: Option<String>,
    pub auto_preference: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub verbose: bool,
    pub providers: HashMap<ProviderKind, ProviderConfig>,
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".techne")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("ai.yaml")
    }

    /// Settings file (if any) overlaid with the process environment.
    pub fn load() -> Result<Config, AiError> {
        Self::load_with(&Self::config_path(), |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Config, AiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        Ok(file.overlay(Self::from_lookup(lookup)))
    }

    pub fn load_from(path: &Path) -> Result<Config, AiError> {
        let contents = fs::read_to_string(path)?;
        serde_yml::from_str::<Config>(&contents)
            .map_err(|e| AiError::Config(format!("Parse {}: {}", path.display(), e)))
    }

    pub fn from_env() -> Config {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an environment-style lookup. Blank values count as unset,
    /// except credentials: a present-but-blank key is kept so construction can reject it.
    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut providers = HashMap::new();
        for kind in ProviderKind::ALL {
            let credential = kind.credential_env().iter().find_map(|key| lookup(key));
            let (api_key, base_url) = if kind.requires_api_key() {
                (credential, None)
            } else {
                (None, credential.map(|v| v.trim().to_string()))
            };
            let entry = ProviderConfig {
                api_key,
                base_url,
                model: get(kind.model_env()),
                timeout_secs: None,
            };
            if entry != ProviderConfig::default() {
                providers.insert(kind, entry);
            }
        }

        Config {
            default_provider: get("DEFAULT_AI_PROVIDER"),
            auto_preference: get("AI_AUTO_PREFERENCE"),
            temperature: get("AI_TEMPERATURE").and_then(|v| parse_or_warn("AI_TEMPERATURE", &v)),
            max_tokens: get("AI_MAX_TOKENS").and_then(|v| parse_or_warn("AI_MAX_TOKENS", &v)),
            system_prompt: get("AI_SYSTEM_PROMPT"),
            verbose: get("AI_VERBOSE")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            providers,
        }
    }

    /// Values set in `over` win.
    pub fn overlay(mut self, over: Config) -> Config {
        for (kind, entry) in over.providers {
            let merged = match self.providers.remove(&kind) {
                Some(base) => base.overlay(entry),
                None => entry,
            };
            self.providers.insert(kind, merged);
        }
        Config {
            default_provider: over.default_provider.or(self.default_provider),
            auto_preference: over.auto_preference.or(self.auto_preference),
            temperature: over.temperature.or(self.temperature),
            max_tokens: over.max_tokens.or(self.max_tokens),
            system_prompt: over.system_prompt.or(self.system_prompt),
            verbose: over.verbose || self.verbose,
            providers: self.providers,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn auto_preference(&self) -> &str {
        self.auto_preference
            .as_deref()
            .unwrap_or(DEFAULT_AUTO_PREFERENCE)
    }

    pub fn provider(&self, kind: ProviderKind) -> ProviderConfig {
        self.providers.get(&kind).cloned().unwrap_or_default()
    }

    pub fn set_local_url(&mut self, url: &str) {
        self.providers
            .entry(ProviderKind::Local)
            .or_default()
            .base_url = Some(url.to_string());
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value, "ignoring unparseable setting, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_provider_kind_names_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ProviderKind::from_name("OpenAI"), Some(ProviderKind::OpenAI));
        assert_eq!(ProviderKind::from_name("deepseek"), None);
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None);
        assert!(config.providers.is_empty());
        assert_eq!(config.temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(config.auto_preference(), "local");
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_reads_credentials_and_generation_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("GOOGLE_API_KEY", "g-key"),
            ("LOCAL_AI_URL", "http://localhost:11434/"),
            ("AI_TEMPERATURE", "0.2"),
            ("AI_MAX_TOKENS", "512"),
            ("DEFAULT_AI_PROVIDER", "openai"),
        ]));

        let openai = config.provider(ProviderKind::OpenAI);
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(openai.model.as_deref(), Some("gpt-4o"));
        assert_eq!(
            config.provider(ProviderKind::Gemini).api_key.as_deref(),
            Some("g-key")
        );
        assert_eq!(
            config.provider(ProviderKind::Local).base_url.as_deref(),
            Some("http://localhost:11434/")
        );
        assert_eq!(config.temperature(), 0.2);
        assert_eq!(config.max_tokens(), 512);
        assert_eq!(config.default_provider.as_deref(), Some("openai"));
    }

    #[test]
    fn test_blank_key_is_kept_for_validation() {
        let config = Config::from_lookup(lookup_from(&[("GROQ_API_KEY", "   ")]));
        assert_eq!(
            config.provider(ProviderKind::Groq).api_key.as_deref(),
            Some("   ")
        );
    }

    #[test]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("AI_TEMPERATURE", "warm"),
            ("AI_MAX_TOKENS", "-3"),
        ]));
        assert_eq!(config.temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens(), DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "temperature: 0.3\nmax_tokens: 100\nproviders:\n  anthropic:\n    api_key: file-key\n    model: claude-3-haiku-20240307\n"
        )
        .unwrap();

        let config = Config::load_with(
            file.path(),
            lookup_from(&[("ANTHROPIC_API_KEY", "env-key"), ("AI_MAX_TOKENS", "900")]),
        )
        .unwrap();

        let anthropic = config.provider(ProviderKind::Anthropic);
        assert_eq!(anthropic.api_key.as_deref(), Some("env-key"));
        assert_eq!(anthropic.model.as_deref(), Some("claude-3-haiku-20240307"));
        assert_eq!(config.temperature(), 0.3);
        assert_eq!(config.max_tokens(), 900);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(&dir.path().join("absent.yaml"), |_| None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "temperature: [not, a, number").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, AiError::Config(_)));
    }

    #[test]
    fn test_set_local_url() {
        let mut config = Config::default();
        config.set_local_url("http://127.0.0.1:8080");
        assert_eq!(
            config.provider(ProviderKind::Local).base_url.as_deref(),
            Some("http://127.0.0.1:8080")
        );
    }
}
