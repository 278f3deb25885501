use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, HanvietError};

// Default values for provider retry behavior
fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub lookup: LookupConfig,
    pub cache: CacheConfig,
    pub providers: Vec<ProviderSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the web UI
    pub host: String,
    /// Bind port for the web UI
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Source language code sent to providers
    pub source_lang: String,
    /// Target language code sent to providers
    pub target_lang: String,
    /// Render pinyin with tone marks by default
    pub tone_marks: bool,
    /// Minimum gap between outbound provider requests
    pub min_request_interval_ms: u64,
    /// Pause between batch items that hit the network
    pub batch_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path of the flat translation cache file
    pub path: String,
}

/// Wire protocol spoken by a provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// MyMemory: GET with q/langpair query parameters
    MyMemory,
    /// LibreTranslate: JSON POST with q/source/target/format
    LibreTranslate,
    /// Lingva: GET with source/target/text encoded into the path
    Lingva,
    /// Google translate web endpoint (gtx client): GET with query
    /// parameters, nested-array response
    GoogleTranslate,
}

/// A single translation backend. New backends are declared in configuration;
/// the chain tries them strictly in list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Display name, also used as the result source tag
    pub name: String,
    pub kind: ProviderKind,
    /// Base URL of the endpoint
    pub endpoint: String,
    /// Per-attempt timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed backoff between attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 7860,
            },
            lookup: LookupConfig {
                source_lang: "zh".to_string(),
                target_lang: "vi".to_string(),
                tone_marks: true,
                min_request_interval_ms: 500,
                batch_delay_ms: 100,
            },
            cache: CacheConfig {
                path: "data/translation_cache.json".to_string(),
            },
            providers: vec![
                ProviderSpec {
                    name: "MyMemory".to_string(),
                    kind: ProviderKind::MyMemory,
                    endpoint: "https://api.mymemory.translated.net/get".to_string(),
                    timeout_secs: default_timeout_secs(),
                    max_retries: default_max_retries(),
                    retry_delay_ms: default_retry_delay_ms(),
                },
                ProviderSpec {
                    name: "LibreTranslate Germany".to_string(),
                    kind: ProviderKind::LibreTranslate,
                    endpoint: "https://libretranslate.de/translate".to_string(),
                    timeout_secs: default_timeout_secs(),
                    max_retries: default_max_retries(),
                    retry_delay_ms: default_retry_delay_ms(),
                },
                ProviderSpec {
                    name: "Argos Open Tech".to_string(),
                    kind: ProviderKind::LibreTranslate,
                    endpoint: "https://translate.argosopentech.com/translate".to_string(),
                    timeout_secs: default_timeout_secs(),
                    max_retries: default_max_retries(),
                    retry_delay_ms: default_retry_delay_ms(),
                },
                ProviderSpec {
                    name: "Lingva".to_string(),
                    kind: ProviderKind::Lingva,
                    endpoint: "https://lingva.ml/api/v1".to_string(),
                    timeout_secs: default_timeout_secs(),
                    max_retries: default_max_retries(),
                    retry_delay_ms: default_retry_delay_ms(),
                },
                // Last resort when every dedicated instance is down
                ProviderSpec {
                    name: "GoogleTranslate".to_string(),
                    kind: ProviderKind::GoogleTranslate,
                    endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
                    timeout_secs: default_timeout_secs(),
                    max_retries: default_max_retries(),
                    retry_delay_ms: default_retry_delay_ms(),
                },
            ],
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HanvietError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| HanvietError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HanvietError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| HanvietError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
