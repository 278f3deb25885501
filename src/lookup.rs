//! Lookup orchestration: romanization + cached fallback translation
//! composed into a single "define this text" operation, shared by the CLI
//! and the web UI.

use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{CacheStats, TranslationCache};
use crate::config::Config;
use crate::error::{Result, HanvietError};
use crate::pinyin::{self, CharacterAnalysis};
use crate::translate::{FallbackChain, TranslationSource};

#[derive(Debug, Clone)]
pub struct LookupOptions {
    /// Render pinyin with tone marks
    pub tone_marks: bool,
    /// Attach per-character analysis for single-character input
    pub detailed_analysis: bool,
    /// Skip the cache and force a provider call
    pub bypass_cache: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            tone_marks: true,
            detailed_analysis: false,
            bypass_cache: false,
        }
    }
}

/// One lookup outcome. Romanization and translation are independent: either
/// side may be empty without invalidating the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub source_text: String,
    pub romanization: String,
    pub translation: String,
    pub source: TranslationSource,
    pub error: Option<String>,
    pub analysis: Option<CharacterAnalysis>,
}

impl LookupResult {
    fn empty_input(source_text: &str) -> Self {
        Self {
            source_text: source_text.to_string(),
            romanization: String::new(),
            translation: String::new(),
            source: TranslationSource::None,
            error: Some("empty input".to_string()),
            analysis: None,
        }
    }
}

/// Owns the provider chain and the cache handle. One instance per process,
/// shared by reference between the CLI and web front ends.
pub struct LookupService {
    chain: FallbackChain,
    cache: RwLock<TranslationCache>,
    batch_delay: Duration,
}

impl LookupService {
    pub fn new(config: &Config) -> Result<Self> {
        let chain = FallbackChain::from_config(config)?;
        let cache = TranslationCache::load(config.cache.path.clone());
        info!(
            "Lookup service ready: {} providers, {} cached translations",
            chain.provider_names().len(),
            cache.len()
        );

        Ok(Self {
            chain,
            cache: RwLock::new(cache),
            batch_delay: Duration::from_millis(config.lookup.batch_delay_ms),
        })
    }

    #[cfg(test)]
    fn with_parts(chain: FallbackChain, cache: TranslationCache) -> Self {
        Self {
            chain,
            cache: RwLock::new(cache),
            batch_delay: Duration::ZERO,
        }
    }

    /// Look up a single word or phrase. Empty input is a validation error;
    /// anything else always yields a result, possibly partial.
    pub async fn lookup(&self, text: &str, options: &LookupOptions) -> Result<LookupResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HanvietError::Input("text must not be empty".to_string()));
        }

        // Romanization is pure and cannot fail; translation degrades to an
        // empty string when the whole chain is down. Neither blocks the other.
        let romanization = pinyin::romanize(text, options.tone_marks);
        let outcome = self
            .chain
            .translate_with_fallback(&self.cache, text, options.bypass_cache)
            .await;

        let error = match outcome.source {
            TranslationSource::None => {
                warn!("No translation available for {:?}", text);
                Some("all translation providers failed".to_string())
            }
            _ => None,
        };

        let analysis = if options.detailed_analysis {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Some(pinyin::analyze_character(ch)),
                _ => None,
            }
        } else {
            None
        };

        Ok(LookupResult {
            source_text: text.to_string(),
            romanization,
            translation: outcome.translation,
            source: outcome.source,
            error,
            analysis,
        })
    }

    /// Look up many lines, one result per input line in input order. A
    /// failing line never aborts the batch; blank lines yield an
    /// error-tagged entry.
    pub async fn lookup_batch(&self, lines: &[String], options: &LookupOptions) -> Vec<LookupResult> {
        let mut results = Vec::with_capacity(lines.len());

        for (index, line) in lines.iter().enumerate() {
            let result = match self.lookup(line, options).await {
                Ok(result) => result,
                Err(_) => LookupResult::empty_input(line),
            };

            let went_to_network = matches!(result.source, TranslationSource::Provider(_) | TranslationSource::None)
                && result.error.as_deref() != Some("empty input");
            results.push(result);

            if went_to_network && index + 1 < lines.len() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let succeeded = results.iter().filter(|r| r.error.is_none()).count();
        info!("Batch lookup finished: {}/{} succeeded", succeeded, results.len());
        results
    }

    pub fn cache_stats(&self) -> CacheStats {
        match self.cache.read() {
            Ok(cache) => cache.stats(),
            Err(_) => CacheStats {
                entries: 0,
                file_size_bytes: 0,
                file_exists: false,
            },
        }
    }

    pub fn clear_cache(&self) -> Result<usize> {
        self.cache
            .write()
            .map_err(|_| HanvietError::Cache("cache lock poisoned".to_string()))?
            .clear()
    }

    /// Final flush hook. Writes already flush eagerly, so this only matters
    /// after a failed flush earlier in the process lifetime.
    pub fn flush_cache(&self) -> Result<()> {
        self.cache
            .read()
            .map_err(|_| HanvietError::Cache("cache lock poisoned".to_string()))?
            .flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{ChainEntry, MockProvider, ProviderError};
    use tempfile::tempdir;

    fn entry(provider: MockProvider) -> ChainEntry {
        ChainEntry {
            provider: Box::new(provider),
            attempt_timeout: Duration::from_secs(1),
            max_retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    fn service(entries: Vec<ChainEntry>, dir: &tempfile::TempDir) -> LookupService {
        let chain = FallbackChain::new(entries, Duration::ZERO);
        let cache = TranslationCache::load(dir.path().join("cache.json"));
        LookupService::with_parts(chain, cache)
    }

    fn greeting_mock() -> MockProvider {
        let mut mock = MockProvider::new();
        mock.expect_name().return_const("Fake".to_string());
        mock.expect_translate().returning(|text| match text {
            "你好" => Ok("Xin chào".to_string()),
            "坏" => Err(ProviderError::Status(500)),
            other => Ok(format!("dịch: {}", other)),
        });
        mock
    }

    #[tokio::test]
    async fn test_lookup_populates_both_sides() {
        let dir = tempdir().unwrap();
        let service = service(vec![entry(greeting_mock())], &dir);

        let result = service
            .lookup("你好", &LookupOptions::default())
            .await
            .unwrap();

        assert_eq!(result.romanization, "nǐ hǎo");
        assert_eq!(result.translation, "Xin chào");
        assert_eq!(result.source, TranslationSource::Provider("Fake".to_string()));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_lookup_keeps_romanization_when_translation_fails() {
        let dir = tempdir().unwrap();
        let mut mock = MockProvider::new();
        mock.expect_name().return_const("Down".to_string());
        mock.expect_translate()
            .returning(|_| Err(ProviderError::Timeout));
        let service = service(vec![entry(mock)], &dir);

        let result = service
            .lookup("你好", &LookupOptions::default())
            .await
            .unwrap();

        assert_eq!(result.romanization, "nǐ hǎo");
        assert_eq!(result.translation, "");
        assert_eq!(result.source, TranslationSource::None);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_lookup_rejects_empty_input() {
        let dir = tempdir().unwrap();
        let service = service(vec![entry(greeting_mock())], &dir);

        let err = service.lookup("   ", &LookupOptions::default()).await;
        assert!(matches!(err, Err(HanvietError::Input(_))));
    }

    #[tokio::test]
    async fn test_detailed_analysis_only_for_single_character() {
        let dir = tempdir().unwrap();
        let service = service(vec![entry(greeting_mock())], &dir);
        let options = LookupOptions {
            detailed_analysis: true,
            ..LookupOptions::default()
        };

        let single = service.lookup("中", &options).await.unwrap();
        let analysis = single.analysis.unwrap();
        assert!(analysis.is_han);
        assert_eq!(analysis.pinyin_toned, "zhōng");

        let multi = service.lookup("中国", &options).await.unwrap();
        assert!(multi.analysis.is_none());
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_partial_failures() {
        let dir = tempdir().unwrap();
        let service = service(vec![entry(greeting_mock())], &dir);

        let lines = vec!["你好".to_string(), "坏".to_string(), "中国".to_string()];
        let results = service
            .lookup_batch(&lines, &LookupOptions::default())
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].source_text, "你好");
        assert!(matches!(results[0].source, TranslationSource::Provider(_)));
        assert_eq!(results[1].source, TranslationSource::None);
        assert!(results[1].error.is_some());
        assert!(matches!(results[2].source, TranslationSource::Provider(_)));
    }

    #[tokio::test]
    async fn test_batch_blank_line_yields_error_entry() {
        let dir = tempdir().unwrap();
        let service = service(vec![entry(greeting_mock())], &dir);

        let lines = vec!["你好".to_string(), "  ".to_string()];
        let results = service
            .lookup_batch(&lines, &LookupOptions::default())
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].error.as_deref(), Some("empty input"));
    }

    #[tokio::test]
    async fn test_second_lookup_is_cache_tagged() {
        let dir = tempdir().unwrap();
        let mut mock = MockProvider::new();
        mock.expect_name().return_const("Fake".to_string());
        mock.expect_translate()
            .times(1)
            .returning(|_| Ok("Xin chào".to_string()));
        let service = service(vec![entry(mock)], &dir);

        let first = service.lookup("你好", &LookupOptions::default()).await.unwrap();
        assert!(matches!(first.source, TranslationSource::Provider(_)));

        let second = service.lookup("你好", &LookupOptions::default()).await.unwrap();
        assert_eq!(second.source, TranslationSource::Cache);
        assert_eq!(second.translation, "Xin chào");
    }

    #[tokio::test]
    async fn test_cache_admin_operations() {
        let dir = tempdir().unwrap();
        let service = service(vec![entry(greeting_mock())], &dir);

        service.lookup("你好", &LookupOptions::default()).await.unwrap();
        assert_eq!(service.cache_stats().entries, 1);

        assert_eq!(service.clear_cache().unwrap(), 1);
        assert_eq!(service.cache_stats().entries, 0);
        assert_eq!(service.clear_cache().unwrap(), 0);
    }
}
