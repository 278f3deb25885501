use std::sync::RwLock;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::cache::{TranslationCache, normalize_key};
use crate::config::Config;
use crate::error::Result;
use super::{HttpProvider, Provider, TranslationSource};

/// One provider plus its retry and timeout policy, taken from the
/// `ProviderSpec` so tests can inject zero-latency fakes.
pub struct ChainEntry {
    pub provider: Box<dyn Provider>,
    pub attempt_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

/// Outcome of a fallback translation. Total provider exhaustion is not an
/// error; it degrades to an empty translation tagged `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackOutcome {
    pub translation: String,
    pub source: TranslationSource,
}

/// Ordered list of translation backends, tried strictly in configured
/// priority order on cache miss. No dynamic reordering.
pub struct FallbackChain {
    entries: Vec<ChainEntry>,
    min_request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl FallbackChain {
    pub fn new(entries: Vec<ChainEntry>, min_request_interval: Duration) -> Self {
        Self {
            entries,
            min_request_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("hanviet/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let entries = config
            .providers
            .iter()
            .cloned()
            .map(|spec| ChainEntry {
                attempt_timeout: Duration::from_secs(spec.timeout_secs),
                max_retries: spec.max_retries,
                retry_delay: Duration::from_millis(spec.retry_delay_ms),
                provider: Box::new(HttpProvider::new(
                    client.clone(),
                    spec,
                    &config.lookup.source_lang,
                    &config.lookup.target_lang,
                )),
            })
            .collect();

        Ok(Self::new(
            entries,
            Duration::from_millis(config.lookup.min_request_interval_ms),
        ))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.provider.name()).collect()
    }

    /// Translate with cache-first fallback. On cache hit no provider is
    /// invoked (unless `bypass_cache`). On provider success the result is
    /// stored into the cache before returning.
    pub async fn translate_with_fallback(
        &self,
        cache: &RwLock<TranslationCache>,
        text: &str,
        bypass_cache: bool,
    ) -> FallbackOutcome {
        let key = normalize_key(text).to_string();

        if !bypass_cache {
            let hit = cache
                .read()
                .ok()
                .and_then(|c| c.get(&key).map(str::to_string));
            if let Some(translation) = hit {
                debug!("Cache hit for {:?}", key);
                return FallbackOutcome {
                    translation,
                    source: TranslationSource::Cache,
                };
            }
        }

        self.pace().await;

        for entry in &self.entries {
            let name = entry.provider.name().to_string();
            let attempts = entry.max_retries + 1;

            for attempt in 1..=attempts {
                match timeout(entry.attempt_timeout, entry.provider.translate(&key)).await {
                    Ok(Ok(translation)) => {
                        info!("Translated {:?} via {}", key, name);
                        if let Ok(mut guard) = cache.write() {
                            if let Err(e) = guard.put(&key, &translation) {
                                warn!("Failed to persist translation cache: {}", e);
                            }
                        }
                        return FallbackOutcome {
                            translation,
                            source: TranslationSource::Provider(name),
                        };
                    }
                    Ok(Err(e)) => {
                        warn!("Provider {} attempt {}/{} failed: {}", name, attempt, attempts, e);
                    }
                    Err(_) => {
                        warn!(
                            "Provider {} attempt {}/{} timed out after {:?}",
                            name, attempt, attempts, entry.attempt_timeout
                        );
                    }
                }

                if attempt < attempts {
                    sleep(entry.retry_delay).await;
                }
            }
        }

        warn!("All translation providers failed for {:?}", key);
        FallbackOutcome {
            translation: String::new(),
            source: TranslationSource::None,
        }
    }

    /// Keep a minimum gap between outbound request bursts. Free-tier
    /// endpoints throttle aggressively.
    async fn pace(&self) {
        if self.min_request_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_request_interval {
                sleep(self.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{MockProvider, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    fn test_cache(dir: &tempfile::TempDir) -> RwLock<TranslationCache> {
        RwLock::new(TranslationCache::load(dir.path().join("cache.json")))
    }

    fn entry(provider: MockProvider, max_retries: u32) -> ChainEntry {
        ChainEntry {
            provider: Box::new(provider),
            attempt_timeout: Duration::from_secs(1),
            max_retries,
            retry_delay: Duration::ZERO,
        }
    }

    fn named_mock(name: &str) -> MockProvider {
        let mut mock = MockProvider::new();
        mock.expect_name().return_const(name.to_string());
        mock
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);

        let mut provider = named_mock("Fake");
        provider
            .expect_translate()
            .times(1)
            .returning(|_| Ok("Xin chào".to_string()));

        let chain = FallbackChain::new(vec![entry(provider, 0)], Duration::ZERO);

        let first = chain.translate_with_fallback(&cache, "你好", false).await;
        assert_eq!(first.translation, "Xin chào");
        assert_eq!(first.source, TranslationSource::Provider("Fake".to_string()));

        // times(1) above fails the test if the provider is hit again.
        let second = chain.translate_with_fallback(&cache, "你好", false).await;
        assert_eq!(second.translation, "Xin chào");
        assert_eq!(second.source, TranslationSource::Cache);
    }

    #[tokio::test]
    async fn test_first_provider_in_order_wins() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);

        let mut first = named_mock("First");
        first
            .expect_translate()
            .times(1)
            .returning(|_| Ok("đầu tiên".to_string()));

        // No translate expectation: any call to the second provider panics.
        let second = named_mock("Second");

        let chain = FallbackChain::new(vec![entry(first, 0), entry(second, 0)], Duration::ZERO);

        let outcome = chain.translate_with_fallback(&cache, "第一", false).await;
        assert_eq!(outcome.source, TranslationSource::Provider("First".to_string()));
    }

    #[tokio::test]
    async fn test_failing_provider_falls_through_to_next() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);

        let mut broken = named_mock("Broken");
        broken
            .expect_translate()
            .times(1)
            .returning(|_| Err(ProviderError::Status(502)));

        let mut working = named_mock("Working");
        working
            .expect_translate()
            .times(1)
            .returning(|_| Ok("Trung Quốc".to_string()));

        let chain = FallbackChain::new(vec![entry(broken, 0), entry(working, 0)], Duration::ZERO);

        let outcome = chain.translate_with_fallback(&cache, "中国", false).await;
        assert_eq!(outcome.translation, "Trung Quốc");
        assert_eq!(outcome.source, TranslationSource::Provider("Working".to_string()));
    }

    #[tokio::test]
    async fn test_retries_are_bounded_then_succeed() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);

        let calls = std::sync::Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut flaky = named_mock("Flaky");
        flaky.expect_translate().times(3).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::Network("connection reset".to_string()))
            } else {
                Ok("học tập".to_string())
            }
        });

        let chain = FallbackChain::new(vec![entry(flaky, 2)], Duration::ZERO);

        let outcome = chain.translate_with_fallback(&cache, "学习", false).await;
        assert_eq!(outcome.translation, "học tập");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_total_exhaustion_degrades_to_none() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);

        let mut a = named_mock("A");
        a.expect_translate()
            .times(2)
            .returning(|_| Err(ProviderError::RateLimited));
        let mut b = named_mock("B");
        b.expect_translate()
            .times(2)
            .returning(|_| Err(ProviderError::EmptyResponse));

        let chain = FallbackChain::new(vec![entry(a, 1), entry(b, 1)], Duration::ZERO);

        let started = std::time::Instant::now();
        let outcome = chain.translate_with_fallback(&cache, "友谊", false).await;
        assert!(started.elapsed() < Duration::from_secs(2));

        assert_eq!(outcome.translation, "");
        assert_eq!(outcome.source, TranslationSource::None);
        assert!(cache.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_bypass_hits_provider() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);
        cache.write().unwrap().put("你好", "stale").unwrap();

        let mut provider = named_mock("Fresh");
        provider
            .expect_translate()
            .times(1)
            .returning(|_| Ok("Xin chào".to_string()));

        let chain = FallbackChain::new(vec![entry(provider, 0)], Duration::ZERO);

        let outcome = chain.translate_with_fallback(&cache, "你好", true).await;
        assert_eq!(outcome.source, TranslationSource::Provider("Fresh".to_string()));
        assert_eq!(cache.read().unwrap().get("你好"), Some("Xin chào"));
    }

    struct StalledProvider;

    #[async_trait]
    impl Provider for StalledProvider {
        fn name(&self) -> &str {
            "Stalled"
        }

        async fn translate(&self, _text: &str) -> std::result::Result<String, ProviderError> {
            sleep(Duration::from_secs(60)).await;
            Ok("never".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_provider_times_out_and_chain_moves_on() {
        let dir = tempdir().unwrap();
        let cache = test_cache(&dir);

        let stalled = ChainEntry {
            provider: Box::new(StalledProvider),
            attempt_timeout: Duration::from_millis(50),
            max_retries: 0,
            retry_delay: Duration::ZERO,
        };

        let mut rescue = named_mock("Rescue");
        rescue
            .expect_translate()
            .times(1)
            .returning(|_| Ok("người".to_string()));

        let chain = FallbackChain::new(vec![stalled, entry(rescue, 0)], Duration::ZERO);

        let outcome = chain.translate_with_fallback(&cache, "人", false).await;
        assert_eq!(outcome.source, TranslationSource::Provider("Rescue".to_string()));
    }
}
