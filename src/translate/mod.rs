// Multi-provider translation with ordered fallback
//
// This module provides the translation side of a lookup:
// - Provider: capability implemented by every translation backend
// - HttpProvider: config-driven client for the supported wire protocols
// - FallbackChain: tries providers in priority order with retries and
//   timeouts, backed by the flat-file cache

pub mod chain;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chain::{ChainEntry, FallbackChain, FallbackOutcome};
pub use http::HttpProvider;

/// Why a single provider attempt failed. Every variant is recoverable by
/// moving on to the next attempt or provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited,

    #[error("empty or unusable response")]
    EmptyResponse,

    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// A translation backend. Implementations must not retry internally; the
/// chain owns the retry and timeout policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Display name, used as the result source tag.
    fn name(&self) -> &str;

    /// Translate `text` from the configured source to target language.
    async fn translate(&self, text: &str) -> std::result::Result<String, ProviderError>;
}

/// Where a translation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationSource {
    /// Served from the flat-file cache, no provider invoked
    Cache,
    /// Fetched from the named provider
    Provider(String),
    /// Every provider failed; the translation is empty
    None,
}

impl std::fmt::Display for TranslationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Provider(name) => write!(f, "{}", name),
            Self::None => write!(f, "unavailable"),
        }
    }
}
