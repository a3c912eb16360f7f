//! Token metadata cache.
//!
//! Modeled as a small repository: explicit `get`/`put`, seeded from
//! configured known tokens, backed by a bounded LRU so an unbounded stream of
//! newly-sniped mints cannot grow the cache forever. A 5-minute TTL on top of
//! the LRU bounds how stale a cached entry can get. On a miss, `resolve`
//! falls over to a list of configured community API mirrors before giving
//! up, mirroring the on-chain-or-HTTP-mirror fallback used for program IDL
//! lookups.

use std::time::{Duration, Instant};

use clru::CLruCache;
use parking_lot::Mutex;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::constants::trade::{METADATA_API_FETCH_TIMEOUT, TOKEN_METADATA_TTL};

const CACHE_CAPACITY: usize = 10_000;

/// Where a `TokenMetadataEntry`'s data was last produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    /// Seeded from the `known_tokens` configuration entry.
    Known,
    /// Decoded from an on-chain account by the caller.
    Chain,
    /// Fetched over HTTPS from a configured community API mirror.
    Api,
    /// Served from a live cache entry without triggering any fetch.
    Cache,
}

#[derive(Debug, Clone)]
pub struct TokenMetadataEntry {
    pub decimals: u8,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub source: MetadataSource,
    pub updated_at: Instant,
}

impl TokenMetadataEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.updated_at.elapsed() < ttl
    }
}

/// A single known-token seed entry read from configuration.
#[derive(Debug, Clone)]
pub struct KnownTokenConfig {
    pub mint: Pubkey,
    pub decimals: u8,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

pub struct TokenMetadataCache {
    entries: Mutex<CLruCache<Pubkey, TokenMetadataEntry>>,
    ttl: Duration,
    http: reqwest::Client,
    mirrors: Vec<String>,
}

/// Shape of a community API mirror's response for `GET {mirror}/{mint}`.
#[derive(Debug, Deserialize)]
struct ApiMetadataResponse {
    decimals: u8,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

impl TokenMetadataCache {
    pub fn new() -> Self {
        Self::with_ttl(TOKEN_METADATA_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_ttl_and_mirrors(ttl, Vec::new())
    }

    pub fn with_ttl_and_mirrors(ttl: Duration, mirrors: Vec<String>) -> Self {
        Self {
            entries: Mutex::new(CLruCache::new(std::num::NonZeroUsize::new(CACHE_CAPACITY).unwrap())),
            ttl,
            http: reqwest::Client::builder()
                .timeout(METADATA_API_FETCH_TIMEOUT)
                .build()
                .expect("static reqwest client config is always valid"),
            mirrors,
        }
    }

    /// Seeds the cache from statically-configured known tokens. These never
    /// expire under the normal TTL check since `updated_at` is reset on
    /// every `get` miss that re-seeds from configuration would require; here
    /// they're inserted once at construction and treated like any other
    /// entry afterward.
    pub fn seeded(known_tokens: &[KnownTokenConfig]) -> Self {
        Self::seeded_with_mirrors(known_tokens, Vec::new())
    }

    pub fn seeded_with_mirrors(known_tokens: &[KnownTokenConfig], mirrors: Vec<String>) -> Self {
        let cache = Self::with_ttl_and_mirrors(TOKEN_METADATA_TTL, mirrors);
        for token in known_tokens {
            cache.put(
                token.mint,
                TokenMetadataEntry {
                    decimals: token.decimals,
                    symbol: token.symbol.clone(),
                    name: token.name.clone(),
                    price: None,
                    source: MetadataSource::Known,
                    updated_at: Instant::now(),
                },
            );
        }
        cache
    }

    /// Returns a fresh cached entry, or `None` on a miss or TTL expiry.
    pub fn get(&self, mint: &Pubkey) -> Option<TokenMetadataEntry> {
        let mut entries = self.entries.lock();
        let entry = entries.get(mint)?;
        if entry.is_fresh(self.ttl) {
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn put(&self, mint: Pubkey, entry: TokenMetadataEntry) {
        self.entries.lock().put(mint, entry);
    }

    pub fn decimals_or_fallback(&self, mint: &Pubkey, fallback: u8) -> u8 {
        self.get(mint).map(|e| e.decimals).unwrap_or(fallback)
    }

    /// Returns a fresh cache hit as-is (tagged [`MetadataSource::Cache`]);
    /// on a miss, queries each configured mirror in order over HTTPS and
    /// caches the first successful response as [`MetadataSource::Api`].
    /// Returns `None` if the cache misses and no mirror answers.
    pub async fn resolve(&self, mint: &Pubkey) -> Option<TokenMetadataEntry> {
        if let Some(mut entry) = self.get(mint) {
            entry.source = MetadataSource::Cache;
            return Some(entry);
        }
        self.fetch_via_api(mint).await
    }

    async fn fetch_via_api(&self, mint: &Pubkey) -> Option<TokenMetadataEntry> {
        for mirror in &self.mirrors {
            let url = format!("{}/{}", mirror.trim_end_matches('/'), mint);
            let response = match self.http.get(&url).send().await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(%mirror, %mint, error = %err, "metadata mirror request failed");
                    continue;
                }
            };
            let parsed = match response.json::<ApiMetadataResponse>().await {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(%mirror, %mint, error = %err, "metadata mirror returned unparseable body");
                    continue;
                }
            };
            let entry = TokenMetadataEntry {
                decimals: parsed.decimals,
                symbol: parsed.symbol,
                name: parsed.name,
                price: parsed.price,
                source: MetadataSource::Api,
                updated_at: Instant::now(),
            };
            self.put(*mint, entry.clone());
            return Some(entry);
        }
        None
    }
}

impl Default for TokenMetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_entries_are_retrievable() {
        let mint = Pubkey::new_unique();
        let cache = TokenMetadataCache::seeded(&[KnownTokenConfig {
            mint,
            decimals: 9,
            symbol: Some("WSOL".into()),
            name: None,
        }]);
        let entry = cache.get(&mint).expect("seeded entry present");
        assert_eq!(entry.decimals, 9);
        assert_eq!(entry.source, MetadataSource::Known);
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = TokenMetadataCache::with_ttl(Duration::from_millis(1));
        let mint = Pubkey::new_unique();
        cache.put(
            mint,
            TokenMetadataEntry {
                decimals: 6,
                symbol: None,
                name: None,
                price: None,
                source: MetadataSource::Chain,
                updated_at: Instant::now() - Duration::from_secs(1),
            },
        );
        assert!(cache.get(&mint).is_none());
    }

    #[test]
    fn decimals_or_fallback_uses_default_on_miss() {
        let cache = TokenMetadataCache::new();
        assert_eq!(cache.decimals_or_fallback(&Pubkey::new_unique(), 6), 6);
    }

    #[tokio::test]
    async fn resolve_tags_a_fresh_cache_hit_as_cache_sourced() {
        let mint = Pubkey::new_unique();
        let cache = TokenMetadataCache::seeded(&[KnownTokenConfig {
            mint,
            decimals: 9,
            symbol: None,
            name: None,
        }]);
        let entry = cache.resolve(&mint).await.expect("cache hit");
        assert_eq!(entry.source, MetadataSource::Cache);
    }

    #[tokio::test]
    async fn resolve_misses_with_no_mirrors_configured() {
        let cache = TokenMetadataCache::new();
        assert!(cache.resolve(&Pubkey::new_unique()).await.is_none());
    }
}
