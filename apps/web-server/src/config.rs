//! Application configuration loaded from environment variables.

use std::time::Duration;

use yatube_infra::auth::JwtConfig;
use yatube_infra::cache::PageCacheKeyStrategy;
use yatube_infra::database::DatabaseConfig;

/// Index page cache settings.
#[derive(Debug, Clone)]
pub struct PageCacheConfig {
    pub ttl: Duration,
    pub key_strategy: PageCacheKeyStrategy,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(20),
            key_strategy: PageCacheKeyStrategy::default(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub redis_url: Option<String>,
    pub page_cache: PageCacheConfig,
    pub jwt: JwtConfig,
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS").unwrap_or(20),
                min_connections: parsed(&lookup, "DB_MIN_CONNECTIONS").unwrap_or(2),
                connect_timeout: Duration::from_secs(
                    parsed(&lookup, "DB_CONNECT_TIMEOUT_SECS").unwrap_or(8),
                ),
            });

        let key_strategy = match lookup("INDEX_CACHE_KEY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to the default page cache key strategy");
                PageCacheKeyStrategy::default()
            }),
            None => PageCacheKeyStrategy::default(),
        };
        let page_cache = PageCacheConfig {
            ttl: parsed(&lookup, "INDEX_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(PageCacheConfig::default().ttl),
            key_strategy,
        };

        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed(&lookup, "PORT").unwrap_or(8080),
            database,
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            page_cache,
            jwt: JwtConfig::from_lookup(&lookup),
        }
    }
}
