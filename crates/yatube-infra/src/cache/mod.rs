//! Cache implementations - Redis and in-memory fallback - plus the rendered page cache.

mod memory;
mod page;

pub use memory::InMemoryCache;
pub use page::{PageCache, PageCacheKeyStrategy};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisCache, RedisConfig};
