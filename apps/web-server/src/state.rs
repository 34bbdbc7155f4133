//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::accounts::AccountService;
use yatube_core::feed::FeedService;
use yatube_core::follow::FollowService;
use yatube_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, PostRepository, TokenService,
    UserRepository,
};
use yatube_core::posts::PostService;
use yatube_infra::auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
use yatube_infra::cache::{InMemoryCache, PageCache};
use yatube_infra::database::InMemoryStore;

#[cfg(feature = "postgres")]
use yatube_infra::database::{
    DatabaseConnections, PostgresCommentRepository, PostgresFollowRepository,
    PostgresGroupRepository, PostgresPostRepository, PostgresUserRepository,
};

use crate::config::{AppConfig, PageCacheConfig};

/// One handle per entity store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store,
        }
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(connections: &DatabaseConnections) -> Self {
        let db = &connections.main;
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            groups: Arc::new(PostgresGroupRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
            follows: Arc::new(PostgresFollowRepository::new(db.clone())),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub posts: PostService,
    pub follows: FollowService,
    pub accounts: AccountService,
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub page_cache: PageCache,
    pub tokens: Arc<dyn TokenService>,
    /// Which entity store is active, for the health check.
    pub store_backend: &'static str,
    pub cache_backend: &'static str,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Wire services over the given stores and cache.
    pub fn from_parts(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        page_cache: &PageCacheConfig,
        jwt: JwtConfig,
    ) -> Self {
        let passwords = Arc::new(Argon2PasswordService::new());

        Self {
            feed: FeedService::new(repos.posts.clone(), repos.users.clone(), repos.groups.clone()),
            posts: PostService::new(
                repos.posts.clone(),
                repos.users.clone(),
                repos.groups.clone(),
                repos.comments.clone(),
            ),
            follows: FollowService::new(repos.follows.clone()),
            accounts: AccountService::new(repos.users.clone(), passwords),
            users: repos.users,
            groups: repos.groups,
            page_cache: PageCache::new(cache, page_cache.ttl, page_cache.key_strategy),
            tokens: Arc::new(JwtTokenService::new(jwt)),
            store_backend: "memory",
            cache_backend: "memory",
            #[cfg(feature = "postgres")]
            db: None,
        }
    }

    /// Build the application state from configuration.
    ///
    /// Unreachable backends degrade to their in-memory counterparts.
    pub async fn new(config: &AppConfig) -> Self {
        let (cache, cache_backend) = Self::init_cache(config).await;

        #[cfg(feature = "postgres")]
        {
            if let Some(db_config) = &config.database {
                match DatabaseConnections::init(db_config).await {
                    Ok(connections) => {
                        let connections = Arc::new(connections);
                        let repos = Repositories::postgres(&connections);
                        let mut state =
                            Self::from_parts(repos, cache, &config.page_cache, config.jwt.clone());
                        state.store_backend = "postgres";
                        state.cache_backend = cache_backend;
                        state.db = Some(connections);
                        tracing::info!("Application state initialized");
                        return state;
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory store.",
                            e
                        );
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running with the in-memory store.");
            }
        }

        #[cfg(not(feature = "postgres"))]
        {
            if config.database.is_some() {
                tracing::warn!("Built without postgres feature - DATABASE_URL ignored");
            }
        }

        let mut state = Self::from_parts(
            Repositories::in_memory(),
            cache,
            &config.page_cache,
            config.jwt.clone(),
        );
        state.cache_backend = cache_backend;
        tracing::info!("Application state initialized");
        state
    }

    #[cfg(feature = "redis")]
    async fn init_cache(config: &AppConfig) -> (Arc<dyn Cache>, &'static str) {
        use yatube_infra::cache::{RedisCache, RedisConfig};

        if let Some(url) = &config.redis_url {
            let redis_config = RedisConfig {
                url: url.clone(),
                ..RedisConfig::default()
            };
            match RedisCache::new(redis_config).await {
                Ok(cache) => return (Arc::new(cache), "redis"),
                Err(e) => {
                    tracing::error!("Failed to connect to Redis: {}. Using in-memory cache.", e);
                }
            }
        }
        (Arc::new(InMemoryCache::new()), "memory")
    }

    #[cfg(not(feature = "redis"))]
    async fn init_cache(config: &AppConfig) -> (Arc<dyn Cache>, &'static str) {
        if config.redis_url.is_some() {
            tracing::warn!("Built without redis feature - REDIS_URL ignored");
        }
        (Arc::new(InMemoryCache::new()), "memory")
    }
}
