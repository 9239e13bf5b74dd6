use crate::application::ports::clock::Clock;
use crate::application::ports::durable_cache::DurableCache;
use crate::application::ports::interaction_gateway::InteractionGateway;
use crate::application::ports::session::ActorSession;
use crate::application::services::{InteractionService, SubscriptionBridge};
use crate::infrastructure::cache::TtlCacheStore;
use crate::infrastructure::storage::SqliteDurableCache;
use crate::infrastructure::time::SystemClock;
use crate::shared::config::InteractionConfig;
use crate::shared::error::AppError;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 画面側が保持するエンジン全体の状態
#[derive(Clone)]
pub struct InteractionState {
    pub config: InteractionConfig,
    pub cache: Arc<TtlCacheStore>,
    pub interactions: Arc<InteractionService>,
    pub subscriptions: Arc<SubscriptionBridge>,
}

impl InteractionState {
    pub async fn new(
        config: InteractionConfig,
        gateway: Arc<dyn InteractionGateway>,
        durable: Arc<dyn DurableCache>,
        session: Arc<dyn ActorSession>,
    ) -> Result<Self, AppError> {
        Self::with_clock(config, gateway, durable, session, Arc::new(SystemClock)).await
    }

    /// 時刻ソースを差し替えて組み立てる（シミュレーションやテスト用）
    pub async fn with_clock(
        config: InteractionConfig,
        gateway: Arc<dyn InteractionGateway>,
        durable: Arc<dyn DurableCache>,
        session: Arc<dyn ActorSession>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Configuration)?;

        let cache = Arc::new(TtlCacheStore::new(
            durable,
            clock,
            config.cache.ttl(),
            config.cache.memory_capacity,
        ));
        let restored = cache.hydrate().await;

        let interactions = Arc::new(InteractionService::new(
            &config,
            Arc::clone(&cache),
            Arc::clone(&gateway),
            session,
        ));
        let subscriptions = Arc::new(SubscriptionBridge::new(
            Arc::clone(&cache),
            gateway,
            config.comments.page_size,
        ));

        info!(restored, "Interaction engine initialized");
        Ok(Self {
            config,
            cache,
            interactions,
            subscriptions,
        })
    }

    /// `cache.database_url` の SQLite を永続層に使う
    pub async fn with_sqlite(
        config: InteractionConfig,
        gateway: Arc<dyn InteractionGateway>,
        session: Arc<dyn ActorSession>,
    ) -> Result<Self, AppError> {
        ensure_database_dir(&config.cache.database_url)?;
        let durable = SqliteDurableCache::connect(&config.cache.database_url).await?;
        Self::new(config, gateway, Arc::new(durable), session).await
    }

    /// 未確定のトグルを破棄し、永続層への書き込みを待つ
    pub async fn shutdown(&self) {
        self.interactions.shutdown();
        self.cache.flush().await;
    }
}

fn ensure_database_dir(database_url: &str) -> Result<(), AppError> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Configuration(format!("Failed to create cache directory: {e}"))
        })?;
    }
    Ok(())
}
