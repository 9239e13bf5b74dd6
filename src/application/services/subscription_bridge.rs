use crate::application::ports::interaction_gateway::{
    CommentsSnapshot, InteractionGateway, LikesSnapshot,
};
use crate::domain::entities::{CachedValue, ListPage};
use crate::domain::value_objects::{CacheKey, PageRequest, ResourceType};
use crate::infrastructure::cache::TtlCacheStore;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// 購読で反映した更新の通知
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeUpdate {
    Likes(LikesSnapshot),
    Comments(CommentsSnapshot),
}

impl BridgeUpdate {
    pub fn resource_id(&self) -> &str {
        match self {
            BridgeUpdate::Likes(snapshot) => &snapshot.resource_id,
            BridgeUpdate::Comments(snapshot) => &snapshot.resource_id,
        }
    }
}

struct CacheApplier {
    cache: Arc<TtlCacheStore>,
    head_page: PageRequest,
}

impl CacheApplier {
    /// 既存の値より新しい（または同時刻の）プッシュだけが勝つ
    fn is_newer(existing: DateTime<Utc>, observed_at: DateTime<Utc>) -> bool {
        existing <= observed_at
    }

    fn should_replace(&self, key: &CacheKey, observed_at: DateTime<Utc>) -> bool {
        self.cache
            .peek(key)
            .is_none_or(|existing| Self::is_newer(existing.written_at(), observed_at))
    }

    fn apply_likes(&self, snapshot: &LikesSnapshot) {
        let resource_id = snapshot.resource_id.as_str();
        let observed_at = snapshot.observed_at;

        let page_key = CacheKey::likes_page(resource_id, &self.head_page);
        if self.should_replace(&page_key, observed_at) {
            self.cache.put(
                &page_key,
                CachedValue::Likes(ListPage {
                    items: snapshot.likes.clone(),
                    has_more: snapshot.has_more,
                    cursor: snapshot.cursor.clone(),
                    written_at: observed_at,
                }),
            );
        }

        self.cache.update(&CacheKey::count(resource_id), |value| {
            if let CachedValue::Count(counts) = value
                && Self::is_newer(counts.written_at, observed_at)
            {
                counts.like_count = snapshot.like_count;
                counts.written_at = observed_at;
            }
        });

        // 各ユーザーのいいね状態はカウントだけ差し替える
        for resource_type in [ResourceType::WhisperLike, ResourceType::CommentLike] {
            let prefix = CacheKey::like_state_prefix(resource_type, resource_id);
            for key in self.cache.keys_with_prefix(&prefix) {
                self.cache.update(&key, |value| {
                    if let CachedValue::Like(state) = value
                        && Self::is_newer(state.written_at, observed_at)
                    {
                        state.count = snapshot.like_count;
                        state.written_at = observed_at;
                    }
                });
            }
        }
    }

    fn apply_comments(&self, snapshot: &CommentsSnapshot) {
        let resource_id = snapshot.resource_id.as_str();
        let observed_at = snapshot.observed_at;

        let page_key = CacheKey::comments_page(resource_id, &self.head_page);
        if self.should_replace(&page_key, observed_at) {
            self.cache.put(
                &page_key,
                CachedValue::Comments(ListPage {
                    items: snapshot.comments.clone(),
                    has_more: snapshot.has_more,
                    cursor: snapshot.cursor.clone(),
                    written_at: observed_at,
                }),
            );
        }

        self.cache.update(&CacheKey::count(resource_id), |value| {
            if let CachedValue::Count(counts) = value
                && Self::is_newer(counts.written_at, observed_at)
            {
                counts.reply_count = snapshot.reply_count;
                counts.written_at = observed_at;
            }
        });
    }
}

/// リモートのプッシュをキャッシュへ流し込む
pub struct SubscriptionBridge {
    gateway: Arc<dyn InteractionGateway>,
    applier: Arc<CacheApplier>,
}

impl SubscriptionBridge {
    pub fn new(
        cache: Arc<TtlCacheStore>,
        gateway: Arc<dyn InteractionGateway>,
        page_size: u32,
    ) -> Self {
        Self {
            gateway,
            applier: Arc::new(CacheApplier {
                cache,
                head_page: PageRequest::first(page_size),
            }),
        }
    }

    /// リソースのいいね・コメントを購読する。
    ///
    /// 購読を開けなかったストリームはログに残して無視する（読み取りは可用性優先）。
    pub async fn subscribe<F>(&self, resource_id: &str, on_update: F) -> SubscriptionHandle
    where
        F: Fn(BridgeUpdate) + Send + Sync + 'static,
    {
        let on_update: Arc<dyn Fn(BridgeUpdate) + Send + Sync> = Arc::new(on_update);
        let mut tasks = Vec::new();

        match self.gateway.subscribe_to_resource_likes(resource_id).await {
            Ok(mut stream) => {
                let applier = Arc::clone(&self.applier);
                let on_update = Arc::clone(&on_update);
                let resource = resource_id.to_string();
                tasks.push(tokio::spawn(async move {
                    while let Some(snapshot) = stream.next().await {
                        applier.apply_likes(&snapshot);
                        on_update(BridgeUpdate::Likes(snapshot));
                    }
                    debug!(resource_id = %resource, "Likes subscription ended");
                }));
            }
            Err(err) => {
                warn!(resource_id, error = %err, "Failed to subscribe to likes");
            }
        }

        match self.gateway.subscribe_to_comments(resource_id).await {
            Ok(mut stream) => {
                let applier = Arc::clone(&self.applier);
                let on_update = Arc::clone(&on_update);
                let resource = resource_id.to_string();
                tasks.push(tokio::spawn(async move {
                    while let Some(snapshot) = stream.next().await {
                        applier.apply_comments(&snapshot);
                        on_update(BridgeUpdate::Comments(snapshot));
                    }
                    debug!(resource_id = %resource, "Comments subscription ended");
                }));
            }
            Err(err) => {
                warn!(resource_id, error = %err, "Failed to subscribe to comments");
            }
        }

        debug!(resource_id, streams = tasks.len(), "Subscribed to resource");
        SubscriptionHandle {
            resource_id: resource_id.to_string(),
            tasks: Mutex::new(tasks),
        }
    }
}

/// 購読の所有権。drop すると購読を解除する
#[derive(Debug)]
pub struct SubscriptionHandle {
    resource_id: String,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SubscriptionHandle {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// 購読中のストリームがあるか（開けなかった場合は最初から `false`）
    pub fn is_active(&self) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|task| !task.is_finished())
    }

    /// 購読を解除する。二回目以降は何もしない
    pub fn unsubscribe(&self) {
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        debug!(resource_id = %self.resource_id, "Unsubscribed from resource");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
