use super::{InteractionService, ServiceCore};
use crate::application::ports::interaction_gateway::RemotePage;
use crate::domain::entities::{CachedValue, Comment, CountState, Like, LikeState, ListPage};
use crate::domain::value_objects::{CacheKey, InteractionKey, ResourceType};
use crate::shared::error::AppError;
use std::future::Future;
use tracing::warn;

impl ServiceCore {
    /// キャッシュ優先でリソースの集計値を返す。取得できなければ `None`
    pub(super) async fn count_state(&self, resource_id: &str) -> Option<CountState> {
        match self.load_count_state(resource_id).await {
            Ok(counts) => Some(counts),
            Err(err) => {
                warn!(resource_id, error = %err, "Failed to read resource counts");
                None
            }
        }
    }

    /// キャッシュ優先の集計値。リソースが無い場合もエラーになる
    pub(super) async fn load_count_state(&self, resource_id: &str) -> Result<CountState, AppError> {
        let key = CacheKey::count(resource_id);
        if let Some(counts) = self.cache.get(&key).await.and_then(CachedValue::into_count) {
            return Ok(counts);
        }

        let Some(counts) = self.gateway.get_resource(resource_id).await? else {
            return Err(AppError::RemoteReadFailed(format!(
                "Resource not found: {resource_id}"
            )));
        };
        let state = CountState::new(counts.like_count, counts.reply_count, self.cache.now());
        self.cache.put(&key, CachedValue::Count(state.clone()));
        Ok(state)
    }

    /// サーバーで確認できたいいね状態だけを返す。読み取りに失敗したらエラー
    pub(super) async fn load_like_state(&self, key: &InteractionKey) -> Result<LikeState, AppError> {
        let state_key = CacheKey::like_state(key);
        if let Some(state) = self.cache.get(&state_key).await.and_then(CachedValue::into_like) {
            return Ok(state);
        }

        let counts = self.load_count_state(&key.resource_id).await?;
        let is_liked = self
            .gateway
            .has_liked(key.resource_type, &key.resource_id, &key.actor_id)
            .await?;
        let state = LikeState::new(is_liked, counts.like_count, self.cache.now());
        self.cache.put(&state_key, CachedValue::Like(state.clone()));
        Ok(state)
    }

    async fn cached_page<T, Fut>(
        &self,
        key: CacheKey,
        from_cache: fn(CachedValue) -> Option<ListPage<T>>,
        into_cache: fn(ListPage<T>) -> CachedValue,
        fetch: Fut,
    ) -> ListPage<T>
    where
        T: Clone,
        Fut: Future<Output = Result<RemotePage<T>, AppError>>,
    {
        if let Some(page) = self.cache.get(&key).await.and_then(from_cache) {
            return page;
        }

        match fetch.await {
            Ok(remote) => {
                let page = ListPage {
                    items: remote.items,
                    has_more: remote.has_more,
                    cursor: remote.cursor,
                    written_at: self.cache.now(),
                };
                self.cache.put(&key, into_cache(page.clone()));
                page
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to read page; returning empty list");
                ListPage::empty(self.cache.now())
            }
        }
    }
}

impl InteractionService {
    pub async fn get_like_count(&self, resource_id: &str) -> u32 {
        self.core
            .count_state(resource_id)
            .await
            .map_or(0, |counts| counts.like_count)
    }

    pub async fn get_reply_count(&self, resource_id: &str) -> u32 {
        self.core
            .count_state(resource_id)
            .await
            .map_or(0, |counts| counts.reply_count)
    }

    pub async fn has_user_liked(&self, resource_type: ResourceType, resource_id: &str) -> bool {
        self.like_state(resource_type, resource_id).await.is_liked
    }

    /// 現在のユーザーのいいね状態とカウント。未ログインなら常に未いいね
    pub async fn like_state(&self, resource_type: ResourceType, resource_id: &str) -> LikeState {
        let Some(actor) = self.core.session.current_actor() else {
            let count = self.get_like_count(resource_id).await;
            return LikeState::new(false, count, self.core.cache.now());
        };

        let key = InteractionKey::new(resource_type, resource_id, actor.id);
        match self.core.load_like_state(&key).await {
            Ok(state) => state,
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to read like state");
                let count = self
                    .core
                    .cache
                    .peek(&CacheKey::count(resource_id))
                    .and_then(CachedValue::into_count)
                    .map_or(0, |counts| counts.like_count);
                LikeState::new(false, count, self.core.cache.now())
            }
        }
    }

    /// コメント一覧の 1 ページ。`cursor` が `None` なら先頭ページ
    pub async fn get_comments(
        &self,
        resource_id: &str,
        cursor: Option<String>,
    ) -> ListPage<Comment> {
        let page = self.core.page_request(cursor);
        let key = CacheKey::comments_page(resource_id, &page);
        self.core
            .cached_page(
                key,
                CachedValue::into_comments,
                CachedValue::Comments,
                self.core.gateway.get_comments_page(resource_id, &page),
            )
            .await
    }

    pub async fn get_likes(&self, resource_id: &str, cursor: Option<String>) -> ListPage<Like> {
        let page = self.core.page_request(cursor);
        let key = CacheKey::likes_page(resource_id, &page);
        self.core
            .cached_page(
                key,
                CachedValue::into_likes,
                CachedValue::Likes,
                self.core.gateway.get_likes_page(resource_id, &page),
            )
            .await
    }
}
