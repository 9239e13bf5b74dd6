use super::{InteractionEvent, InteractionService, ServiceCore, like_lock_key};
use crate::application::services::settle_debouncer::{SettleHandler, SettleIntent};
use crate::domain::entities::{CachedValue, CountState, LikeState};
use crate::domain::value_objects::{CacheKey, InteractionKey, ResourceType};
use crate::shared::error::AppError;
use async_trait::async_trait;
use tracing::{debug, info, warn};

impl InteractionService {
    /// いいねを反転し、楽観的な状態を即座に返す。
    ///
    /// サーバーへの書き込みは連続トグルが落ち着いてから 1 回だけ行われ、
    /// 結果は `subscribe_events` で通知される。
    pub async fn toggle_like(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<LikeState, AppError> {
        let actor = self.core.require_actor()?;
        let key = InteractionKey::new(resource_type, resource_id, actor.id.clone());
        let lock_key = like_lock_key(&key);
        if self.core.locks.is_held(&lock_key) {
            return Err(AppError::in_progress(lock_key));
        }

        let state_key = CacheKey::like_state(&key);
        let current = match self.core.cache.peek(&state_key).and_then(CachedValue::into_like) {
            Some(state) => state,
            None => {
                // サーバーで確認できない状態を元にトグルすると書き込みが逆転する
                let loaded = self.core.load_like_state(&key).await?;
                // 読み込み中に書き込みが始まっていないか再確認する
                if self.core.locks.is_held(&lock_key) {
                    return Err(AppError::in_progress(lock_key));
                }
                self.core
                    .cache
                    .peek(&state_key)
                    .and_then(CachedValue::into_like)
                    .unwrap_or(loaded)
            }
        };

        // ここから先は中断点なし
        let now = self.core.cache.now();
        let next = current.toggled(now);
        self.core.cache.put(&state_key, CachedValue::Like(next.clone()));

        let mut original_count = None;
        self.core.cache.update(&CacheKey::count(resource_id), |value| {
            if let CachedValue::Count(counts) = value {
                original_count = Some(counts.like_count);
                counts.like_count = if next.is_liked {
                    counts.like_count.saturating_add(1)
                } else {
                    counts.like_count.saturating_sub(1)
                };
                counts.written_at = now;
            }
        });

        self.debouncer.record(&key, current, original_count, next.clone());
        debug!(key = %key, is_liked = next.is_liked, count = next.count, "Optimistic like toggle");

        Ok(next)
    }
}

impl ServiceCore {
    /// 楽観的な変更を取り消す。トグル後に届いたプッシュのカウントは残す
    fn revert_like(&self, key: &InteractionKey, intent: &SettleIntent, error: AppError) {
        let optimistic_at = intent.target_state.written_at;
        let original = intent.original_state.clone();
        let state_key = CacheKey::like_state(key);

        let reverted = self
            .cache
            .update(&state_key, |value| {
                if let CachedValue::Like(state) = value {
                    if state.written_at > optimistic_at {
                        state.is_liked = original.is_liked;
                    } else {
                        *state = original.clone();
                    }
                }
            })
            .and_then(CachedValue::into_like);
        let state = match reverted {
            Some(state) => state,
            None => {
                self.cache.put(&state_key, CachedValue::Like(original.clone()));
                original
            }
        };

        if let Some(count) = intent.original_count {
            self.cache.update(&CacheKey::count(&key.resource_id), |value| {
                if let CachedValue::Count(counts) = value
                    && counts.written_at <= optimistic_at
                {
                    counts.like_count = count;
                }
            });
        }

        warn!(key = %key, error = %error, "Like write failed; reverted optimistic state");
        self.publish(InteractionEvent::LikeReverted {
            key: key.clone(),
            state,
            error,
        });
    }

    /// 書き込み後にサーバーの集計値で楽観値を上書きする
    async fn reconcile_like(&self, key: &InteractionKey, target: LikeState) -> LikeState {
        let counts = match self.gateway.get_resource(&key.resource_id).await {
            Ok(Some(counts)) => counts,
            Ok(None) => return target,
            Err(err) => {
                debug!(key = %key, error = %err, "Reconcile read failed; keeping optimistic count");
                return target;
            }
        };

        let now = self.cache.now();
        self.cache.put(
            &CacheKey::count(&key.resource_id),
            CachedValue::Count(CountState::new(counts.like_count, counts.reply_count, now)),
        );

        if counts.like_count == target.count {
            return target;
        }

        debug!(
            key = %key,
            optimistic = target.count,
            server = counts.like_count,
            "Server like count differs; overwriting"
        );
        let reconciled = LikeState::new(target.is_liked, counts.like_count, now);
        self.cache.put(
            &CacheKey::like_state(key),
            CachedValue::Like(reconciled.clone()),
        );
        reconciled
    }
}

#[async_trait]
impl SettleHandler for ServiceCore {
    async fn on_settled(&self, key: InteractionKey, intent: SettleIntent) {
        let lock_key = like_lock_key(&key);
        let Some(_guard) = self.locks.try_lock(lock_key.clone()) else {
            self.revert_like(&key, &intent, AppError::in_progress(lock_key));
            return;
        };

        let actor = match self.session.current_actor() {
            Some(actor) if actor.id == key.actor_id => actor,
            _ => {
                self.revert_like(&key, &intent, AppError::Unauthenticated);
                return;
            }
        };

        match self
            .gateway
            .like_resource(key.resource_type, &key.resource_id, &actor)
            .await
        {
            Ok(()) => {
                let state = self.reconcile_like(&key, intent.target_state).await;
                info!(key = %key, is_liked = state.is_liked, count = state.count, "Like settled");
                self.publish(InteractionEvent::LikeSettled { key, state });
            }
            Err(err) if err.is_contention() => {
                debug!(key = %key, error = %err, "Like write contended; keeping optimistic state");
            }
            Err(err) => self.revert_like(&key, &intent, err),
        }
    }

    async fn on_skipped(&self, key: InteractionKey, _intent: SettleIntent) {
        self.publish(InteractionEvent::LikeSkipped { key });
    }
}
