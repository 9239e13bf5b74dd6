use super::{CommentOutcome, DeleteOutcome, InteractionService, ServiceCore};
use crate::domain::entities::{CachedValue, Comment, CountState};
use crate::domain::value_objects::CacheKey;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// 楽観的に取り除いたコメントと元の位置
struct RemovedComment {
    page: CacheKey,
    position: usize,
    comment: Comment,
}

impl ServiceCore {
    fn validate_comment<'a>(&self, text: &'a str) -> Result<&'a str, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput(
                "Comment text cannot be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.max_comment_length {
            return Err(AppError::InvalidInput(format!(
                "Comment text exceeds {} characters",
                self.max_comment_length
            )));
        }
        Ok(trimmed)
    }

    /// 返信数を書き換え、変更前の値を返す（キャッシュが無ければ `None`）
    fn adjust_reply_count<F>(
        &self,
        resource_id: &str,
        now: DateTime<Utc>,
        adjust: F,
    ) -> Option<u32>
    where
        F: FnOnce(u32) -> u32,
    {
        let mut original = None;
        self.cache.update(&CacheKey::count(resource_id), |value| {
            if let CachedValue::Count(counts) = value {
                original = Some(counts.reply_count);
                counts.reply_count = adjust(counts.reply_count);
                counts.written_at = now;
            }
        });
        original
    }

    /// 楽観的な変更より新しい値（購読のプッシュ）が入っていれば戻さない
    fn restore_reply_count(
        &self,
        resource_id: &str,
        original: Option<u32>,
        optimistic_at: DateTime<Utc>,
    ) {
        let Some(count) = original else {
            return;
        };
        self.cache.update(&CacheKey::count(resource_id), |value| {
            if let CachedValue::Count(counts) = value
                && counts.written_at <= optimistic_at
            {
                counts.reply_count = count;
            }
        });
    }

    fn cached_reply_count(&self, resource_id: &str) -> Option<u32> {
        self.cache
            .peek(&CacheKey::count(resource_id))
            .and_then(CachedValue::into_count)
            .map(|counts| counts.reply_count)
    }

    /// 書き込み後の返信数。サーバーの値が取れればキャッシュごと上書きする
    async fn reconciled_reply_count(&self, resource_id: &str) -> u32 {
        match self.gateway.get_resource(resource_id).await {
            Ok(Some(counts)) => {
                let state = CountState::new(counts.like_count, counts.reply_count, self.cache.now());
                self.cache.put(&CacheKey::count(resource_id), CachedValue::Count(state));
                counts.reply_count
            }
            Ok(None) => self.cached_reply_count(resource_id).unwrap_or_default(),
            Err(err) => {
                debug!(resource_id, error = %err, "Reconcile read failed; keeping optimistic reply count");
                self.cached_reply_count(resource_id).unwrap_or_default()
            }
        }
    }

    /// キャッシュ済みの先頭ページの先頭に仮コメントを差し込む
    fn insert_pending(&self, resource_id: &str, pending: &Comment) -> Vec<CacheKey> {
        let pages: Vec<CacheKey> = self
            .cache
            .keys_with_prefix(&CacheKey::comments_prefix(resource_id))
            .into_iter()
            .filter(CacheKey::is_head_page)
            .collect();

        pages
            .into_iter()
            .filter(|page| {
                self.cache
                    .update(page, |value| {
                        if let CachedValue::Comments(list) = value {
                            list.items.insert(0, pending.clone());
                        }
                    })
                    .is_some()
            })
            .collect()
    }

    fn remove_pending(&self, pages: &[CacheKey], pending_id: &str) {
        for page in pages {
            self.cache.update(page, |value| {
                if let CachedValue::Comments(list) = value {
                    list.items.retain(|comment| comment.id != pending_id);
                }
            });
        }
    }

    fn remove_from_pages(&self, resource_id: &str, comment_id: &str) -> Vec<RemovedComment> {
        let mut removed = Vec::new();
        for page in self
            .cache
            .keys_with_prefix(&CacheKey::comments_prefix(resource_id))
        {
            self.cache.update(&page, |value| {
                if let CachedValue::Comments(list) = value
                    && let Some(position) = list.items.iter().position(|c| c.id == comment_id)
                {
                    let comment = list.items.remove(position);
                    removed.push(RemovedComment {
                        page: page.clone(),
                        position,
                        comment,
                    });
                }
            });
        }
        removed
    }

    fn restore_removed(&self, removed: Vec<RemovedComment>) {
        for entry in removed {
            self.cache.update(&entry.page, |value| {
                if let CachedValue::Comments(list) = value {
                    let position = entry.position.min(list.items.len());
                    list.items.insert(position, entry.comment);
                }
            });
        }
    }
}

impl InteractionService {
    /// コメントを投稿する。
    ///
    /// 返信数と先頭ページは書き込み前に楽観的に更新され、失敗時は元に戻る。
    pub async fn add_comment(
        &self,
        resource_id: &str,
        text: &str,
    ) -> Result<CommentOutcome, AppError> {
        let actor = self.core.require_actor()?;
        let text = self.core.validate_comment(text)?;
        let _guard = self
            .core
            .locks
            .acquire(format!("add_comment:{resource_id}:{}", actor.id))?;

        let now = self.core.cache.now();
        let pending = Comment::pending(resource_id, &actor, text, now);
        let pages = self.core.insert_pending(resource_id, &pending);
        let original_count = self
            .core
            .adjust_reply_count(resource_id, now, |count| count.saturating_add(1));

        match self.core.gateway.add_comment(resource_id, &actor, text).await {
            Ok(comment_id) => {
                self.core
                    .cache
                    .invalidate(&CacheKey::comments_prefix(resource_id));
                let count = self.core.reconciled_reply_count(resource_id).await;
                info!(resource_id, comment_id = %comment_id, count, "Comment added");
                Ok(CommentOutcome { comment_id, count })
            }
            Err(err) => {
                self.core.remove_pending(&pages, &pending.id);
                self.core.restore_reply_count(resource_id, original_count, now);
                warn!(resource_id, error = %err, "Failed to add comment; rolled back");
                Err(err)
            }
        }
    }

    pub async fn delete_comment(
        &self,
        comment_id: &str,
        resource_id: &str,
    ) -> Result<DeleteOutcome, AppError> {
        let actor = self.core.require_actor()?;
        let _guard = self
            .core
            .locks
            .acquire(format!("delete_comment:{comment_id}"))?;

        let now = self.core.cache.now();
        let removed = self.core.remove_from_pages(resource_id, comment_id);
        let original_count = self
            .core
            .adjust_reply_count(resource_id, now, |count| count.saturating_sub(1));

        match self.core.gateway.delete_comment(comment_id, &actor.id).await {
            Ok(()) => {
                self.core
                    .cache
                    .invalidate(&CacheKey::comments_prefix(resource_id));
                let count = self.core.reconciled_reply_count(resource_id).await;
                info!(resource_id, comment_id, count, "Comment deleted");
                Ok(DeleteOutcome { count })
            }
            Err(err) => {
                self.core.restore_removed(removed);
                self.core.restore_reply_count(resource_id, original_count, now);
                warn!(resource_id, comment_id, error = %err, "Failed to delete comment; rolled back");
                Err(err)
            }
        }
    }
}
