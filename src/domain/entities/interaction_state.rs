use super::{Comment, Like};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ユーザー自身のいいね状態と表示用カウント
///
/// `is_liked` と `count` は別々のソースから来るため、楽観的更新の間は
/// 一時的に食い違うことがある。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub is_liked: bool,
    pub count: u32,
    pub written_at: DateTime<Utc>,
}

impl LikeState {
    pub fn new(is_liked: bool, count: u32, written_at: DateTime<Utc>) -> Self {
        Self {
            is_liked,
            count,
            written_at,
        }
    }

    /// いいねを反転した状態を返す（カウントは 0 未満にならない）
    pub fn toggled(&self, written_at: DateTime<Utc>) -> Self {
        let is_liked = !self.is_liked;
        let count = if is_liked {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        Self {
            is_liked,
            count,
            written_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountState {
    pub like_count: u32,
    pub reply_count: u32,
    pub written_at: DateTime<Utc>,
}

impl CountState {
    pub fn new(like_count: u32, reply_count: u32, written_at: DateTime<Utc>) -> Self {
        Self {
            like_count,
            reply_count,
            written_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub cursor: Option<String>,
    pub written_at: DateTime<Utc>,
}

impl<T> ListPage<T> {
    pub fn empty(written_at: DateTime<Utc>) -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
            cursor: None,
            written_at,
        }
    }
}

/// キャッシュに保存される値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    Like(LikeState),
    Count(CountState),
    Comments(ListPage<Comment>),
    Likes(ListPage<Like>),
}

impl CachedValue {
    pub fn written_at(&self) -> DateTime<Utc> {
        match self {
            CachedValue::Like(state) => state.written_at,
            CachedValue::Count(state) => state.written_at,
            CachedValue::Comments(page) => page.written_at,
            CachedValue::Likes(page) => page.written_at,
        }
    }

    pub fn into_like(self) -> Option<LikeState> {
        match self {
            CachedValue::Like(state) => Some(state),
            _ => None,
        }
    }

    pub fn into_count(self) -> Option<CountState> {
        match self {
            CachedValue::Count(state) => Some(state),
            _ => None,
        }
    }

    pub fn into_comments(self) -> Option<ListPage<Comment>> {
        match self {
            CachedValue::Comments(page) => Some(page),
            _ => None,
        }
    }

    pub fn into_likes(self) -> Option<ListPage<Like>> {
        match self {
            CachedValue::Likes(page) => Some(page),
            _ => None,
        }
    }
}
