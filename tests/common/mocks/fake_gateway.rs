use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::channel::mpsc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

use whisper_interactions::application::ports::interaction_gateway::{
    CommentsSnapshot, InteractionGateway, LikesSnapshot, RemotePage, ResourceCounts,
    SnapshotStream,
};
use whisper_interactions::domain::entities::{Actor, Comment, Like};
use whisper_interactions::domain::value_objects::{PageRequest, ResourceType};
use whisper_interactions::shared::error::AppError;

#[derive(Default)]
struct ServerState {
    likes: HashMap<String, HashSet<String>>,
    /// 他ユーザーによるいいね（一覧には出さない）
    external_likes: HashMap<String, u32>,
    comments: HashMap<String, Vec<Comment>>,
    next_comment_id: u64,
}

impl ServerState {
    fn like_count(&self, resource_id: &str) -> u32 {
        let own = self.likes.get(resource_id).map_or(0, |set| set.len() as u32);
        own + self.external_likes.get(resource_id).copied().unwrap_or(0)
    }

    fn reply_count(&self, resource_id: &str) -> u32 {
        self.comments.get(resource_id).map_or(0, |c| c.len() as u32)
    }
}

/// サーバー側の状態をメモリ上で再現し、呼び出しを記録するゲートウェイ
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<ServerState>,
    like_calls: Mutex<Vec<(ResourceType, String, String)>>,
    comment_calls: Mutex<Vec<(String, String)>>,
    get_resource_calls: Mutex<u32>,
    like_failures: Mutex<VecDeque<AppError>>,
    comment_failures: Mutex<VecDeque<AppError>>,
    read_failure: Mutex<Option<AppError>>,
    write_gate: Mutex<Option<(watch::Sender<bool>, watch::Receiver<bool>)>>,
    likes_subscribers: Mutex<Vec<mpsc::UnboundedSender<LikesSnapshot>>>,
    comments_subscribers: Mutex<Vec<mpsc::UnboundedSender<CommentsSnapshot>>>,
    subscriptions_unavailable: Mutex<bool>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed_external_likes(&self, resource_id: &str, count: u32) {
        self.state
            .lock()
            .await
            .external_likes
            .insert(resource_id.to_string(), count);
    }

    pub async fn seed_like(&self, resource_id: &str, actor_id: &str) {
        self.state
            .lock()
            .await
            .likes
            .entry(resource_id.to_string())
            .or_default()
            .insert(actor_id.to_string());
    }

    pub async fn seed_comment(&self, resource_id: &str, comment: Comment) {
        self.state
            .lock()
            .await
            .comments
            .entry(resource_id.to_string())
            .or_default()
            .push(comment);
    }

    pub async fn fail_next_like(&self, error: AppError) {
        self.like_failures.lock().await.push_back(error);
    }

    pub async fn fail_next_comment_write(&self, error: AppError) {
        self.comment_failures.lock().await.push_back(error);
    }

    pub async fn fail_reads(&self, error: Option<AppError>) {
        *self.read_failure.lock().await = error;
    }

    /// 以降の書き込みを `release_writes` まで止める
    pub async fn hold_writes(&self) {
        *self.write_gate.lock().await = Some(watch::channel(false));
    }

    pub async fn release_writes(&self) {
        if let Some((tx, _)) = self.write_gate.lock().await.take() {
            let _ = tx.send(true);
        }
    }

    pub async fn disable_subscriptions(&self) {
        *self.subscriptions_unavailable.lock().await = true;
    }

    pub async fn like_calls(&self) -> Vec<(ResourceType, String, String)> {
        self.like_calls.lock().await.clone()
    }

    pub async fn comment_calls(&self) -> Vec<(String, String)> {
        self.comment_calls.lock().await.clone()
    }

    pub async fn get_resource_calls(&self) -> u32 {
        *self.get_resource_calls.lock().await
    }

    pub async fn server_like_count(&self, resource_id: &str) -> u32 {
        self.state.lock().await.like_count(resource_id)
    }

    pub async fn server_has_liked(&self, resource_id: &str, actor_id: &str) -> bool {
        self.state
            .lock()
            .await
            .likes
            .get(resource_id)
            .is_some_and(|set| set.contains(actor_id))
    }

    /// 現在のサーバー状態をいいね購読者へ送る
    pub async fn push_likes(&self, resource_id: &str, observed_at: DateTime<Utc>) {
        let state = self.state.lock().await;
        let likes: Vec<Like> = state
            .likes
            .get(resource_id)
            .map(|actors| {
                let mut actors: Vec<&String> = actors.iter().collect();
                actors.sort();
                actors
                    .into_iter()
                    .map(|actor_id| Like {
                        resource_id: resource_id.to_string(),
                        actor_id: actor_id.clone(),
                        actor_name: None,
                        actor_color: None,
                        created_at: observed_at,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let snapshot = LikesSnapshot {
            resource_id: resource_id.to_string(),
            likes,
            like_count: state.like_count(resource_id),
            has_more: false,
            cursor: None,
            observed_at,
        };
        drop(state);

        let subscribers = self.likes_subscribers.lock().await;
        for tx in subscribers.iter() {
            let _ = tx.unbounded_send(snapshot.clone());
        }
    }

    pub async fn push_comments(&self, resource_id: &str, observed_at: DateTime<Utc>) {
        let state = self.state.lock().await;
        let snapshot = CommentsSnapshot {
            resource_id: resource_id.to_string(),
            comments: state.comments.get(resource_id).cloned().unwrap_or_default(),
            reply_count: state.reply_count(resource_id),
            has_more: false,
            cursor: None,
            observed_at,
        };
        drop(state);

        let subscribers = self.comments_subscribers.lock().await;
        for tx in subscribers.iter() {
            let _ = tx.unbounded_send(snapshot.clone());
        }
    }

    async fn wait_for_gate(&self) {
        let gate = self
            .write_gate
            .lock()
            .await
            .as_ref()
            .map(|(_, rx)| rx.clone());
        if let Some(mut rx) = gate {
            let _ = rx.wait_for(|open| *open).await;
        }
    }

    async fn check_read(&self) -> Result<(), AppError> {
        match self.read_failure.lock().await.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InteractionGateway for FakeGateway {
    async fn like_resource(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        actor: &Actor,
    ) -> Result<(), AppError> {
        self.like_calls.lock().await.push((
            resource_type,
            resource_id.to_string(),
            actor.id.clone(),
        ));
        self.wait_for_gate().await;
        if let Some(error) = self.like_failures.lock().await.pop_front() {
            return Err(error);
        }

        let mut state = self.state.lock().await;
        let likes = state.likes.entry(resource_id.to_string()).or_default();
        if !likes.remove(&actor.id) {
            likes.insert(actor.id.clone());
        }
        Ok(())
    }

    async fn has_liked(
        &self,
        _resource_type: ResourceType,
        resource_id: &str,
        actor_id: &str,
    ) -> Result<bool, AppError> {
        self.check_read().await?;
        Ok(self.server_has_liked(resource_id, actor_id).await)
    }

    async fn get_resource(&self, resource_id: &str) -> Result<Option<ResourceCounts>, AppError> {
        *self.get_resource_calls.lock().await += 1;
        self.check_read().await?;
        let state = self.state.lock().await;
        Ok(Some(ResourceCounts {
            like_count: state.like_count(resource_id),
            reply_count: state.reply_count(resource_id),
        }))
    }

    async fn add_comment(
        &self,
        resource_id: &str,
        actor: &Actor,
        text: &str,
    ) -> Result<String, AppError> {
        self.comment_calls
            .lock()
            .await
            .push(("add".to_string(), resource_id.to_string()));
        self.wait_for_gate().await;
        if let Some(error) = self.comment_failures.lock().await.pop_front() {
            return Err(error);
        }

        let mut state = self.state.lock().await;
        state.next_comment_id += 1;
        let id = format!("srv-{}", state.next_comment_id);
        let comment = Comment {
            id: id.clone(),
            resource_id: resource_id.to_string(),
            author_id: actor.id.clone(),
            author_name: actor.display_name.clone(),
            author_color: actor.color.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
            is_pending: false,
        };
        state
            .comments
            .entry(resource_id.to_string())
            .or_default()
            .insert(0, comment);
        Ok(id)
    }

    async fn delete_comment(&self, comment_id: &str, _actor_id: &str) -> Result<(), AppError> {
        self.comment_calls
            .lock()
            .await
            .push(("delete".to_string(), comment_id.to_string()));
        self.wait_for_gate().await;
        if let Some(error) = self.comment_failures.lock().await.pop_front() {
            return Err(error);
        }

        let mut state = self.state.lock().await;
        for comments in state.comments.values_mut() {
            comments.retain(|c| c.id != comment_id);
        }
        Ok(())
    }

    async fn get_comments_page(
        &self,
        resource_id: &str,
        page: &PageRequest,
    ) -> Result<RemotePage<Comment>, AppError> {
        self.check_read().await?;
        let state = self.state.lock().await;
        let all = state.comments.get(resource_id).cloned().unwrap_or_default();
        let start = page
            .cursor
            .as_ref()
            .and_then(|cursor| all.iter().position(|c| &c.id == cursor).map(|i| i + 1))
            .unwrap_or(0);
        let items: Vec<Comment> = all
            .iter()
            .skip(start)
            .take(page.limit as usize)
            .cloned()
            .collect();
        let has_more = start + items.len() < all.len();
        let cursor = items.last().map(|c| c.id.clone());
        Ok(RemotePage {
            items,
            has_more,
            cursor,
        })
    }

    async fn get_likes_page(
        &self,
        resource_id: &str,
        _page: &PageRequest,
    ) -> Result<RemotePage<Like>, AppError> {
        self.check_read().await?;
        let state = self.state.lock().await;
        let mut actors: Vec<String> = state
            .likes
            .get(resource_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        actors.sort();
        Ok(RemotePage {
            items: actors
                .into_iter()
                .map(|actor_id| Like {
                    resource_id: resource_id.to_string(),
                    actor_id,
                    actor_name: None,
                    actor_color: None,
                    created_at: Utc::now(),
                })
                .collect(),
            has_more: false,
            cursor: None,
        })
    }

    async fn subscribe_to_resource_likes(
        &self,
        _resource_id: &str,
    ) -> Result<SnapshotStream<LikesSnapshot>, AppError> {
        if *self.subscriptions_unavailable.lock().await {
            return Err(AppError::RemoteReadFailed("listener refused".into()));
        }
        let (tx, rx) = mpsc::unbounded();
        self.likes_subscribers.lock().await.push(tx);
        Ok(rx.boxed())
    }

    async fn subscribe_to_comments(
        &self,
        _resource_id: &str,
    ) -> Result<SnapshotStream<CommentsSnapshot>, AppError> {
        if *self.subscriptions_unavailable.lock().await {
            return Err(AppError::RemoteReadFailed("listener refused".into()));
        }
        let (tx, rx) = mpsc::unbounded();
        self.comments_subscribers.lock().await.push(tx);
        Ok(rx.boxed())
    }
}
