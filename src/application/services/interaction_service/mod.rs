mod comments;
mod likes;
mod reads;

use crate::application::ports::interaction_gateway::InteractionGateway;
use crate::application::ports::session::ActorSession;
use crate::application::services::mutation_lock::MutationLockRegistry;
use crate::application::services::settle_debouncer::SettleDebouncer;
use crate::domain::entities::{Actor, LikeState};
use crate::domain::value_objects::{InteractionKey, PageRequest};
use crate::infrastructure::cache::TtlCacheStore;
use crate::shared::config::InteractionConfig;
use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// 非同期に確定したいいねの結果。UI はこれを購読してエラー表示や再描画を行う
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// 書き込み完了。`state` はサーバーの値で補正済み
    LikeSettled {
        key: InteractionKey,
        state: LikeState,
    },
    /// 最終的に元の状態へ戻ったため書き込みなし
    LikeSkipped { key: InteractionKey },
    /// 書き込み失敗。`state` は復元後の状態
    LikeReverted {
        key: InteractionKey,
        state: LikeState,
        error: AppError,
    },
}

impl InteractionEvent {
    pub fn key(&self) -> &InteractionKey {
        match self {
            InteractionEvent::LikeSettled { key, .. }
            | InteractionEvent::LikeSkipped { key }
            | InteractionEvent::LikeReverted { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOutcome {
    pub comment_id: String,
    /// 返信数（取得できればサーバーの値）
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub count: u32,
}

/// サービスと確定処理が共有する状態
struct ServiceCore {
    cache: Arc<TtlCacheStore>,
    gateway: Arc<dyn InteractionGateway>,
    session: Arc<dyn ActorSession>,
    locks: MutationLockRegistry,
    events: broadcast::Sender<InteractionEvent>,
    page_size: u32,
    max_comment_length: usize,
}

impl ServiceCore {
    fn require_actor(&self) -> Result<Actor, AppError> {
        self.session
            .current_actor()
            .ok_or(AppError::Unauthenticated)
    }

    fn publish(&self, event: InteractionEvent) {
        if self.events.send(event).is_err() {
            debug!("No interaction event subscribers");
        }
    }

    fn page_request(&self, cursor: Option<String>) -> PageRequest {
        match cursor {
            Some(cursor) => PageRequest::after(self.page_size, cursor),
            None => PageRequest::first(self.page_size),
        }
    }
}

fn like_lock_key(key: &InteractionKey) -> String {
    format!("toggle_like:{key}")
}

/// いいね・コメントの楽観的更新を取りまとめるサービス
pub struct InteractionService {
    core: Arc<ServiceCore>,
    debouncer: SettleDebouncer,
}

impl InteractionService {
    pub fn new(
        config: &InteractionConfig,
        cache: Arc<TtlCacheStore>,
        gateway: Arc<dyn InteractionGateway>,
        session: Arc<dyn ActorSession>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.events.channel_capacity.max(1));
        let core = Arc::new(ServiceCore {
            cache,
            gateway,
            session,
            locks: MutationLockRegistry::new(),
            events,
            page_size: config.comments.page_size,
            max_comment_length: config.comments.max_length,
        });
        let debouncer = SettleDebouncer::new(
            config.settle.quiescence(),
            config.settle.dispatch_delay(),
            core.clone(),
        );

        Self { core, debouncer }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<InteractionEvent> {
        self.core.events.subscribe()
    }

    pub fn cache(&self) -> &Arc<TtlCacheStore> {
        &self.core.cache
    }

    pub fn locks(&self) -> &MutationLockRegistry {
        &self.core.locks
    }

    pub fn debouncer(&self) -> &SettleDebouncer {
        &self.debouncer
    }

    /// 未確定のトグルを破棄する（画面のアンマウント時）
    pub fn shutdown(&self) {
        self.debouncer.shutdown();
    }
}

impl Drop for InteractionService {
    fn drop(&mut self) {
        self.debouncer.shutdown();
    }
}
