use std::sync::Arc;

use whisper_interactions::application::ports::durable_cache::DurableCache;
use whisper_interactions::domain::entities::{Actor, Comment};
use whisper_interactions::infrastructure::session::InMemorySession;
use whisper_interactions::infrastructure::storage::MemoryDurableCache;
use whisper_interactions::infrastructure::time::ManualClock;
use whisper_interactions::{InteractionConfig, InteractionState};

use super::mocks::FakeGateway;

pub fn alice() -> Actor {
    Actor::new("alice", "Alice", "#ff8800")
}

pub fn comment(id: &str, resource_id: &str, author_id: &str) -> Comment {
    Comment {
        id: id.to_string(),
        resource_id: resource_id.to_string(),
        author_id: author_id.to_string(),
        author_name: format!("User {author_id}"),
        author_color: "#336699".to_string(),
        text: format!("comment {id}"),
        created_at: chrono::Utc::now(),
        is_pending: false,
    }
}

pub struct TestEngine {
    pub state: InteractionState,
    pub gateway: Arc<FakeGateway>,
    pub session: Arc<InMemorySession>,
    pub clock: ManualClock,
    pub durable: Arc<dyn DurableCache>,
}

/// alice がログイン済みのエンジン
pub async fn engine() -> TestEngine {
    engine_with(FakeGateway::new(), Arc::new(MemoryDurableCache::new())).await
}

pub async fn engine_with(gateway: Arc<FakeGateway>, durable: Arc<dyn DurableCache>) -> TestEngine {
    let session = Arc::new(InMemorySession::signed_in(alice()));
    let clock = ManualClock::default();
    let state = InteractionState::with_clock(
        InteractionConfig::default(),
        gateway.clone(),
        durable.clone(),
        session.clone(),
        Arc::new(clock.clone()),
    )
    .await
    .expect("engine");

    TestEngine {
        state,
        gateway,
        session,
        clock,
        durable,
    }
}
