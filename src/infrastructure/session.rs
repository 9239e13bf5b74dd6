use crate::application::ports::session::ActorSession;
use crate::domain::entities::Actor;
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// ログイン中のユーザーをメモリ上に保持するセッション
#[derive(Debug, Default)]
pub struct InMemorySession {
    actor: RwLock<Option<Actor>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(actor: Actor) -> Self {
        Self {
            actor: RwLock::new(Some(actor)),
        }
    }

    pub fn sign_in(&self, actor: Actor) {
        info!(actor_id = %actor.id, "Actor signed in");
        *self.actor.write().unwrap_or_else(PoisonError::into_inner) = Some(actor);
    }

    pub fn sign_out(&self) {
        let previous = self
            .actor
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(actor) = previous {
            info!(actor_id = %actor.id, "Actor signed out");
        }
    }
}

impl ActorSession for InMemorySession {
    fn current_actor(&self) -> Option<Actor> {
        self.actor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
