use crate::shared::error::AppError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// キー単位の非ブロッキングな排他。取得済みのキーは待たずに拒否する
#[derive(Debug, Clone, Default)]
pub struct MutationLockRegistry {
    held: Arc<Mutex<HashSet<String>>>,
}

impl MutationLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn try_acquire(&self, key: &str) -> bool {
        let acquired = self.lock().insert(key.to_string());
        if !acquired {
            debug!(key, "Mutation lock contention");
        }
        acquired
    }

    pub fn release(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    /// drop で解放されるガード付きで取得する
    pub fn try_lock(&self, key: impl Into<String>) -> Option<MutationGuard> {
        let key = key.into();
        if !self.try_acquire(&key) {
            return None;
        }
        Some(MutationGuard {
            registry: self.clone(),
            key,
        })
    }

    /// `try_lock` と同じだが、競合時は `OperationInProgress` を返す
    pub fn acquire(&self, key: impl Into<String>) -> Result<MutationGuard, AppError> {
        let key = key.into();
        self.try_lock(key.clone())
            .ok_or_else(|| AppError::in_progress(key))
    }
}

#[derive(Debug)]
pub struct MutationGuard {
    registry: MutationLockRegistry,
    key: String,
}

impl MutationGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let locks = MutationLockRegistry::new();
        assert!(locks.try_acquire("like:w1:alice"));
        assert!(!locks.try_acquire("like:w1:alice"));
        assert!(locks.try_acquire("like:w2:alice"));

        locks.release("like:w1:alice");
        assert!(locks.try_acquire("like:w1:alice"));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let locks = MutationLockRegistry::new();
        let guard = locks.try_lock("delete_comment:c1").unwrap();
        assert_eq!(guard.key(), "delete_comment:c1");
        assert!(locks.is_held("delete_comment:c1"));
        assert!(locks.try_lock("delete_comment:c1").is_none());

        drop(guard);
        assert!(!locks.is_held("delete_comment:c1"));
    }

    #[test]
    fn test_acquire_reports_in_progress() {
        let locks = MutationLockRegistry::new();
        let _guard = locks.acquire("add_comment:w1:alice").unwrap();
        let err = locks.acquire("add_comment:w1:alice").unwrap_err();
        assert_eq!(err, AppError::in_progress("add_comment:w1:alice"));
    }

    #[test]
    fn test_release_of_unheld_key_is_noop() {
        let locks = MutationLockRegistry::new();
        locks.release("missing");
        assert!(!locks.is_held("missing"));
    }
}
