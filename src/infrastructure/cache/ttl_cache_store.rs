use crate::application::ports::clock::Clock;
use crate::application::ports::durable_cache::DurableCache;
use crate::domain::entities::CachedValue;
use crate::domain::value_objects::CacheKey;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

enum PersistOp {
    Write { key: String, value: CachedValue },
    Remove(Vec<String>),
    RemovePrefix(String),
    Flush(oneshot::Sender<()>),
}

/// メモリ（LRU）と永続層の 2 段構成の TTL キャッシュ
///
/// メモリ層の操作は同期的に完了し、永続層への反映はバックグラウンドの
/// 書き込みタスクが発行順に処理する。永続層の失敗はログに残すだけで、
/// セッション中はメモリ層が正とみなされる。
///
/// 永続層を読む前にはキューを消化するため、`remove` / `invalidate` 済みの
/// エントリが永続層から読み戻されることはない。
pub struct TtlCacheStore {
    memory: Mutex<LruCache<String, CachedValue>>,
    durable: Arc<dyn DurableCache>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    writer: mpsc::UnboundedSender<PersistOp>,
    /// `remove` / `invalidate` のたびに進む世代
    removals: AtomicU64,
}

impl TtlCacheStore {
    /// # Panics
    ///
    /// 永続層の書き込みタスクを起動するため、tokio ランタイム外で呼ぶと panic する
    pub fn new(
        durable: Arc<dyn DurableCache>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        memory_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(memory_capacity).unwrap_or(NonZeroUsize::MIN);
        let (writer, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&durable), rx));

        Self {
            memory: Mutex::new(LruCache::new(capacity)),
            durable,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            writer,
            removals: AtomicU64::new(0),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    fn lock_memory(&self) -> MutexGuard<'_, LruCache<String, CachedValue>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, value: &CachedValue, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(value.written_at()) <= self.ttl
    }

    fn enqueue(&self, op: PersistOp) {
        if self.writer.send(op).is_err() {
            debug!("Durable cache writer has stopped; skipping persistence");
        }
    }

    /// メモリ層だけを見る。期限切れのエントリは削除してミス扱い
    pub fn peek(&self, key: &CacheKey) -> Option<CachedValue> {
        let now = self.clock.now();
        let mut memory = self.lock_memory();
        let value = memory.get(key.as_str())?.clone();
        if self.is_fresh(&value, now) {
            return Some(value);
        }

        memory.pop(key.as_str());
        drop(memory);
        debug!(key = %key, "Cache entry expired");
        self.enqueue(PersistOp::Remove(vec![key.to_string()]));
        None
    }

    /// メモリ層 → 永続層の順に探す。永続層のヒットはメモリ層へ昇格する
    pub async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        if let Some(value) = self.peek(key) {
            return Some(value);
        }

        let generation = self.removals.load(Ordering::Acquire);
        // 未反映の削除を永続層へ適用してから読む
        self.flush().await;

        let raw = match self.durable.read(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                debug!(key = %key, error = %err, "Durable cache read failed; treating as miss");
                return None;
            }
        };

        let value = match serde_json::from_str::<CachedValue>(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %key, error = %err, "Discarding unreadable durable cache entry");
                self.enqueue(PersistOp::Remove(vec![key.to_string()]));
                return None;
            }
        };

        if !self.is_fresh(&value, self.clock.now()) {
            self.enqueue(PersistOp::Remove(vec![key.to_string()]));
            return None;
        }

        let mut memory = self.lock_memory();
        if self.removals.load(Ordering::Acquire) != generation {
            debug!(key = %key, "Cache entry removed while reading durable tier");
            return None;
        }
        // 読み込み中に書かれた新しい値を優先する
        if let Some(current) = memory.get(key.as_str()) {
            return Some(current.clone());
        }
        memory.put(key.to_string(), value.clone());
        Some(value)
    }

    pub fn put(&self, key: &CacheKey, value: CachedValue) {
        self.lock_memory().put(key.to_string(), value.clone());
        self.enqueue(PersistOp::Write {
            key: key.to_string(),
            value,
        });
    }

    /// 有効なエントリをその場で書き換える。エントリが無い・期限切れなら `None`
    pub fn update<F>(&self, key: &CacheKey, mutate: F) -> Option<CachedValue>
    where
        F: FnOnce(&mut CachedValue),
    {
        let now = self.clock.now();
        let mut memory = self.lock_memory();
        let entry = memory.get_mut(key.as_str())?;
        if !self.is_fresh(entry, now) {
            memory.pop(key.as_str());
            return None;
        }

        mutate(entry);
        let updated = entry.clone();
        drop(memory);

        self.enqueue(PersistOp::Write {
            key: key.to_string(),
            value: updated.clone(),
        });
        Some(updated)
    }

    pub fn remove(&self, key: &CacheKey) {
        let mut memory = self.lock_memory();
        memory.pop(key.as_str());
        self.removals.fetch_add(1, Ordering::AcqRel);
        drop(memory);
        self.enqueue(PersistOp::Remove(vec![key.to_string()]));
    }

    /// プレフィックスに一致するエントリを両方の層から削除する
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut memory = self.lock_memory();
        let keys: Vec<String> = memory
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            memory.pop(key.as_str());
        }
        self.removals.fetch_add(1, Ordering::AcqRel);
        drop(memory);

        debug!(prefix, removed = keys.len(), "Invalidated cache prefix");
        self.enqueue(PersistOp::RemovePrefix(prefix.to_string()));
        keys.len()
    }

    /// プレフィックスに一致する有効なキー（メモリ層のみ）
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<CacheKey> {
        let now = self.clock.now();
        let memory = self.lock_memory();
        memory
            .iter()
            .filter(|(key, value)| key.starts_with(prefix) && self.is_fresh(value, now))
            .filter_map(|(key, _)| CacheKey::new(key.clone()).ok())
            .collect()
    }

    /// 起動時に永続層の有効なエントリをメモリ層へ読み込み、古いものは消す
    pub async fn hydrate(&self) -> usize {
        let (fresh, stale) = self.scan_durable().await;
        let loaded = fresh.len();
        {
            let mut memory = self.lock_memory();
            for (key, value) in fresh {
                memory.put(key, value);
            }
        }

        if !stale.is_empty()
            && let Err(err) = self.durable.remove_many(&stale).await
        {
            warn!(error = %err, "Failed to purge stale durable cache entries");
        }

        debug!(loaded, purged = stale.len(), "Hydrated interaction cache");
        loaded
    }

    /// 期限切れのエントリを削除し、メモリ層から削除した件数を返す
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = {
            let mut memory = self.lock_memory();
            let keys: Vec<String> = memory
                .iter()
                .filter(|(_, value)| !self.is_fresh(value, now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &keys {
                memory.pop(key.as_str());
            }
            keys
        };

        self.flush().await;
        let (_, stale) = self.scan_durable().await;
        if !stale.is_empty() {
            self.enqueue(PersistOp::Remove(stale));
        }

        expired.len()
    }

    async fn scan_durable(&self) -> (Vec<(String, CachedValue)>, Vec<String>) {
        let keys = match self.durable.list_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "Failed to list durable cache keys");
                return (Vec::new(), Vec::new());
            }
        };

        let now = self.clock.now();
        let mut fresh = Vec::new();
        let mut stale = Vec::new();
        for key in keys {
            match self.durable.read(&key).await {
                Ok(Some(raw)) => match serde_json::from_str::<CachedValue>(&raw) {
                    Ok(value) if self.is_fresh(&value, now) => fresh.push((key, value)),
                    _ => stale.push(key),
                },
                Ok(None) => {}
                Err(err) => {
                    debug!(key = %key, error = %err, "Skipping unreadable durable cache entry");
                }
            }
        }

        (fresh, stale)
    }

    /// 永続層への書き込みキューが空になるまで待つ
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.enqueue(PersistOp::Flush(tx));
        let _ = rx.await;
    }

    pub fn len(&self) -> usize {
        self.lock_memory().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_memory().is_empty()
    }
}

async fn run_writer(durable: Arc<dyn DurableCache>, mut rx: mpsc::UnboundedReceiver<PersistOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            PersistOp::Write { key, value } => {
                let raw = match serde_json::to_string(&value) {
                    Ok(raw) => raw,
                    Err(err) => {
                        warn!(key = %key, error = %err, "Failed to serialize cache entry");
                        continue;
                    }
                };
                if let Err(err) = durable.write(&key, &raw).await {
                    warn!(key = %key, error = %err, "Failed to persist cache entry");
                }
            }
            PersistOp::Remove(keys) => {
                if let Err(err) = durable.remove_many(&keys).await {
                    warn!(error = %err, "Failed to remove durable cache entries");
                }
            }
            PersistOp::RemovePrefix(prefix) => {
                let keys = match durable.list_keys().await {
                    Ok(keys) => keys,
                    Err(err) => {
                        warn!(prefix = %prefix, error = %err, "Failed to list durable cache keys");
                        continue;
                    }
                };
                let matching: Vec<String> = keys
                    .into_iter()
                    .filter(|key| key.starts_with(&prefix))
                    .collect();
                if matching.is_empty() {
                    continue;
                }
                if let Err(err) = durable.remove_many(&matching).await {
                    warn!(prefix = %prefix, error = %err, "Failed to remove durable cache prefix");
                }
            }
            PersistOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
