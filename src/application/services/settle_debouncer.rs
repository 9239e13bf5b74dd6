use crate::domain::entities::LikeState;
use crate::domain::value_objects::InteractionKey;
use crate::shared::scheduler::ScheduledTask;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// 連続トグルの途中経過
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleIntent {
    /// 最初のトグル直前の状態（失敗時はここへ戻す）
    pub original_state: LikeState,
    /// 同時点でのリソース側のいいね数（キャッシュされていれば）
    pub original_count: Option<u32>,
    pub target_state: LikeState,
    pub is_settled: bool,
}

impl SettleIntent {
    pub fn is_noop(&self) -> bool {
        self.target_state.is_liked == self.original_state.is_liked
    }
}

/// 確定したトグルの受け手
#[async_trait]
pub trait SettleHandler: Send + Sync {
    async fn on_settled(&self, key: InteractionKey, intent: SettleIntent);

    /// 元の状態に戻っただけなので書き込みは不要
    async fn on_skipped(&self, _key: InteractionKey, _intent: SettleIntent) {}
}

struct PendingEntry {
    intent: SettleIntent,
    /// 現在のタイマーの識別子。猶予中の再トグルで更新される
    timer_id: u64,
    timer: ScheduledTask,
}

struct Inner {
    entries: Mutex<HashMap<InteractionKey, PendingEntry>>,
    next_timer_id: Mutex<u64>,
    quiescence: Duration,
    dispatch_delay: Duration,
    handler: Arc<dyn SettleHandler>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<InteractionKey, PendingEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_timer_id(&self) -> u64 {
        let mut next = self.next_timer_id.lock().unwrap_or_else(PoisonError::into_inner);
        *next += 1;
        *next
    }
}

/// キーごとにトグルをまとめ、入力が落ち着いた時点の最終状態だけを引き渡す
#[derive(Clone)]
pub struct SettleDebouncer {
    inner: Arc<Inner>,
}

impl SettleDebouncer {
    pub fn new(
        quiescence: Duration,
        dispatch_delay: Duration,
        handler: Arc<dyn SettleHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_timer_id: Mutex::new(0),
                quiescence,
                dispatch_delay,
                handler,
            }),
        }
    }

    /// トグルを記録し、無操作タイマーを張り直す。
    ///
    /// `original` と `original_count` はそのキーで最初のトグルのときだけ使われる。
    pub fn record(
        &self,
        key: &InteractionKey,
        original: LikeState,
        original_count: Option<u32>,
        target: LikeState,
    ) {
        let mut entries = self.inner.entries();

        if let Some(entry) = entries.get_mut(key) {
            entry.intent.target_state = target;
            entry.intent.is_settled = false;
            if entry.timer.reschedule(self.inner.quiescence) {
                debug!(key = %key, "Settle timer restarted");
                return;
            }

            // 猶予中のトグル: 引き渡し待ちを破棄してやり直す
            let timer_id = self.inner.allocate_timer_id();
            entry.timer_id = timer_id;
            entry.timer = self.spawn_timer(key.clone(), timer_id);
            debug!(key = %key, "Settle intent reopened during dispatch delay");
            return;
        }

        let timer_id = self.inner.allocate_timer_id();
        let timer = self.spawn_timer(key.clone(), timer_id);
        entries.insert(
            key.clone(),
            PendingEntry {
                intent: SettleIntent {
                    original_state: original,
                    original_count,
                    target_state: target,
                    is_settled: false,
                },
                timer_id,
                timer,
            },
        );
        debug!(key = %key, "Settle intent opened");
    }

    fn spawn_timer(&self, key: InteractionKey, timer_id: u64) -> ScheduledTask {
        let inner = Arc::clone(&self.inner);
        ScheduledTask::spawn(self.inner.quiescence, async move {
            settle(inner, key, timer_id).await;
        })
    }

    pub fn pending(&self, key: &InteractionKey) -> Option<SettleIntent> {
        self.inner.entries().get(key).map(|entry| entry.intent.clone())
    }

    pub fn pending_count(&self) -> usize {
        self.inner.entries().len()
    }

    /// 未発火のタイマーを全て取り消す。引き渡し済みの書き込みには影響しない
    pub fn shutdown(&self) {
        let drained: Vec<PendingEntry> = self.inner.entries().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.timer.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cancelled pending settle intents");
        }
    }
}

async fn settle(inner: Arc<Inner>, key: InteractionKey, timer_id: u64) {
    {
        let mut entries = inner.entries();
        match entries.get_mut(&key) {
            Some(entry) if entry.timer_id == timer_id => entry.intent.is_settled = true,
            _ => return,
        }
    }

    if !inner.dispatch_delay.is_zero() {
        tokio::time::sleep(inner.dispatch_delay).await;
    }

    let intent = {
        let mut entries = inner.entries();
        match entries.get(&key) {
            Some(entry) if entry.timer_id == timer_id && entry.intent.is_settled => {}
            _ => {
                debug!(key = %key, "Settle hand-off abandoned");
                return;
            }
        }
        match entries.remove(&key) {
            Some(entry) => entry.intent,
            None => return,
        }
    };

    if intent.is_noop() {
        debug!(key = %key, "Settled back to original state; skipping write");
        inner.handler.on_skipped(key, intent).await;
    } else {
        inner.handler.on_settled(key, intent).await;
    }
}
