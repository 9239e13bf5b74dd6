use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

struct TaskState {
    /// `None` はキャンセル済み
    deadline: Option<Instant>,
    fired: bool,
}

struct Shared {
    state: Mutex<TaskState>,
    wake: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 遅延実行タスク。発火前なら `reschedule` で期限を延ばせる。
///
/// 発火前に drop / `cancel` されたタスクは実行されない。発火後は最後まで実行される。
pub struct ScheduledTask {
    shared: Arc<Shared>,
}

impl ScheduledTask {
    pub fn spawn<F>(delay: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(TaskState {
                deadline: Some(Instant::now() + delay),
                fired: false,
            }),
            wake: Notify::new(),
        });

        let timer = Arc::clone(&shared);
        tokio::spawn(async move {
            loop {
                let deadline = match timer.lock().deadline {
                    Some(deadline) => deadline,
                    None => return,
                };

                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        let mut state = timer.lock();
                        match state.deadline {
                            None => return,
                            Some(current) if current != deadline => continue,
                            Some(_) => {
                                state.fired = true;
                                break;
                            }
                        }
                    }
                    _ = timer.wake.notified() => continue,
                }
            }

            work.await;
        });

        Self { shared }
    }

    /// 期限を `now + delay` に置き換える。既に発火済みなら `false`。
    pub fn reschedule(&self, delay: Duration) -> bool {
        let mut state = self.shared.lock();
        if state.fired || state.deadline.is_none() {
            return false;
        }
        state.deadline = Some(Instant::now() + delay);
        drop(state);
        self.shared.wake.notify_one();
        true
    }

    /// 発火前であれば取り消す。取り消せた場合 `true`。
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.lock();
        if state.fired || state.deadline.is_none() {
            return false;
        }
        state.deadline = None;
        drop(state);
        self.shared.wake.notify_one();
        true
    }

    pub fn has_fired(&self) -> bool {
        self.shared.lock().fired
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(delay: Duration, counter: &Arc<AtomicUsize>) -> ScheduledTask {
        let counter = Arc::clone(counter);
        ScheduledTask::spawn(delay, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counter_task(Duration::from_millis(100), &counter);

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!task.has_fired());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(task.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_pushes_deadline_back() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counter_task(Duration::from_millis(100), &counter);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(task.reschedule(Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!task.reschedule(Duration::from_millis(100)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_prevent_firing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cancelled = counter_task(Duration::from_millis(50), &counter);
        assert!(cancelled.cancel());
        assert!(!cancelled.cancel());

        let dropped = counter_task(Duration::from_millis(50), &counter);
        drop(dropped);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_work_survives_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task_counter = Arc::clone(&counter);
        let task = ScheduledTask::spawn(Duration::from_millis(10), async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            task_counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(task.has_fired());
        drop(task);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
