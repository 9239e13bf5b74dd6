#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

/// バックグラウンドタスクに処理を進めさせる
pub async fn drain_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
