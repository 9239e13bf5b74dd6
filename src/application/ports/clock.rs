use chrono::{DateTime, Utc};

/// キャッシュのタイムスタンプ付与に使う時刻ソース
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
