use crate::shared::error::AppError;
use async_trait::async_trait;

/// 端末上の永続キャッシュ。値は文字列（JSON）で保持する。
///
/// どの呼び出しも失敗し得る。書き込み系の失敗は呼び出し側でログに留め、
/// 読み込みの失敗はキャッシュミスとして扱う。
#[async_trait]
pub trait DurableCache: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn write(&self, key: &str, value: &str) -> Result<(), AppError>;

    async fn list_keys(&self) -> Result<Vec<String>, AppError>;

    async fn remove_many(&self, keys: &[String]) -> Result<(), AppError>;
}
