use crate::domain::entities::Actor;

/// 認証状態を参照するためのポート。
///
/// 認証処理そのものは別のサービスが担当し、ここでは現在のユーザーだけを返す。
pub trait ActorSession: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}
