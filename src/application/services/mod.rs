pub mod interaction_service;
pub mod mutation_lock;
pub mod settle_debouncer;
pub mod subscription_bridge;

pub use interaction_service::{CommentOutcome, DeleteOutcome, InteractionEvent, InteractionService};
pub use mutation_lock::{MutationGuard, MutationLockRegistry};
pub use settle_debouncer::{SettleDebouncer, SettleHandler, SettleIntent};
pub use subscription_bridge::{BridgeUpdate, SubscriptionBridge, SubscriptionHandle};
