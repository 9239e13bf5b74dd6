pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{
    BridgeUpdate, CommentOutcome, DeleteOutcome, InteractionEvent, InteractionService,
    SubscriptionBridge, SubscriptionHandle,
};
pub use shared::{AppError, InteractionConfig, Result};
pub use state::InteractionState;
