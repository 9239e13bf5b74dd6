pub mod actor;
pub mod comment;
pub mod interaction_state;
pub mod like;

pub use actor::Actor;
pub use comment::Comment;
pub use interaction_state::{CachedValue, CountState, LikeState, ListPage};
pub use like::Like;
