pub mod entities;
pub mod value_objects;

pub use entities::{Actor, CachedValue, Comment, CountState, Like, LikeState, ListPage};
pub use value_objects::{CacheKey, InteractionKey, PageRequest, ResourceType};
