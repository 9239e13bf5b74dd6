pub mod cache_key;
pub mod interaction_key;
pub mod page_request;
pub mod resource_type;

pub use cache_key::CacheKey;
pub use interaction_key::InteractionKey;
pub use page_request::PageRequest;
pub use resource_type::ResourceType;
