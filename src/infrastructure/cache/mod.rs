pub mod ttl_cache_store;

pub use ttl_cache_store::TtlCacheStore;
