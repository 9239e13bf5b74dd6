pub mod connection_pool;
pub mod memory_durable_cache;
pub mod sqlite_durable_cache;

pub use connection_pool::ConnectionPool;
pub use memory_durable_cache::MemoryDurableCache;
pub use sqlite_durable_cache::SqliteDurableCache;
