pub mod cache;
pub mod session;
pub mod storage;
pub mod time;

pub use cache::TtlCacheStore;
pub use session::InMemorySession;
pub use storage::{MemoryDurableCache, SqliteDurableCache};
pub use time::{ManualClock, SystemClock};
