pub mod clock;
pub mod durable_cache;
pub mod interaction_gateway;
pub mod session;
