pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;

pub use config::InteractionConfig;
pub use error::{AppError, Result};
