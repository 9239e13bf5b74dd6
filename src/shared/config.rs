use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionConfig {
    pub cache: CacheConfig,
    pub settle: SettleConfig,
    pub comments: CommentConfig,
    pub events: EventConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub memory_capacity: usize,
    pub database_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettleConfig {
    /// 最後のトグルから確定とみなすまでの無操作時間
    pub quiescence_ms: u64,
    /// 確定後、書き込みを発行するまでの猶予
    pub dispatch_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentConfig {
    pub page_size: u32,
    pub max_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventConfig {
    pub channel_capacity: usize,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig {
                ttl_secs: 300, // 5 minutes
                memory_capacity: 2048,
                database_url: "sqlite:data/interactions.db".to_string(),
            },
            settle: SettleConfig::default(),
            comments: CommentConfig {
                page_size: 20,
                max_length: 1000,
            },
            events: EventConfig {
                channel_capacity: 64,
            },
        }
    }
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            quiescence_ms: 1000,
            dispatch_delay_ms: 50,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl SettleConfig {
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }
}

impl InteractionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数ソースから設定を組み立てる（テストでは HashMap を渡す）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("WHISPER_CACHE_TTL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.cache.ttl_secs = value;
        }
        if let Some(v) = lookup("WHISPER_CACHE_MEMORY_CAPACITY")
            && let Some(value) = parse_usize(&v)
        {
            cfg.cache.memory_capacity = value;
        }
        if let Some(v) = lookup("WHISPER_CACHE_DATABASE_URL") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.cache.database_url = trimmed.to_string();
            }
        }
        if let Some(v) = lookup("WHISPER_SETTLE_QUIESCENCE_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.settle.quiescence_ms = value;
        }
        if let Some(v) = lookup("WHISPER_SETTLE_DISPATCH_DELAY_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.settle.dispatch_delay_ms = value;
        }
        if let Some(v) = lookup("WHISPER_COMMENTS_PAGE_SIZE")
            && let Some(value) = parse_u64(&v)
        {
            cfg.comments.page_size = value.min(u32::MAX as u64) as u32;
        }
        if let Some(v) = lookup("WHISPER_COMMENTS_MAX_LENGTH")
            && let Some(value) = parse_usize(&v)
        {
            cfg.comments.max_length = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.cache.ttl_secs == 0 {
            return Err("Cache ttl_secs must be greater than 0".to_string());
        }
        if self.cache.memory_capacity == 0 {
            return Err("Cache memory_capacity must be greater than 0".to_string());
        }
        if self.comments.page_size == 0 {
            return Err("Comments page_size must be greater than 0".to_string());
        }
        if self.comments.max_length == 0 {
            return Err("Comments max_length must be greater than 0".to_string());
        }
        if self.events.channel_capacity == 0 {
            return Err("Events channel_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}
